//! Error types for ConsoleQA

use thiserror::Error;

/// Result type alias using the ConsoleQA error
pub type Result<T> = std::result::Result<T, Error>;

/// ConsoleQA error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Sink returned HTTP {status}: {reason}")]
    SinkStatus { status: u16, reason: String },

    #[error("Sink redirected without a location header")]
    RedirectWithoutTarget,

    #[error("Sink redirected to an invalid location: {0}")]
    InvalidRedirect(String),

    #[error("Sink rejected the payload: {0}")]
    SinkRejected(String),

    #[error("Operation timeout after {seconds}s: {what}")]
    Timeout { seconds: u64, what: String },
}
