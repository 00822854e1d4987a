//! ConsoleQA Common Library
//!
//! Result model, naming conventions, failure classification and sink
//! plumbing shared by the reporting pipeline and the CLI.

pub mod classify;
pub mod config;
pub mod error;
pub mod http;
pub mod poll;
pub mod title;
pub mod types;

// Re-export commonly used types
pub use classify::failure_reason;
pub use config::Settings;
pub use error::{Error, Result};
pub use http::{SinkClient, SinkResponse};
pub use poll::{poll_until, PollConfig};
pub use types::*;

/// ConsoleQA version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
