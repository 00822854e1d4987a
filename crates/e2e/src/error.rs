//! Error types for the reporting pipeline

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum E2eError {
    #[error("Report not found: {}. Run the suite first: npx playwright test", .0.display())]
    ReportNotFound(PathBuf),

    #[error("Snapshot not found: {}. Generate it first: consoleqa aggregate", .0.display())]
    SnapshotNotFound(PathBuf),

    #[error("Report parse error in {path}: {source}")]
    ReportParse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Playwright not found. Install with: npm ci && npx playwright install")]
    PlaywrightNotFound,

    #[error("Playwright error: {0}")]
    Playwright(String),

    #[error("Suite run exceeded {0}s and was aborted")]
    RunTimeout(u64),

    #[error("Git error: {0}")]
    Git(String),

    #[error("Scheduler dispatch failed: HTTP {status}: {body}")]
    Dispatch { status: u16, body: String },

    #[error("Missing configuration: {0}")]
    MissingConfig(&'static str),

    #[error(transparent)]
    Common(#[from] consoleqa_common::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type E2eResult<T> = Result<T, E2eError>;
