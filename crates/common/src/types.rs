//! Result model shared by the extractor, aggregator and notifier

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Final status of a logical test as seen by the dashboard.
///
/// Timeouts stay a separate bucket here. The spreadsheet sink has its own
/// vocabulary (see the recorder in `consoleqa-e2e`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OutcomeStatus {
    Passed,
    Failed,
    Skipped,
    TimedOut,
}

impl OutcomeStatus {
    /// Map a status string reported by the browser engine.
    ///
    /// Anything unrecognised is a failure, never an error.
    pub fn from_engine(status: &str) -> Self {
        match status {
            "passed" => OutcomeStatus::Passed,
            "timedOut" => OutcomeStatus::TimedOut,
            "skipped" => OutcomeStatus::Skipped,
            _ => OutcomeStatus::Failed,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeStatus::Passed => "passed",
            OutcomeStatus::Failed => "failed",
            OutcomeStatus::Skipped => "skipped",
            OutcomeStatus::TimedOut => "timedOut",
        }
    }
}

impl std::fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A file attached to a test attempt (screenshot, trace, video)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub name: String,

    /// Base name of the file inside the report's attachment directory
    #[serde(rename = "path", alias = "relativePath", default)]
    pub relative_path: String,

    #[serde(default)]
    pub content_type: String,
}

/// One row per logical test, keyed by `file::title`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestOutcome {
    /// Testcase identifier parsed from the title prefix (`TC_DASH_01`)
    pub id: String,

    /// Title with the identifier prefix stripped
    pub name: String,

    /// Full title as declared in the spec file
    pub title: String,

    /// Spec file the test lives in
    pub file: String,

    /// Module key derived from the file name
    pub module: String,

    /// Display name for the module
    pub module_label: String,

    pub status: OutcomeStatus,

    pub duration_ms: u64,

    /// Joined, truncated error text; empty when passed
    #[serde(default)]
    pub error: String,

    #[serde(default)]
    pub attachments: Vec<Attachment>,

    /// Retry number of the attempt this outcome came from
    #[serde(skip)]
    pub attempt: u32,
}

impl TestOutcome {
    /// Key used to collapse retries of the same test
    pub fn key(&self) -> String {
        format!("{}::{}", self.file, self.title)
    }
}

/// Status counters. `total` always equals the sum of the four buckets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub timed_out: usize,
}

impl RunSummary {
    /// Count one more outcome.
    pub fn record(&mut self, status: OutcomeStatus) {
        self.total += 1;
        match status {
            OutcomeStatus::Passed => self.passed += 1,
            OutcomeStatus::Failed => self.failed += 1,
            OutcomeStatus::Skipped => self.skipped += 1,
            OutcomeStatus::TimedOut => self.timed_out += 1,
        }
    }

    /// Failed and timed-out merged, as shown in the email report
    pub fn failures(&self) -> usize {
        self.failed + self.timed_out
    }

    pub fn pass_rate(&self) -> u32 {
        pass_rate(self.passed, self.total)
    }

    pub fn is_consistent(&self) -> bool {
        self.total == self.passed + self.failed + self.skipped + self.timed_out
    }
}

/// Integer percentage of passed tests, 0 for an empty run.
pub fn pass_rate(passed: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    ((passed as f64 / total as f64) * 100.0).round() as u32
}

/// Per-module counters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleSummary {
    pub label: String,

    #[serde(flatten)]
    pub counts: RunSummary,
}

/// Full result of the latest run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSnapshot {
    pub id: String,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub summary: RunSummary,
    pub pass_rate: u32,

    /// Module key to summary, in first-seen order
    pub modules: IndexMap<String, ModuleSummary>,

    #[serde(default)]
    pub tests: Vec<TestOutcome>,
}

impl RunSnapshot {
    /// Summary-only copy kept in the run history
    pub fn history_entry(&self) -> RunHistoryEntry {
        RunHistoryEntry {
            id: self.id.clone(),
            started_at: self.started_at,
            duration_ms: self.duration_ms,
            summary: self.summary,
            pass_rate: self.pass_rate,
            modules: self.modules.clone(),
        }
    }
}

/// A past run without per-test detail
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunHistoryEntry {
    pub id: String,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub summary: RunSummary,
    pub pass_rate: u32,

    #[serde(default)]
    pub modules: IndexMap<String, ModuleSummary>,
}
