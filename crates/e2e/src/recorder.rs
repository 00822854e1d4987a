//! Live run recorder feeding the test-case spreadsheet
//!
//! Receives one event per completed attempt while the suite runs, keeps a
//! spreadsheet row per logical test and pushes the batch when the run ends.
//! Without a reachable sink the rows are printed as a console table.
//!
//! The spreadsheet only knows PASS / FAIL / SKIP, so timeouts are folded
//! into FAIL here. The dashboard keeps them separate.

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Local};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use consoleqa_common::classify::truncate_chars;
use consoleqa_common::title::{id_and_name, AUTH_SETUP_TITLE};
use consoleqa_common::{failure_reason, Error as CommonError, SinkClient};

use crate::error::E2eResult;
use crate::extractor::{ReportAttachment, ReportError};

const TABLE_WIDTH: usize = 90;

/// How often a followed event file is checked for new lines
const FOLLOW_INTERVAL: Duration = Duration::from_millis(250);

/// Status vocabulary of the spreadsheet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SheetStatus {
    Pass,
    Fail,
    Skip,
}

impl SheetStatus {
    /// `passed` and `skipped` map directly; everything else is a failure.
    pub fn from_engine(status: &str) -> Self {
        match status {
            "passed" => SheetStatus::Pass,
            "skipped" => SheetStatus::Skip,
            _ => SheetStatus::Fail,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SheetStatus::Pass => "PASS",
            SheetStatus::Fail => "FAIL",
            SheetStatus::Skip => "SKIP",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            SheetStatus::Pass => "✅",
            SheetStatus::Fail => "❌",
            SheetStatus::Skip => "⏭️",
        }
    }
}

/// A completed test attempt as reported by the engine
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestEvent {
    pub title: String,

    /// Title of the enclosing describe block
    #[serde(default)]
    pub suite: String,

    pub status: String,

    #[serde(default)]
    pub errors: Vec<ReportError>,

    #[serde(default)]
    pub attachments: Vec<ReportAttachment>,

    #[serde(default)]
    pub retry: u32,
}

/// Row in the test-case spreadsheet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetRow {
    pub testcase_id: String,
    pub test_name: String,
    pub description: String,
    pub update_date_time: String,
    pub status: SheetStatus,
    pub reason: String,
    pub comment: String,
}

#[derive(Serialize)]
struct SheetPayload<'a> {
    results: &'a [SheetRow],
}

#[derive(Deserialize)]
struct SheetAck {
    #[serde(default)]
    status: String,
    #[serde(default)]
    message: Option<String>,
}

/// Spreadsheet web app endpoint
#[derive(Debug, Clone)]
pub struct SheetSink {
    client: SinkClient,
    url: String,
}

impl SheetSink {
    pub fn new(url: impl Into<String>, timeout: Duration) -> E2eResult<Self> {
        Ok(Self {
            client: SinkClient::new(timeout)?,
            url: url.into(),
        })
    }

    /// Push all rows in one batch; the sink must answer `{"status":"success"}`.
    pub async fn push(&self, rows: &[SheetRow]) -> E2eResult<()> {
        let response = self
            .client
            .post_text(&self.url, &SheetPayload { results: rows })
            .await?;
        let ack: SheetAck = response.json()?;
        if ack.status != "success" {
            let message = ack
                .message
                .unwrap_or_else(|| "Apps Script returned an error".to_string());
            return Err(CommonError::SinkRejected(message).into());
        }
        Ok(())
    }
}

/// How the recorded rows left the process
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecorderOutcome {
    /// Acknowledged by the spreadsheet sink
    Pushed(usize),
    /// Printed to the console instead
    Printed(usize),
}

/// Collects spreadsheet rows during a run
pub struct RunRecorder {
    rows: IndexMap<String, SheetRow>,
    sink: Option<SheetSink>,
}

impl RunRecorder {
    pub fn new(sink: Option<SheetSink>) -> Self {
        Self {
            rows: IndexMap::new(),
            sink,
        }
    }

    /// Record one completed attempt
    pub fn on_test_end(&mut self, event: &TestEvent) {
        self.record_at(event, Local::now());
    }

    fn record_at(&mut self, event: &TestEvent, now: DateTime<Local>) {
        if event.title == AUTH_SETUP_TITLE {
            return;
        }
        let key = format!("{}::{}", event.suite, event.title);
        let row = build_row(event, &now.format("%b %-d, %Y, %-I:%M %p").to_string());
        // A retry replaces the earlier attempt without moving the row.
        self.rows.insert(key, row);
    }

    pub fn rows(&self) -> Vec<&SheetRow> {
        self.rows.values().collect()
    }

    /// Feed JSON-lines events from `reader` until EOF.
    ///
    /// Blank lines are ignored and malformed lines are logged and skipped.
    pub async fn consume_lines<R>(&mut self, reader: R) -> E2eResult<usize>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = reader.lines();
        let mut seen = 0;
        while let Some(line) = lines.next_line().await? {
            if self.consume_line(&line) {
                seen += 1;
            }
        }
        debug!("Consumed {} test event(s)", seen);
        Ok(seen)
    }

    /// Tail `reader` while a run is writing to it.
    ///
    /// EOF only means "nothing new yet" until `finished` resolves; after that
    /// the remaining lines are drained and a trailing unterminated line is
    /// accepted.
    pub async fn follow<R, F>(&mut self, mut reader: R, finished: F) -> E2eResult<usize>
    where
        R: AsyncBufRead + Unpin,
        F: Future<Output = ()>,
    {
        tokio::pin!(finished);
        let mut done = false;
        let mut pending = Vec::new();
        let mut seen = 0;

        loop {
            let read = reader.read_until(b'\n', &mut pending).await?;
            if pending.ends_with(b"\n") {
                if self.consume_line(&String::from_utf8_lossy(&pending)) {
                    seen += 1;
                }
                pending.clear();
                continue;
            }
            if read > 0 {
                continue;
            }
            if done {
                break;
            }
            tokio::select! {
                _ = &mut finished => done = true,
                _ = sleep(FOLLOW_INTERVAL) => {}
            }
        }

        if self.consume_line(&String::from_utf8_lossy(&pending)) {
            seen += 1;
        }
        debug!("Followed {} test event(s)", seen);
        Ok(seen)
    }

    fn consume_line(&mut self, line: &str) -> bool {
        let line = line.trim();
        if line.is_empty() {
            return false;
        }
        match serde_json::from_str::<TestEvent>(line) {
            Ok(event) => {
                self.on_test_end(&event);
                true
            }
            Err(e) => {
                warn!("Skipping malformed test event: {}", e);
                false
            }
        }
    }

    /// Deliver the rows at the end of the run.
    ///
    /// Never fails: delivery problems fall back to the console table.
    pub async fn finish(&self) -> RecorderOutcome {
        let rows: Vec<SheetRow> = self.rows.values().cloned().collect();

        let Some(sink) = &self.sink else {
            warn!("GOOGLE_APPS_SCRIPT_URL not set, skipping Google Sheets update");
            info!("Deploy the Apps Script and set GOOGLE_APPS_SCRIPT_URL to enable reporting");
            print!("{}", render_table(&rows));
            return RecorderOutcome::Printed(rows.len());
        };

        match sink.push(&rows).await {
            Ok(()) => {
                info!("Google Sheets updated: {} test results pushed", rows.len());
                RecorderOutcome::Pushed(rows.len())
            }
            Err(e) => {
                error!("Failed to update Google Sheets: {}", e);
                print!("{}", render_table(&rows));
                RecorderOutcome::Printed(rows.len())
            }
        }
    }
}

fn build_row(event: &TestEvent, update_date_time: &str) -> SheetRow {
    let (testcase_id, test_name) = id_and_name(&event.title);
    let status = SheetStatus::from_engine(&event.status);

    let reason = match (status, event.errors.first()) {
        (SheetStatus::Fail, Some(first)) => {
            failure_reason(first.message.as_deref().unwrap_or("Unknown error"))
        }
        _ => String::new(),
    };

    let comment = match status {
        SheetStatus::Pass => "Test passed successfully".to_string(),
        SheetStatus::Skip => "Test was skipped".to_string(),
        SheetStatus::Fail => event
            .attachments
            .iter()
            .find(|a| a.name == "screenshot")
            .and_then(|a| a.path.as_deref())
            .and_then(|p| std::path::Path::new(p).file_name())
            .map(|n| format!("Screenshot: {}", n.to_string_lossy()))
            .unwrap_or_else(|| "No screenshot captured".to_string()),
    };

    SheetRow {
        description: format!("[{}] {}", event.suite, test_name),
        testcase_id,
        test_name,
        update_date_time: update_date_time.to_string(),
        status,
        reason,
        comment,
    }
}

/// Fixed-width summary of the rows with a trailing count line
pub fn render_table(rows: &[SheetRow]) -> String {
    let rule = "─".repeat(TABLE_WIDTH);
    let mut out = String::new();

    out.push_str("\n📋 Test Results Summary:\n");
    out.push_str(&format!("{rule}\n"));
    out.push_str(&format!("{:<14}{:<8}{:<60}{}\n", "ID", "Status", "Test Name", "Reason"));
    out.push_str(&format!("{rule}\n"));

    for r in rows {
        let status = format!("{} {}", r.status.icon(), r.status.as_str());
        let reason = if r.reason.is_empty() { "-" } else { r.reason.as_str() };
        out.push_str(&format!(
            "{:<14}{:<10}{:<60}{}\n",
            r.testcase_id,
            status,
            truncate_chars(&r.test_name, 58, ""),
            reason
        ));
    }

    out.push_str(&format!("{rule}\n"));
    let count = |s: SheetStatus| rows.iter().filter(|r| r.status == s).count();
    out.push_str(&format!(
        "Total: {} | ✅ {} passed | ❌ {} failed | ⏭️ {} skipped\n\n",
        rows.len(),
        count(SheetStatus::Pass),
        count(SheetStatus::Fail),
        count(SheetStatus::Skip),
    ));
    out
}
