//! Flat CSV exports of the current run and the run history

use consoleqa_common::title::split_title;
use consoleqa_common::TestOutcome;

use crate::history::RunHistory;

const CURRENT_RUN_HEADER: &str = "Test ID,Test Name,Module,Status,Duration (ms),Error";
const ALL_RUNS_HEADER: &str =
    "Run ID,Date,Total,Passed,Failed,Skipped,Timed Out,Pass Rate (%),Duration (ms)";

/// One row per test of the current run
pub fn current_run_csv(tests: &[TestOutcome]) -> String {
    let rows = tests.iter().map(|t| {
        let (id, name) = match split_title(&t.title) {
            Some((id, name)) => (id, name),
            None => ("", t.title.as_str()),
        };
        let error = t.error.replace('\r', "").replace('\n', " ");
        format!(
            "{},{},{},{},{},{}",
            quote(id),
            quote(name),
            quote(&t.module_label),
            quote(t.status.as_str()),
            t.duration_ms,
            quote(&error),
        )
    });
    with_header(CURRENT_RUN_HEADER, rows)
}

/// One row per retained run, newest first
pub fn all_runs_csv(history: &RunHistory) -> String {
    let rows = history.iter().map(|r| {
        let date = r.started_at.format("%-m/%-d/%Y, %-I:%M:%S %p").to_string();
        format!(
            "{},{},{},{},{},{},{},{},{}",
            quote(&r.id),
            quote(&date),
            r.summary.total,
            r.summary.passed,
            r.summary.failed,
            r.summary.skipped,
            r.summary.timed_out,
            r.pass_rate,
            r.duration_ms,
        )
    });
    with_header(ALL_RUNS_HEADER, rows)
}

fn with_header(header: &str, rows: impl Iterator<Item = String>) -> String {
    let body: Vec<String> = rows.collect();
    format!("{}\n{}", header, body.join("\n"))
}

fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}
