//! Dashboard data generation
//!
//! Reduces the engine's report to the latest snapshot, appends a summary
//! to the bounded run history and regenerates both CSV exports. This is
//! the only writer of those files.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use consoleqa_common::config::PathsConfig;
use consoleqa_common::{ModuleSummary, RunSnapshot, RunSummary, TestOutcome};

use crate::error::E2eResult;
use crate::export::{all_runs_csv, current_run_csv};
use crate::extractor::{PlaywrightReport, ReportStats};
use crate::history::RunHistory;

/// What one aggregation pass produced
#[derive(Debug, Clone)]
pub struct AggregationOutput {
    pub snapshot: RunSnapshot,
    pub history_len: usize,
    pub written: Vec<PathBuf>,
}

/// Writes the dashboard data files under the configured paths
pub struct DashboardAggregator {
    paths: PathsConfig,
}

impl DashboardAggregator {
    pub fn new(paths: PathsConfig) -> Self {
        Self { paths }
    }

    /// Read the report from disk and aggregate it.
    ///
    /// Fails with `ReportNotFound` when the suite has not produced a report.
    pub fn run(&self) -> E2eResult<AggregationOutput> {
        let report = PlaywrightReport::from_file(&self.paths.report_path())?;
        self.aggregate(&report)
    }

    /// Aggregate an already parsed report
    pub fn aggregate(&self, report: &PlaywrightReport) -> E2eResult<AggregationOutput> {
        let tests = report.extract();
        let snapshot = build_snapshot(tests, &report.stats, Uuid::new_v4().to_string(), Utc::now());
        let mut written = Vec::new();

        let latest = self.paths.latest_path();
        write_json(&latest, &snapshot)?;
        info!("Written: {}", latest.display());
        written.push(latest);

        let history_path = self.paths.history_path();
        let mut history = RunHistory::load(&history_path, self.paths.max_history);
        history.insert(snapshot.history_entry());
        history.save(&history_path)?;
        info!("Written: {}", history_path.display());
        written.push(history_path);

        let current = self.paths.current_csv_path();
        write_text(&current, &current_run_csv(&snapshot.tests))?;
        info!("Written: {}", current.display());
        written.push(current);

        let all_runs = self.paths.summary_csv_path();
        write_text(&all_runs, &all_runs_csv(&history))?;
        info!("Written: {}", all_runs.display());
        written.push(all_runs);

        let s = &snapshot.summary;
        info!(
            "Dashboard data generated: {} tests ({} passed, {} failed, {}% pass rate)",
            s.total, s.passed, s.failed, snapshot.pass_rate
        );

        Ok(AggregationOutput {
            history_len: history.len(),
            snapshot,
            written,
        })
    }
}

/// Grand totals and per-module totals, modules in first-seen order
pub fn summarize(tests: &[TestOutcome]) -> (RunSummary, IndexMap<String, ModuleSummary>) {
    let mut summary = RunSummary::default();
    let mut modules: IndexMap<String, ModuleSummary> = IndexMap::new();

    for test in tests {
        summary.record(test.status);
        modules
            .entry(test.module.clone())
            .or_insert_with(|| ModuleSummary {
                label: test.module_label.clone(),
                counts: RunSummary::default(),
            })
            .counts
            .record(test.status);
    }

    (summary, modules)
}

/// Build the snapshot for a run.
///
/// Start time and duration come from the report's stats, falling back to
/// `now` and the sum of test durations.
pub fn build_snapshot(
    tests: Vec<TestOutcome>,
    stats: &ReportStats,
    run_id: String,
    now: DateTime<Utc>,
) -> RunSnapshot {
    let (summary, modules) = summarize(&tests);
    let duration_ms = match stats.duration {
        Some(d) => d.max(0.0).round() as u64,
        None => tests.iter().map(|t| t.duration_ms).sum(),
    };

    RunSnapshot {
        id: run_id,
        started_at: stats.start_time.unwrap_or(now),
        duration_ms,
        pass_rate: summary.pass_rate(),
        summary,
        modules,
        tests,
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> E2eResult<()> {
    write_text(path, &serde_json::to_string_pretty(value)?)
}

fn write_text(path: &Path, content: &str) -> E2eResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content)?;
    Ok(())
}
