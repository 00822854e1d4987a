//! Flattening of the browser engine's JSON report
//!
//! The report is a tree of suites → specs → tests → attempts. Extraction
//! walks it depth first, turns every attempt into a [`TestOutcome`] and
//! then keeps only the final attempt of each logical test.

use std::path::Path;

use chrono::{DateTime, Utc};
use indexmap::map::Entry;
use indexmap::IndexMap;
use serde::Deserialize;
use tracing::debug;

use consoleqa_common::classify::truncate_chars;
use consoleqa_common::title::{id_and_name, is_auth_setup_file, module_key, module_label};
use consoleqa_common::{Attachment, OutcomeStatus, TestOutcome};

use crate::error::{E2eError, E2eResult};

/// Maximum characters of joined error text kept per outcome
pub const MAX_ERROR_CHARS: usize = 500;

/// Root of the engine's JSON report
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlaywrightReport {
    #[serde(default)]
    pub suites: Vec<ReportSuite>,

    #[serde(default)]
    pub stats: ReportStats,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportStats {
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,

    /// Wall-clock duration of the run in milliseconds
    #[serde(default)]
    pub duration: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportSuite {
    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub specs: Vec<ReportSpec>,

    #[serde(default)]
    pub suites: Vec<ReportSuite>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportSpec {
    pub title: String,

    #[serde(default)]
    pub file: String,

    #[serde(default)]
    pub tests: Vec<ReportTest>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportTest {
    #[serde(default)]
    pub results: Vec<ReportAttempt>,
}

/// One execution of a test
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportAttempt {
    #[serde(default)]
    pub status: String,

    #[serde(default)]
    pub duration: f64,

    #[serde(default)]
    pub errors: Vec<ReportError>,

    #[serde(default)]
    pub attachments: Vec<ReportAttachment>,

    #[serde(default)]
    pub retry: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportError {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportAttachment {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub path: Option<String>,

    #[serde(default)]
    pub content_type: String,
}

impl PlaywrightReport {
    /// Parse a report from a JSON string
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Read the report written by the engine's JSON reporter.
    ///
    /// A missing report is a precondition failure: the suite never ran.
    pub fn from_file(path: &Path) -> E2eResult<Self> {
        if !path.exists() {
            return Err(E2eError::ReportNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content).map_err(|source| E2eError::ReportParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// One outcome per logical test, final attempt only
    pub fn extract(&self) -> Vec<TestOutcome> {
        let mut attempts = Vec::new();
        for suite in &self.suites {
            collect_attempts(suite, &mut attempts);
        }
        debug!("Collected {} attempt(s) from report", attempts.len());
        final_attempts(attempts)
    }
}

fn collect_attempts(suite: &ReportSuite, out: &mut Vec<TestOutcome>) {
    for spec in &suite.specs {
        if is_auth_setup_file(&spec.file) {
            continue;
        }
        for test in &spec.tests {
            for attempt in &test.results {
                out.push(outcome_from_attempt(spec, attempt));
            }
        }
    }

    for child in &suite.suites {
        collect_attempts(child, out);
    }
}

fn outcome_from_attempt(spec: &ReportSpec, attempt: &ReportAttempt) -> TestOutcome {
    let (id, name) = id_and_name(&spec.title);
    let module = module_key(&spec.file);
    let module_label = module_label(&module);

    let joined = attempt
        .errors
        .iter()
        .map(|e| e.message.as_deref().unwrap_or_default())
        .collect::<Vec<_>>()
        .join("\n");

    let attachments = attempt
        .attachments
        .iter()
        .map(|a| Attachment {
            name: a.name.clone(),
            relative_path: a
                .path
                .as_deref()
                .and_then(|p| Path::new(p).file_name())
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            content_type: a.content_type.clone(),
        })
        .collect();

    TestOutcome {
        id,
        name,
        title: spec.title.clone(),
        file: spec.file.clone(),
        module,
        module_label,
        status: OutcomeStatus::from_engine(&attempt.status),
        duration_ms: attempt.duration.max(0.0).round() as u64,
        error: truncate_chars(&joined, MAX_ERROR_CHARS, ""),
        attachments,
        attempt: attempt.retry,
    }
}

/// Collapse attempts sharing a `file::title` key to the highest retry.
///
/// Keys keep the order in which they were first seen.
pub fn final_attempts<I>(attempts: I) -> Vec<TestOutcome>
where
    I: IntoIterator<Item = TestOutcome>,
{
    let mut latest: IndexMap<String, TestOutcome> = IndexMap::new();
    for outcome in attempts {
        match latest.entry(outcome.key()) {
            Entry::Occupied(mut slot) => {
                if outcome.attempt > slot.get().attempt {
                    slot.insert(outcome);
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(outcome);
            }
        }
    }
    latest.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn attempt(status: &str, retry: u32, error: Option<&str>) -> serde_json::Value {
        let errors = error.map(|m| vec![json!({ "message": m })]).unwrap_or_default();
        json!({ "status": status, "duration": 120, "errors": errors, "attachments": [], "retry": retry })
    }

    fn report(value: serde_json::Value) -> PlaywrightReport {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_nested_suites_are_walked() {
        let r = report(json!({
            "suites": [{
                "title": "billing.spec.ts",
                "specs": [{ "title": "TC_BILL_01 - Loads", "file": "billing.spec.ts",
                            "tests": [{ "results": [attempt("passed", 0, None)] }] }],
                "suites": [{
                    "title": "Plans",
                    "specs": [{ "title": "TC_BILL_02 - Plans", "file": "billing.spec.ts",
                                "tests": [{ "results": [attempt("failed", 0, Some("boom"))] }] }]
                }]
            }]
        }));

        let outcomes = r.extract();
        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0].id, "TC_BILL_01");
        assert_eq!(outcomes[0].module, "billing");
        assert_eq!(outcomes[0].module_label, "Billing");
        assert_eq!(outcomes[1].status, OutcomeStatus::Failed);
        assert_eq!(outcomes[1].error, "boom");
    }

    #[test]
    fn test_auth_setup_spec_is_skipped() {
        let r = report(json!({
            "suites": [{
                "specs": [
                    { "title": "authenticate", "file": "auth.setup.ts",
                      "tests": [{ "results": [attempt("passed", 0, None)] }] },
                    { "title": "TC_DASH_01 - Heading", "file": "dashboard.spec.ts",
                      "tests": [{ "results": [attempt("passed", 0, None)] }] }
                ]
            }]
        }));

        let outcomes = r.extract();
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].module, "dashboard");
    }

    #[test]
    fn test_retried_then_passed_keeps_final_attempt() {
        let r = report(json!({
            "suites": [{
                "specs": [{ "title": "TC_USE_03 - Logs", "file": "usage.spec.ts",
                            "tests": [{ "results": [
                                attempt("failed", 0, Some("first")),
                                attempt("failed", 1, Some("second")),
                                attempt("passed", 2, None)
                            ] }] }]
            }]
        }));

        let outcomes = r.extract();
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].status, OutcomeStatus::Passed);
        assert_eq!(outcomes[0].attempt, 2);
        assert!(outcomes[0].error.is_empty());
    }

    #[test]
    fn test_final_attempt_wins_regardless_of_order() {
        let r = report(json!({
            "suites": [{
                "specs": [{ "title": "TC_SET_02 - Rename", "file": "settings.spec.ts",
                            "tests": [{ "results": [
                                attempt("passed", 2, None),
                                attempt("failed", 0, Some("first")),
                                attempt("timedOut", 1, Some("Timeout"))
                            ] }] }]
            }]
        }));

        let first = r.extract();
        let second = r.extract();
        assert_eq!(first, second);
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].status, OutcomeStatus::Passed);
    }

    #[test]
    fn test_same_title_in_different_files_is_distinct() {
        let r = report(json!({
            "suites": [{
                "specs": [
                    { "title": "loads", "file": "billing.spec.ts",
                      "tests": [{ "results": [attempt("passed", 0, None)] }] },
                    { "title": "loads", "file": "usage.spec.ts",
                      "tests": [{ "results": [attempt("skipped", 0, None)] }] }
                ]
            }]
        }));

        let outcomes = r.extract();
        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0].id, "loads");
        assert_eq!(outcomes[1].status, OutcomeStatus::Skipped);
    }

    #[test]
    fn test_errors_joined_and_truncated() {
        let long = "e".repeat(600);
        let r = report(json!({
            "suites": [{
                "specs": [{ "title": "t", "file": "usage.spec.ts",
                            "tests": [{ "results": [{
                                "status": "interrupted",
                                "errors": [{ "message": "one" }, { "message": long }]
                            }] }] }]
            }]
        }));

        let outcome = &r.extract()[0];
        assert_eq!(outcome.status, OutcomeStatus::Failed);
        assert!(outcome.error.starts_with("one\neee"));
        assert_eq!(outcome.error.chars().count(), MAX_ERROR_CHARS);
    }

    #[test]
    fn test_attachment_paths_reduced_to_base_name() {
        let r = report(json!({
            "suites": [{
                "specs": [{ "title": "t", "file": "api-keys.spec.ts",
                            "tests": [{ "results": [{
                                "status": "failed",
                                "attachments": [
                                    { "name": "screenshot", "path": "/ci/test-results/x/test-failed-1.png", "contentType": "image/png" },
                                    { "name": "stdout" }
                                ]
                            }] }] }]
            }]
        }));

        let outcome = &r.extract()[0];
        assert_eq!(outcome.attachments[0].relative_path, "test-failed-1.png");
        assert_eq!(outcome.attachments[0].content_type, "image/png");
        assert_eq!(outcome.attachments[1].relative_path, "");
        assert_eq!(outcome.module_label, "API Keys");
    }

    #[test]
    fn test_missing_report_is_precondition_failure() {
        let dir = tempfile::tempdir().unwrap();
        let err = PlaywrightReport::from_file(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, E2eError::ReportNotFound(_)));
        assert!(err.to_string().contains("Run the suite first"));
    }

    #[test]
    fn test_stats_are_optional() {
        let r = PlaywrightReport::from_json(r#"{"suites": []}"#).unwrap();
        assert!(r.stats.start_time.is_none());
        assert!(r.extract().is_empty());

        let r = PlaywrightReport::from_json(
            r#"{"suites": [], "stats": {"startTime": "2026-02-19T09:05:00.000Z", "duration": 1234.6}}"#,
        )
        .unwrap();
        assert_eq!(r.stats.duration, Some(1234.6));
        assert!(r.stats.start_time.is_some());
    }
}
