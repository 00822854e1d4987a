//! HTML email summary of the latest run
//!
//! Email is optional: without a relay URL or recipients the notifier skips
//! quietly, and delivery failures are logged without failing the pipeline.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use consoleqa_common::classify::truncate_chars;
use consoleqa_common::config::SinkConfig;
use consoleqa_common::types::pass_rate;
use consoleqa_common::{OutcomeStatus, RunSnapshot, SinkClient};

use crate::error::{E2eError, E2eResult};

const MAX_FAILURE_CHARS: usize = 120;

/// Rendered email
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailReport {
    pub subject: String,
    pub body: String,
}

/// Buttons at the bottom of the email
#[derive(Debug, Clone, Default)]
pub struct ReportLinks {
    pub dashboard_url: Option<String>,
    pub sheets_url: Option<String>,
}

impl ReportLinks {
    pub fn from_config(sinks: &SinkConfig) -> Self {
        Self {
            dashboard_url: sinks.dashboard_url.clone(),
            sheets_url: sinks
                .sheet_url
                .as_ref()
                .map(|_| sinks.sheets_view_url.clone()),
        }
    }
}

/// ✅ for a clean run, 🟡 from 80%, 🔴 below
pub fn rate_icon(rate: u32) -> &'static str {
    match rate {
        100.. => "✅",
        80..=99 => "🟡",
        _ => "🔴",
    }
}

pub fn subject(snapshot: &RunSnapshot, product: &str) -> String {
    format!(
        "QC {} Automation Report – {} – {}% Pass Rate",
        product,
        snapshot.started_at.format("%A, %b %-d, %Y"),
        snapshot.pass_rate
    )
}

/// Render subject and HTML body for `snapshot`
pub fn render(snapshot: &RunSnapshot, product: &str, links: &ReportLinks) -> EmailReport {
    EmailReport {
        subject: subject(snapshot, product),
        body: render_body(snapshot, product, links),
    }
}

fn render_body(snapshot: &RunSnapshot, product: &str, links: &ReportLinks) -> String {
    let s = &snapshot.summary;
    let failures = s.failures();
    let run_date = snapshot.started_at.format("%a, %b %d, %Y");
    let run_time = snapshot.started_at.format("%I:%M %p").to_string().to_lowercase();

    let mut html = String::new();
    html.push_str(concat!(
        "<!DOCTYPE html>\n<html>\n<head><meta charset=\"UTF-8\">",
        "<meta name=\"viewport\" content=\"width=device-width,initial-scale=1.0\"></head>\n",
        "<body style=\"margin:0;padding:0;background:#f5f5f5;font-family:Arial,Helvetica,sans-serif\">\n",
        "<table width=\"100%\" cellpadding=\"0\" cellspacing=\"0\" style=\"background:#f5f5f5;padding:20px 0\"><tr><td align=\"center\">\n",
        "<table width=\"620\" cellpadding=\"0\" cellspacing=\"0\" style=\"background:#fff;border-radius:12px;overflow:hidden\">\n",
    ));

    let _ = write!(
        html,
        concat!(
            "<tr><td style=\"background:linear-gradient(135deg,#8b5cf6,#4c1d95);padding:32px 40px;color:#fff\">",
            "<p style=\"margin:0 0 4px;font-size:13px\">{icon}</p>",
            "<h1 style=\"margin:0 0 6px;font-size:24px\">QC Automation Report</h1>",
            "<p style=\"margin:0 0 4px;font-size:14px\">{product} Automation</p>",
            "<p style=\"margin:0;font-size:13px\">Latest Run: {date}, {time} UTC</p>",
            "</td></tr>\n"
        ),
        icon = rate_icon(snapshot.pass_rate),
        product = escape_html(product),
        date = run_date,
        time = run_time,
    );

    html.push_str("<tr><td style=\"padding:28px 40px 0\"><table width=\"100%\" cellpadding=\"0\" cellspacing=\"0\"><tr>\n");
    html.push_str(&stat_card("Total Tests", &s.total.to_string(), "#333", "#e5e7eb"));
    html.push_str(&stat_card("Passed", &s.passed.to_string(), "#22c55e", "#bbf7d0"));
    html.push_str(&stat_card("Failed", &failures.to_string(), "#ef4444", "#fecaca"));
    html.push_str(&stat_card(
        "Pass Rate",
        &format!("{} {}%", rate_icon(snapshot.pass_rate), snapshot.pass_rate),
        "#333",
        "#e5e7eb",
    ));
    html.push_str("</tr></table></td></tr>\n");

    html.push_str(concat!(
        "<tr><td style=\"padding:24px 40px 0\">",
        "<p style=\"font-size:14px;font-weight:600;color:#333;margin:0 0 10px\">📋 Results by Module</p>",
        "<table style=\"width:100%;border-collapse:collapse;border:1px solid #e5e7eb\">",
        "<thead><tr style=\"background:#f9fafb\">",
        "<th style=\"padding:10px 14px;text-align:left\">Module</th>",
        "<th style=\"padding:10px 14px;color:#22c55e\">Pass</th>",
        "<th style=\"padding:10px 14px;color:#ef4444\">Fail</th>",
        "<th style=\"padding:10px 14px\">Rate</th>",
        "</tr></thead><tbody>\n",
    ));
    for module in snapshot.modules.values() {
        let c = &module.counts;
        let rate = pass_rate(c.passed, c.total);
        let _ = writeln!(
            html,
            concat!(
                "<tr><td style=\"padding:10px 14px;border-bottom:1px solid #f0f0f0\">{} {}</td>",
                "<td style=\"padding:10px 14px;text-align:center;color:#22c55e\">{}</td>",
                "<td style=\"padding:10px 14px;text-align:center;color:#ef4444\">{}</td>",
                "<td style=\"padding:10px 14px;text-align:center\">{}%</td></tr>"
            ),
            rate_icon(rate),
            escape_html(&module.label),
            c.passed,
            c.failures(),
            rate,
        );
    }
    html.push_str("</tbody></table></td></tr>\n");

    if failures > 0 {
        html.push_str(concat!(
            "<tr><td style=\"padding:24px 40px 0\">",
            "<p style=\"font-size:14px;font-weight:600;color:#333;margin:0 0 8px\">🔴 Failed Tests</p>",
            "<table style=\"width:100%;border-collapse:collapse;border:1px solid #e5e7eb\">",
            "<thead><tr style=\"background:#fef2f2\">",
            "<th style=\"padding:10px 14px;text-align:left\">Test Name</th>",
            "<th style=\"padding:10px 14px;text-align:left\">Module</th>",
            "<th style=\"padding:10px 14px;text-align:left\">Error</th>",
            "</tr></thead><tbody>\n",
        ));
        for test in snapshot.tests.iter().filter(|t| t.status != OutcomeStatus::Passed) {
            let error = if test.error.is_empty() {
                "Unknown error".to_string()
            } else {
                truncate_chars(&test.error, MAX_FAILURE_CHARS, "")
            };
            let _ = writeln!(
                html,
                concat!(
                    "<tr><td style=\"padding:8px 14px;font-size:13px\">{}</td>",
                    "<td style=\"padding:8px 14px;font-size:12px;color:#ef4444\">{}</td>",
                    "<td style=\"padding:8px 14px;font-size:12px;color:#666;word-break:break-word\">{}</td></tr>"
                ),
                escape_html(&test.title),
                escape_html(&test.module_label),
                escape_html(&error),
            );
        }
        html.push_str("</tbody></table></td></tr>\n");
    }

    html.push_str("<tr><td style=\"padding:28px 40px;text-align:center\">\n");
    if let Some(url) = &links.dashboard_url {
        html.push_str(&link_button(url, "📊 View Full Dashboard", "#6d28d9"));
    }
    if let Some(url) = &links.sheets_url {
        html.push_str(&link_button(url, "📋 View Test Cases", "#d97706"));
    }
    html.push_str("</td></tr>\n");

    html.push_str(concat!(
        "<tr><td style=\"padding:20px 40px;border-top:1px solid #e5e7eb;text-align:center\">",
        "<p style=\"margin:0 0 4px;font-size:13px;color:#666\">Thanks &amp; Regards,</p>",
        "<p style=\"margin:0 0 8px;font-size:14px;font-weight:600;color:#333\">QA Automation Bot 🤖</p>",
        "<p style=\"margin:0;font-size:11px;color:#999\">This is an automated report generated from the latest test run.</p>",
        "</td></tr>\n</table>\n",
        "<p style=\"max-width:620px;margin:16px auto 0;font-size:10px;color:#999;text-align:left\">",
        "<strong>CONFIDENTIAL COMMUNICATION</strong><br>",
        "This message is intended only for the listed recipients. If you received it in error, ",
        "please delete it and notify the sender.</p>\n",
        "</td></tr></table>\n</body>\n</html>\n",
    ));

    html
}

fn stat_card(label: &str, value: &str, color: &str, border: &str) -> String {
    format!(
        concat!(
            "<td width=\"25%\" style=\"padding:0 6px\">",
            "<div style=\"border:2px solid {border};border-radius:10px;padding:16px;text-align:center\">",
            "<p style=\"margin:0;font-size:11px;color:#666;text-transform:uppercase;font-weight:600\">{label}</p>",
            "<p style=\"margin:6px 0 0;font-size:26px;font-weight:700;color:{color}\">{value}</p>",
            "</div></td>\n"
        ),
        border = border,
        label = label,
        color = color,
        value = value,
    )
}

fn link_button(url: &str, text: &str, color: &str) -> String {
    format!(
        "<a href=\"{}\" style=\"display:inline-block;padding:12px 28px;background:{};color:#fff;text-decoration:none;border-radius:8px;font-weight:600;font-size:14px;margin:0 6px\">{}</a>\n",
        escape_html(url),
        color,
        text
    )
}

/// Minimal escaping for text placed in HTML content and attributes
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[derive(Serialize)]
struct MailPayload<'a> {
    to: &'a str,
    subject: &'a str,
    body: &'a str,
}

#[derive(Deserialize)]
struct MailAck {
    #[serde(default)]
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

/// Mail relay web app endpoint
#[derive(Debug, Clone)]
pub struct MailSink {
    client: SinkClient,
    url: String,
}

impl MailSink {
    pub fn new(url: impl Into<String>, timeout: Duration) -> E2eResult<Self> {
        Ok(Self {
            client: SinkClient::new(timeout)?,
            url: url.into(),
        })
    }

    /// Post the report. A direct answer must carry `{"ok": true}`; an answer
    /// reached through the redirect only has to be a success status.
    pub async fn send(&self, to: &str, report: &EmailReport) -> E2eResult<()> {
        let payload = MailPayload {
            to,
            subject: &report.subject,
            body: &report.body,
        };
        let response = self.client.post_text(&self.url, &payload).await?;
        if response.redirected {
            return Ok(());
        }

        let ack: MailAck = response.json()?;
        if !ack.ok {
            let reason = ack.error.unwrap_or_else(|| "Unknown error".to_string());
            return Err(consoleqa_common::Error::SinkRejected(reason).into());
        }
        Ok(())
    }
}

/// Result of a notification attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyOutcome {
    Sent,
    /// Not configured; nothing was attempted
    Skipped(&'static str),
    /// Attempted and failed; already logged
    Failed(String),
}

/// Reads the latest snapshot and emails it
pub struct Notifier {
    sinks: SinkConfig,
    latest: PathBuf,
}

impl Notifier {
    pub fn new(sinks: SinkConfig, latest: impl Into<PathBuf>) -> Self {
        Self {
            sinks,
            latest: latest.into(),
        }
    }

    /// Send the report if configured. Never returns an error.
    pub async fn notify(&self) -> NotifyOutcome {
        let Some(url) = self.sinks.mail_url.as_deref() else {
            info!("EMAIL_WEB_APP_URL not set, skipping email report");
            return NotifyOutcome::Skipped("EMAIL_WEB_APP_URL not set");
        };
        let Some(to) = self.sinks.recipient_list() else {
            info!("REPORT_RECIPIENTS not set, skipping email report");
            return NotifyOutcome::Skipped("REPORT_RECIPIENTS not set");
        };

        match self.try_send(url, &to).await {
            Ok(()) => {
                info!("Email report sent to {}", to);
                NotifyOutcome::Sent
            }
            Err(e) => {
                error!("Email send failed: {}", e);
                NotifyOutcome::Failed(e.to_string())
            }
        }
    }

    async fn try_send(&self, url: &str, to: &str) -> E2eResult<()> {
        let snapshot = load_snapshot(&self.latest)?;
        let report = render(
            &snapshot,
            &self.sinks.product_name,
            &ReportLinks::from_config(&self.sinks),
        );
        info!("Sending email report to: {}", to);
        MailSink::new(url, self.sinks.timeout())?.send(to, &report).await
    }
}

/// Read the latest snapshot written by the aggregator
pub fn load_snapshot(path: &Path) -> E2eResult<RunSnapshot> {
    if !path.exists() {
        return Err(E2eError::SnapshotNotFound(path.to_path_buf()));
    }
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use consoleqa_common::{ModuleSummary, RunSummary, TestOutcome};
    use indexmap::IndexMap;
    use test_case::test_case;

    fn outcome(title: &str, status: OutcomeStatus, error: &str) -> TestOutcome {
        TestOutcome {
            id: String::new(),
            name: String::new(),
            title: title.to_string(),
            file: "usage.spec.ts".to_string(),
            module: "usage".to_string(),
            module_label: "Usage".to_string(),
            status,
            duration_ms: 1,
            error: error.to_string(),
            attachments: vec![],
            attempt: 0,
        }
    }

    fn snapshot(tests: Vec<TestOutcome>) -> RunSnapshot {
        let mut summary = RunSummary::default();
        let mut counts = RunSummary::default();
        for t in &tests {
            summary.record(t.status);
            counts.record(t.status);
        }
        let mut modules = IndexMap::new();
        modules.insert(
            "usage".to_string(),
            ModuleSummary { label: "Usage".to_string(), counts },
        );
        RunSnapshot {
            id: "run-1".to_string(),
            started_at: Utc.with_ymd_and_hms(2026, 2, 19, 9, 5, 0).unwrap(),
            duration_ms: 1000,
            pass_rate: summary.pass_rate(),
            summary,
            modules,
            tests,
        }
    }

    #[test_case(100, "✅" ; "clean run")]
    #[test_case(99, "🟡" ; "almost clean")]
    #[test_case(80, "🟡" ; "warning floor")]
    #[test_case(79, "🔴" ; "below warning")]
    #[test_case(0, "🔴" ; "nothing passed")]
    fn test_rate_icon_thresholds(rate: u32, icon: &str) {
        assert_eq!(rate_icon(rate), icon);
    }

    #[test]
    fn test_subject_line() {
        let snap = snapshot(vec![
            outcome("a", OutcomeStatus::Passed, ""),
            outcome("b", OutcomeStatus::Failed, "x"),
            outcome("c", OutcomeStatus::Skipped, ""),
        ]);
        assert_eq!(
            subject(&snap, "Speech Console"),
            "QC Speech Console Automation Report – Thursday, Feb 19, 2026 – 33% Pass Rate"
        );
    }

    #[test]
    fn test_failed_section_merges_timeouts() {
        let long = "z".repeat(300);
        let snap = snapshot(vec![
            outcome("TC_USE_01 - <Overview>", OutcomeStatus::TimedOut, ""),
            outcome("TC_USE_02 - Logs", OutcomeStatus::Failed, &long),
            outcome("TC_USE_03 - Export", OutcomeStatus::Passed, ""),
        ]);
        let body = render(&snap, "Console", &ReportLinks::default()).body;

        assert!(body.contains("🔴 Failed Tests"));
        assert!(body.contains("TC_USE_01 - &lt;Overview&gt;"));
        assert!(body.contains("Unknown error"));
        assert!(body.contains(&"z".repeat(120)));
        assert!(!body.contains(&"z".repeat(121)));
        assert!(!body.contains("TC_USE_03"));
        // failed card = failed + timedOut
        assert!(body.contains(">2</p>"));
    }

    #[test]
    fn test_clean_run_has_no_failed_section() {
        let snap = snapshot(vec![outcome("a", OutcomeStatus::Passed, "")]);
        let links = ReportLinks {
            dashboard_url: Some("https://qa.example/dashboard".to_string()),
            sheets_url: None,
        };
        let body = render(&snap, "Console", &links).body;
        assert!(!body.contains("Failed Tests"));
        assert!(body.contains("https://qa.example/dashboard"));
        assert!(!body.contains("View Test Cases"));
        assert!(body.contains("✅ Usage"));
    }

    #[test]
    fn test_sheets_link_only_with_sheet_sink() {
        let mut sinks = SinkConfig::default();
        assert!(ReportLinks::from_config(&sinks).sheets_url.is_none());
        sinks.sheet_url = Some("https://script.example/exec".to_string());
        assert_eq!(
            ReportLinks::from_config(&sinks).sheets_url.as_deref(),
            Some("https://docs.google.com/spreadsheets")
        );
    }

    #[tokio::test]
    async fn test_unconfigured_notifier_skips() {
        let notifier = Notifier::new(SinkConfig::default(), "missing.json");
        assert_eq!(
            notifier.notify().await,
            NotifyOutcome::Skipped("EMAIL_WEB_APP_URL not set")
        );

        let sinks = SinkConfig {
            mail_url: Some("http://127.0.0.1:9/exec".to_string()),
            ..SinkConfig::default()
        };
        let notifier = Notifier::new(sinks, "missing.json");
        assert_eq!(
            notifier.notify().await,
            NotifyOutcome::Skipped("REPORT_RECIPIENTS not set")
        );
    }

    #[test]
    fn test_missing_snapshot_points_at_aggregate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("docs/data/latest.json");
        let err = load_snapshot(&path).unwrap_err();
        assert!(matches!(&err, E2eError::SnapshotNotFound(p) if p == &path));
        assert!(err.to_string().contains("consoleqa aggregate"));
        assert!(!err.to_string().contains("npx playwright test"));
    }
}
