//! Pipeline configuration
//!
//! Settings come from an optional TOML file and are then overlaid with the
//! environment variables the suite has always used (`BASE_URL`,
//! `GOOGLE_APPS_SCRIPT_URL`, `EMAIL_WEB_APP_URL`, ...). Empty variables
//! count as unset.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Result;
use crate::http::DEFAULT_SINK_TIMEOUT;

/// Default location of the settings file
pub const DEFAULT_CONFIG_FILE: &str = "consoleqa.toml";

/// Complete pipeline configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Console under test
    pub target: TargetConfig,

    /// Spreadsheet and mail sinks
    pub sinks: SinkConfig,

    /// Where reports and dashboard artifacts live
    pub paths: PathsConfig,

    /// Git publishing and remote scheduler
    pub publish: PublishConfig,

    /// Suite execution
    pub run: RunConfig,
}

/// Console under test
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    pub base_url: String,
    pub login_url: String,
    pub email: Option<String>,
    pub password: Option<String>,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            base_url: "https://console.shunyalabs.ai".to_string(),
            login_url: "https://console.shunyalabs.ai/auth/sign-in".to_string(),
            email: None,
            password: None,
        }
    }
}

/// External reporting sinks
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SinkConfig {
    /// Spreadsheet web app endpoint
    pub sheet_url: Option<String>,

    /// Mail relay web app endpoint
    pub mail_url: Option<String>,

    /// Email recipients
    pub recipients: Vec<String>,

    /// Published dashboard, linked from the email
    pub dashboard_url: Option<String>,

    /// Spreadsheet view, linked from the email when a sheet sink is set
    pub sheets_view_url: String,

    /// Product name used in the email subject and header
    pub product_name: String,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            sheet_url: None,
            mail_url: None,
            recipients: Vec::new(),
            dashboard_url: None,
            sheets_view_url: "https://docs.google.com/spreadsheets".to_string(),
            product_name: "Shunyalabs Console".to_string(),
            timeout_secs: DEFAULT_SINK_TIMEOUT.as_secs(),
        }
    }
}

impl SinkConfig {
    /// Recipients joined the way the mail relay expects them
    pub fn recipient_list(&self) -> Option<String> {
        if self.recipients.is_empty() {
            None
        } else {
            Some(self.recipients.join(","))
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Artifact locations, relative to `root` unless absolute
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub root: PathBuf,
    pub report: PathBuf,
    /// JSON-lines test-end events written during a run
    pub events: PathBuf,
    pub latest: PathBuf,
    pub history: PathBuf,
    pub current_csv: PathBuf,
    pub summary_csv: PathBuf,
    pub max_history: usize,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            report: PathBuf::from("reports/playwright-report.json"),
            events: PathBuf::from("reports/test-events.jsonl"),
            latest: PathBuf::from("docs/data/latest.json"),
            history: PathBuf::from("docs/history/runs.json"),
            current_csv: PathBuf::from("docs/exports/current-run.csv"),
            summary_csv: PathBuf::from("docs/exports/all-runs-summary.csv"),
            max_history: 100,
        }
    }
}

impl PathsConfig {
    /// Same layout under a different root
    pub fn rooted(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    pub fn resolve(&self, path: &Path) -> PathBuf {
        self.root.join(path)
    }

    pub fn report_path(&self) -> PathBuf {
        self.resolve(&self.report)
    }

    pub fn events_path(&self) -> PathBuf {
        self.resolve(&self.events)
    }

    pub fn latest_path(&self) -> PathBuf {
        self.resolve(&self.latest)
    }

    pub fn history_path(&self) -> PathBuf {
        self.resolve(&self.history)
    }

    pub fn current_csv_path(&self) -> PathBuf {
        self.resolve(&self.current_csv)
    }

    pub fn summary_csv_path(&self) -> PathBuf {
        self.resolve(&self.summary_csv)
    }

    /// Directories the publisher stages, relative to the root
    pub fn artifact_dirs(&self) -> Vec<PathBuf> {
        let mut dirs: Vec<PathBuf> = [&self.latest, &self.history, &self.current_csv]
            .iter()
            .filter_map(|p| p.parent().map(Path::to_path_buf))
            .collect();
        dirs.dedup();
        dirs
    }
}

/// Git publishing and the remote scheduler trigger
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PublishConfig {
    pub owner: Option<String>,
    pub repo: Option<String>,
    pub token: Option<String>,
    pub event_type: String,
    pub api_base: String,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            owner: None,
            repo: None,
            token: None,
            event_type: "run-tests".to_string(),
            api_base: "https://api.github.com".to_string(),
        }
    }
}

/// Suite execution
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Directory holding the browser suite (`playwright.config.ts`)
    pub suite_dir: PathBuf,

    /// Run-level timeout in seconds
    pub timeout_secs: u64,

    /// Running under CI
    pub ci: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            suite_dir: PathBuf::from("."),
            timeout_secs: 60 * 60,
            ci: false,
        }
    }
}

impl RunConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Settings {
    /// Load settings from a TOML file, or defaults when it does not exist
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let settings: Self = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Self::default())
        }
    }

    /// Overlay the process environment
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Overlay values from `lookup`, ignoring unset and empty variables
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("BASE_URL") {
            self.target.base_url = v;
        }
        if let Some(v) = get("LOGIN_URL") {
            self.target.login_url = v;
        }
        if let Some(v) = get("TEST_EMAIL") {
            self.target.email = Some(v);
        }
        if let Some(v) = get("TEST_PASSWORD") {
            self.target.password = Some(v);
        }
        if let Some(v) = get("GOOGLE_APPS_SCRIPT_URL") {
            self.sinks.sheet_url = Some(v);
        }
        if let Some(v) = get("EMAIL_WEB_APP_URL") {
            self.sinks.mail_url = Some(v);
        }
        if let Some(v) = get("REPORT_RECIPIENTS") {
            self.sinks.recipients = parse_recipients(&v);
        }
        if let Some(v) = get("DASHBOARD_URL") {
            self.sinks.dashboard_url = Some(v);
        }
        if let Some(v) = get("SHEETS_VIEW_URL") {
            self.sinks.sheets_view_url = v;
        }
        if let Some(v) = get("GITHUB_OWNER") {
            self.publish.owner = Some(v);
        }
        if let Some(v) = get("GITHUB_REPO") {
            self.publish.repo = Some(v);
        }
        if let Some(v) = get("GITHUB_PAT") {
            self.publish.token = Some(v);
        }
        if let Some(v) = get("CI") {
            self.run.ci = is_truthy(&v);
        }
    }
}

/// Split a comma-separated recipient list, dropping blanks
pub fn parse_recipients(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn is_truthy(value: &str) -> bool {
    !matches!(value.trim().to_ascii_lowercase().as_str(), "" | "0" | "false" | "no")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(settings.paths.max_history, 100);
        assert!(settings.sinks.sheet_url.is_none());
        assert_eq!(settings.sinks.timeout(), DEFAULT_SINK_TIMEOUT);
        assert_eq!(
            settings.paths.events_path(),
            PathBuf::from("./reports/test-events.jsonl")
        );
    }

    #[test]
    fn test_partial_toml_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("consoleqa.toml");
        std::fs::write(
            &path,
            r#"
[sinks]
mail_url = "https://mail.example/exec"
recipients = ["qa@example.com"]

[paths]
root = "/srv/qa"
"#,
        )
        .unwrap();

        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.sinks.mail_url.as_deref(), Some("https://mail.example/exec"));
        assert_eq!(settings.sinks.recipient_list().as_deref(), Some("qa@example.com"));
        assert_eq!(
            settings.paths.latest_path(),
            PathBuf::from("/srv/qa/docs/data/latest.json")
        );
        assert_eq!(settings.run.timeout_secs, 3600);
    }

    #[test]
    fn test_env_overlay_ignores_empty_values() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("GOOGLE_APPS_SCRIPT_URL", ""),
            ("EMAIL_WEB_APP_URL", "https://mail.example/exec"),
            ("REPORT_RECIPIENTS", "a@example.com, ,b@example.com"),
            ("CI", "true"),
        ]);

        let mut settings = Settings::default();
        settings.apply_env_from(|k| env.get(k).map(|v| v.to_string()));

        assert!(settings.sinks.sheet_url.is_none());
        assert_eq!(settings.sinks.mail_url.as_deref(), Some("https://mail.example/exec"));
        assert_eq!(settings.sinks.recipients, vec!["a@example.com", "b@example.com"]);
        assert!(settings.run.ci);
    }

    #[test]
    fn test_artifact_dirs() {
        let paths = PathsConfig::default();
        assert_eq!(
            paths.artifact_dirs(),
            vec![
                PathBuf::from("docs/data"),
                PathBuf::from("docs/history"),
                PathBuf::from("docs/exports"),
            ]
        );
    }
}
