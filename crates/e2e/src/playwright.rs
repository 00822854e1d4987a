//! Launching the Playwright suite

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};

use tokio::io::BufReader;
use tokio::process::{Child, Command};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use consoleqa_common::config::{RunConfig, TargetConfig};
use consoleqa_common::{poll_until, PollConfig};

use crate::error::{E2eError, E2eResult};
use crate::recorder::RunRecorder;

/// Reporter that appends one JSON line per finished attempt
const EVENTS_REPORTER: &str = include_str!("../assets/events-reporter.cjs");
const EVENTS_REPORTER_FILE: &str = "consoleqa-events-reporter.cjs";

/// How a suite run ended
#[derive(Debug, Clone)]
pub struct SuiteRun {
    /// Engine verdict: every test passed
    pub passed: bool,
    pub exit_code: Option<i32>,
    pub duration: Duration,
}

/// Where a run writes its JSON report and its test-end events
#[derive(Debug, Clone)]
pub struct ReportTargets {
    pub report: PathBuf,
    pub events: PathBuf,
}

impl ReportTargets {
    /// Reporter file installed next to the events file
    pub fn reporter_path(&self) -> PathBuf {
        self.events.with_file_name(EVENTS_REPORTER_FILE)
    }

    /// `--reporter` value: console output, the JSON report and the events
    pub fn reporter_arg(&self) -> String {
        format!("list,json,{}", self.reporter_path().display())
    }

    /// Write the reporter and start an empty events file
    async fn install(&self) -> E2eResult<()> {
        for path in [&self.report, &self.events] {
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::write(self.reporter_path(), EVENTS_REPORTER).await?;
        tokio::fs::write(&self.events, b"").await?;
        Ok(())
    }
}

/// Runs `npx playwright test` against the configured console
pub struct SuiteLauncher {
    suite_dir: PathBuf,
    timeout: Duration,
    env: Vec<(&'static str, String)>,
    targets: Option<ReportTargets>,
}

impl SuiteLauncher {
    pub fn new(target: &TargetConfig, run: &RunConfig) -> Self {
        let mut env = vec![
            ("BASE_URL", target.base_url.clone()),
            ("LOGIN_URL", target.login_url.clone()),
        ];
        if let Some(email) = &target.email {
            env.push(("TEST_EMAIL", email.clone()));
        }
        if let Some(password) = &target.password {
            env.push(("TEST_PASSWORD", password.clone()));
        }
        if run.ci {
            env.push(("CI", "true".to_string()));
        }

        Self {
            suite_dir: run.suite_dir.clone(),
            timeout: run.timeout(),
            env,
            targets: None,
        }
    }

    /// Send the JSON report to `report` and stream test-end events through
    /// `events`. Relative paths are resolved against the current directory,
    /// since the engine runs from the suite directory.
    pub fn with_report_targets(mut self, report: &Path, events: &Path) -> E2eResult<Self> {
        self.targets = Some(ReportTargets {
            report: absolute(report)?,
            events: absolute(events)?,
        });
        Ok(self)
    }

    pub fn report_targets(&self) -> Option<&ReportTargets> {
        self.targets.as_ref()
    }

    /// Variables exported to the suite
    pub fn env(&self) -> &[(&'static str, String)] {
        &self.env
    }

    /// Check that Playwright can be invoked from the suite directory
    pub async fn check_installed(&self) -> E2eResult<()> {
        let output = Command::new("npx")
            .args(["playwright", "--version"])
            .current_dir(&self.suite_dir)
            .output()
            .await
            .map_err(|_| E2eError::PlaywrightNotFound)?;

        if !output.status.success() {
            return Err(E2eError::PlaywrightNotFound);
        }
        debug!(
            "Playwright {}",
            String::from_utf8_lossy(&output.stdout).trim()
        );
        Ok(())
    }

    /// Run the suite, passing `extra_args` through to `playwright test`.
    ///
    /// With report targets set, test-end events are fed to `recorder` while
    /// the engine runs. Failing tests are a verdict, not an error. Exceeding
    /// the run timeout stops the engine and returns [`E2eError::RunTimeout`].
    pub async fn run(
        &self,
        extra_args: &[String],
        recorder: Option<&mut RunRecorder>,
    ) -> E2eResult<SuiteRun> {
        self.check_installed().await?;

        let mut command = Command::new("npx");
        command.args(["playwright", "test"]);
        let events = match &self.targets {
            Some(targets) => {
                targets.install().await?;
                command
                    .arg(format!("--reporter={}", targets.reporter_arg()))
                    .env("PLAYWRIGHT_JSON_OUTPUT_NAME", &targets.report)
                    .env("CONSOLEQA_EVENTS_FILE", &targets.events);
                Some(tokio::fs::File::open(&targets.events).await?)
            }
            None => None,
        };

        info!("Running suite in {}", self.suite_dir.display());
        let mut child = command
            .args(extra_args)
            .envs(self.env.iter().map(|(k, v)| (*k, v.as_str())))
            .current_dir(&self.suite_dir)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| E2eError::Playwright(format!("failed to spawn: {}", e)))?;

        let start = Instant::now();
        let (exited_tx, exited_rx) = oneshot::channel::<()>();
        let wait = async {
            let waited = tokio::time::timeout(self.timeout, child.wait()).await;
            let _ = exited_tx.send(());
            waited
        };
        let follow = async {
            match (recorder, events) {
                (Some(recorder), Some(file)) => {
                    let exited = async {
                        let _ = exited_rx.await;
                    };
                    recorder.follow(BufReader::new(file), exited).await
                }
                _ => Ok(0),
            }
        };
        let (waited, followed) = tokio::join!(wait, follow);

        if let Err(e) = followed {
            warn!("Lost test events during the run: {}", e);
        }

        match waited {
            Ok(status) => {
                let status = status?;
                let run = suite_run(status, start.elapsed());
                if run.passed {
                    info!("✓ Suite passed in {:.1}s", run.duration.as_secs_f64());
                } else {
                    warn!("Suite finished with failures (exit code {:?})", run.exit_code);
                }
                Ok(run)
            }
            Err(_) => {
                warn!("Suite exceeded {}s, stopping", self.timeout.as_secs());
                stop(&mut child).await;
                Err(E2eError::RunTimeout(self.timeout.as_secs()))
            }
        }
    }
}

fn absolute(path: &Path) -> E2eResult<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

fn suite_run(status: ExitStatus, duration: Duration) -> SuiteRun {
    SuiteRun {
        passed: status.success(),
        exit_code: status.code(),
        duration,
    }
}

/// SIGTERM, a short grace period, then kill
async fn stop(child: &mut Child) {
    #[cfg(unix)]
    {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        if let Some(id) = child.id() {
            if kill(Pid::from_raw(id as i32), Signal::SIGTERM).is_ok()
                && tokio::time::timeout(Duration::from_secs(5), child.wait())
                    .await
                    .is_ok()
            {
                return;
            }
        }
    }

    let _ = child.kill().await;
}

/// Wait until the console answers at all, before spending a suite run on it
pub async fn wait_for_target(base_url: &str, config: &PollConfig) -> E2eResult<()> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()?;

    poll_until(&format!("console at {}", base_url), config, || {
        let client = client.clone();
        async move {
            match client.get(base_url).send().await {
                Ok(resp) if !resp.status().is_server_error() => Some(()),
                Ok(resp) => {
                    debug!("Console returned {}", resp.status());
                    None
                }
                Err(e) => {
                    if !e.is_connect() {
                        debug!("Console check error: {}", e);
                    }
                    None
                }
            }
        }
    })
    .await?;

    info!("Console reachable at {}", base_url);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_env_exports_only_configured_values() {
        let target = TargetConfig {
            email: Some("qa@example.com".to_string()),
            ..TargetConfig::default()
        };
        let launcher = SuiteLauncher::new(&target, &RunConfig::default());
        let keys: Vec<&str> = launcher.env().iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, vec!["BASE_URL", "LOGIN_URL", "TEST_EMAIL"]);

        let ci = RunConfig {
            ci: true,
            ..RunConfig::default()
        };
        let launcher = SuiteLauncher::new(&TargetConfig::default(), &ci);
        assert!(launcher.env().iter().any(|(k, v)| *k == "CI" && v == "true"));
    }

    #[tokio::test]
    async fn test_report_targets_install_reporter() {
        let dir = tempfile::tempdir().unwrap();
        let report = dir.path().join("reports/playwright-report.json");
        let events = dir.path().join("reports/test-events.jsonl");
        std::fs::create_dir_all(events.parent().unwrap()).unwrap();
        std::fs::write(&events, "stale\n").unwrap();

        let launcher = SuiteLauncher::new(&TargetConfig::default(), &RunConfig::default())
            .with_report_targets(&report, &events)
            .unwrap();
        let targets = launcher.report_targets().unwrap();
        targets.install().await.unwrap();

        assert_eq!(std::fs::read_to_string(&events).unwrap(), "");
        let reporter = std::fs::read_to_string(targets.reporter_path()).unwrap();
        assert!(reporter.contains("CONSOLEQA_EVENTS_FILE"));
        assert_eq!(
            targets.reporter_arg(),
            format!("list,json,{}", dir.path().join("reports").join(EVENTS_REPORTER_FILE).display())
        );
    }

    #[test]
    fn test_relative_targets_become_absolute() {
        let launcher = SuiteLauncher::new(&TargetConfig::default(), &RunConfig::default())
            .with_report_targets(Path::new("reports/r.json"), Path::new("reports/e.jsonl"))
            .unwrap();
        let targets = launcher.report_targets().unwrap();
        assert!(targets.report.is_absolute());
        assert!(targets.events.ends_with("reports/e.jsonl"));
    }

    #[tokio::test]
    async fn test_wait_for_target_recovers_from_server_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let config = PollConfig::fixed(Duration::from_secs(5), Duration::from_millis(10));
        wait_for_target(&server.uri(), &config).await.unwrap();
    }

    #[tokio::test]
    async fn test_wait_for_target_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let config = PollConfig::fixed(Duration::from_millis(100), Duration::from_millis(20));
        let err = wait_for_target(&server.uri(), &config).await.unwrap_err();
        assert!(matches!(
            err,
            E2eError::Common(consoleqa_common::Error::Timeout { .. })
        ));
    }
}
