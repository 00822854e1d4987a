//! End-to-end pipeline: run the suite, then aggregate, notify and publish

use std::time::Duration;

use tracing::{error, info, warn};

use consoleqa_common::{PollConfig, Settings};

use crate::aggregator::{AggregationOutput, DashboardAggregator};
use crate::error::E2eResult;
use crate::notifier::{Notifier, NotifyOutcome};
use crate::playwright::{wait_for_target, SuiteLauncher, SuiteRun};
use crate::publish::{DashboardPublisher, PublishOutcome};
use crate::recorder::{RecorderOutcome, RunRecorder, SheetSink};

/// Pipeline switches not covered by [`Settings`]
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    /// Arguments passed through to `playwright test`
    pub extra_args: Vec<String>,

    /// Commit and push the dashboard afterwards
    pub publish: bool,

    /// Wait for the console to answer before launching the suite
    pub preflight: Option<PollConfig>,
}

impl PipelineConfig {
    /// Preflight check with the default backoff, bounded by `timeout`
    pub fn with_preflight(mut self, timeout: Duration) -> Self {
        self.preflight = Some(PollConfig {
            timeout,
            ..PollConfig::default()
        });
        self
    }
}

/// Everything one pipeline invocation did
#[derive(Debug)]
pub struct PipelineReport {
    /// `None` when only the reporting stages ran
    pub suite: Option<SuiteRun>,
    /// Spreadsheet delivery of the live events; `None` without a suite run
    pub recorder: Option<RecorderOutcome>,
    pub aggregation: AggregationOutput,
    pub notify: NotifyOutcome,
    pub publish: Option<PublishOutcome>,
}

impl PipelineReport {
    /// Process exit code: the engine's verdict, whatever the reporting did
    pub fn exit_code(&self) -> i32 {
        match &self.suite {
            Some(run) if !run.passed => run.exit_code.filter(|c| *c != 0).unwrap_or(1),
            _ => 0,
        }
    }
}

/// Drives the stages in order
pub struct Pipeline {
    settings: Settings,
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(settings: Settings, config: PipelineConfig) -> Self {
        Self { settings, config }
    }

    /// Recorder pushing to the configured sheet, or printing without one
    pub fn recorder(&self) -> E2eResult<RunRecorder> {
        let sink = match &self.settings.sinks.sheet_url {
            Some(url) => Some(SheetSink::new(url.clone(), self.settings.sinks.timeout())?),
            None => None,
        };
        Ok(RunRecorder::new(sink))
    }

    /// Launch the suite while recording its test-end events, then run the
    /// reporting stages on its report.
    ///
    /// Recorded rows are delivered even when the run times out.
    pub async fn run(&self) -> E2eResult<PipelineReport> {
        if let Some(poll) = &self.config.preflight {
            wait_for_target(&self.settings.target.base_url, poll).await?;
        }

        let paths = &self.settings.paths;
        let launcher = SuiteLauncher::new(&self.settings.target, &self.settings.run)
            .with_report_targets(&paths.report_path(), &paths.events_path())?;
        let mut recorder = self.recorder()?;

        let suite = launcher
            .run(&self.config.extra_args, Some(&mut recorder))
            .await;
        let recorded = match &suite {
            Err(_) if recorder.rows().is_empty() => None,
            _ => Some(recorder.finish().await),
        };
        let suite = suite?;

        let mut report = self.report(Some(suite)).await?;
        report.recorder = recorded;
        Ok(report)
    }

    /// Aggregate, notify and optionally publish.
    ///
    /// Only a missing or unreadable report is an error here; notification
    /// and publishing failures are logged and recorded in the report.
    pub async fn report(&self, suite: Option<SuiteRun>) -> E2eResult<PipelineReport> {
        let aggregation = DashboardAggregator::new(self.settings.paths.clone()).run()?;

        let notify = Notifier::new(
            self.settings.sinks.clone(),
            self.settings.paths.latest_path(),
        )
        .notify()
        .await;

        let publish = if self.config.publish {
            match DashboardPublisher::new(&self.settings.paths).publish().await {
                Ok(outcome) => Some(outcome),
                Err(e) => {
                    error!("Publishing failed: {}", e);
                    None
                }
            }
        } else {
            None
        };

        let report = PipelineReport {
            suite,
            recorder: None,
            aggregation,
            notify,
            publish,
        };

        let s = &report.aggregation.snapshot.summary;
        match &report.suite {
            Some(run) if !run.passed => warn!(
                "Run finished with failures: {} passed, {} failed, {} skipped",
                s.passed,
                s.failures(),
                s.skipped
            ),
            _ => info!(
                "✓ Run reported: {} passed, {} failed, {} skipped",
                s.passed,
                s.failures(),
                s.skipped
            ),
        }

        Ok(report)
    }
}
