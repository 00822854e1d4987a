//! Run the suite and everything after it

use std::time::Duration;

use anyhow::Result;
use clap::Args;

use consoleqa_common::Settings;
use consoleqa_e2e::{NotifyOutcome, Pipeline, PipelineConfig, PublishOutcome, RecorderOutcome};

use crate::output::{
    print_error, print_info, print_list, print_success, print_warning, ModuleRow, OutputFormat,
};

#[derive(Args)]
pub struct RunArgs {
    /// Console under test
    #[arg(long, env = "BASE_URL")]
    pub base_url: Option<String>,

    /// Sign-in page of the console
    #[arg(long, env = "LOGIN_URL")]
    pub login_url: Option<String>,

    /// Commit and push the dashboard afterwards
    #[arg(long)]
    pub publish: bool,

    /// Wait up to this many seconds for the console to answer first
    #[arg(long, value_name = "SECS")]
    pub wait_for_target: Option<u64>,

    /// Override the run timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Arguments passed through to `playwright test`
    #[arg(last = true)]
    pub playwright_args: Vec<String>,
}

/// Returns the engine's exit code
pub async fn execute(args: RunArgs, mut settings: Settings, format: OutputFormat) -> Result<i32> {
    if let Some(url) = args.base_url.filter(|u| !u.is_empty()) {
        settings.target.base_url = url;
    }
    if let Some(url) = args.login_url.filter(|u| !u.is_empty()) {
        settings.target.login_url = url;
    }
    if let Some(secs) = args.timeout {
        settings.run.timeout_secs = secs;
    }

    let mut config = PipelineConfig {
        extra_args: args.playwright_args,
        publish: args.publish,
        preflight: None,
    };
    if let Some(secs) = args.wait_for_target {
        config = config.with_preflight(Duration::from_secs(secs));
    }

    let report = Pipeline::new(settings, config).run().await?;

    match &report.recorder {
        Some(RecorderOutcome::Pushed(n)) => {
            print_success(&format!("{} result(s) pushed to the sheet", n))
        }
        Some(RecorderOutcome::Printed(n)) => print_info(&format!("{} result(s) printed", n)),
        None => {}
    }
    print_list(&ModuleRow::from_snapshot(&report.aggregation.snapshot), format);
    match &report.notify {
        NotifyOutcome::Sent => print_success("Email report sent"),
        NotifyOutcome::Skipped(why) => print_info(&format!("Email skipped: {}", why)),
        NotifyOutcome::Failed(e) => print_warning(&format!("Email failed: {}", e)),
    }
    match &report.publish {
        Some(PublishOutcome::Committed { pushed: true }) => print_success("Dashboard published"),
        Some(PublishOutcome::Committed { pushed: false }) => {
            print_warning("Dashboard committed but not pushed")
        }
        Some(PublishOutcome::NothingToCommit) => print_info("No dashboard changes to commit"),
        None => {}
    }

    let code = report.exit_code();
    if code != 0 {
        print_error(&format!("Suite finished with failures (exit code {})", code));
    }
    Ok(code)
}
