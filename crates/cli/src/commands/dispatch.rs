//! Trigger the scheduled workflow remotely

use anyhow::{Context, Result};
use clap::Args;

use consoleqa_common::Settings;
use consoleqa_e2e::SchedulerTrigger;

use crate::output::print_success;

#[derive(Args)]
pub struct DispatchArgs {
    /// Event type to send instead of the configured one
    #[arg(long)]
    pub event_type: Option<String>,
}

pub async fn execute(args: DispatchArgs, mut settings: Settings) -> Result<()> {
    if let Some(event_type) = args.event_type {
        settings.publish.event_type = event_type;
    }

    let trigger = SchedulerTrigger::from_config(&settings.publish)
        .context("GITHUB_OWNER, GITHUB_REPO and GITHUB_PAT must be set")?;
    trigger.dispatch().await?;
    print_success(&format!("Workflow triggered via {}", trigger.endpoint()));
    Ok(())
}
