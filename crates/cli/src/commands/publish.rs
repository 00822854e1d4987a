//! Commit and push dashboard artifacts

use anyhow::Result;

use consoleqa_common::Settings;
use consoleqa_e2e::{DashboardPublisher, PublishOutcome};

use crate::output::{print_info, print_success, print_warning};

pub async fn execute(settings: Settings) -> Result<()> {
    match DashboardPublisher::new(&settings.paths).publish().await? {
        PublishOutcome::Committed { pushed: true } => print_success("Dashboard published"),
        PublishOutcome::Committed { pushed: false } => {
            print_warning("Dashboard committed but not pushed")
        }
        PublishOutcome::NothingToCommit => print_info("No dashboard changes to commit"),
    }
    Ok(())
}
