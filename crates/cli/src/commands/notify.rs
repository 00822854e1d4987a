//! Email the latest snapshot

use anyhow::Result;

use consoleqa_common::Settings;
use consoleqa_e2e::{Notifier, NotifyOutcome};

use crate::output::{print_info, print_success, print_warning};

pub async fn execute(settings: Settings) -> Result<()> {
    let notifier = Notifier::new(settings.sinks.clone(), settings.paths.latest_path());
    match notifier.notify().await {
        NotifyOutcome::Sent => print_success("Email report sent"),
        NotifyOutcome::Skipped(why) => print_info(&format!("Email skipped: {}", why)),
        NotifyOutcome::Failed(e) => print_warning(&format!("Email failed: {}", e)),
    }
    Ok(())
}
