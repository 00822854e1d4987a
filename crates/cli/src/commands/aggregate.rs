//! Regenerate dashboard data from the last report

use anyhow::Result;

use consoleqa_common::Settings;
use consoleqa_e2e::DashboardAggregator;

use crate::output::{print_list, print_success, ModuleRow, OutputFormat};

pub async fn execute(settings: Settings, format: OutputFormat) -> Result<()> {
    let output = DashboardAggregator::new(settings.paths).run()?;

    print_list(&ModuleRow::from_snapshot(&output.snapshot), format);
    print_success(&format!(
        "Dashboard data generated ({} run(s) in history)",
        output.history_len
    ));
    Ok(())
}
