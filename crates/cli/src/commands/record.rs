//! Record test-end events into the spreadsheet

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tokio::io::BufReader;
use tracing::info;

use consoleqa_common::Settings;
use consoleqa_e2e::recorder::{RecorderOutcome, RunRecorder, SheetSink};

use crate::output::{print_info, print_success};

#[derive(Args)]
pub struct RecordArgs {
    /// JSON-lines file of test-end events; reads stdin when omitted or `-`
    #[arg(long)]
    pub events: Option<PathBuf>,
}

pub async fn execute(args: RecordArgs, settings: Settings) -> Result<()> {
    let sink = match &settings.sinks.sheet_url {
        Some(url) => Some(SheetSink::new(url.clone(), settings.sinks.timeout())?),
        None => None,
    };
    let mut recorder = RunRecorder::new(sink);

    let seen = match args.events.as_deref().filter(|p| p.as_os_str() != "-") {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("cannot open {}", path.display()))?;
            recorder.consume_lines(BufReader::new(file)).await?
        }
        None => {
            info!("Reading test events from stdin");
            recorder.consume_lines(BufReader::new(tokio::io::stdin())).await?
        }
    };
    info!("Read {} event(s)", seen);

    match recorder.finish().await {
        RecorderOutcome::Pushed(n) => print_success(&format!("{} result(s) pushed to the sheet", n)),
        RecorderOutcome::Printed(n) => print_info(&format!("{} result(s) printed", n)),
    }
    Ok(())
}
