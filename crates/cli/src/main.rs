//! ConsoleQA CLI - Main Entry Point
//!
//! Runs the console's Playwright suite and turns its results into the
//! QA spreadsheet, dashboard data, email report and published dashboard.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use consoleqa_common::config::DEFAULT_CONFIG_FILE;
use consoleqa_common::Settings;

mod commands;
mod output;

use commands::{aggregate, dispatch, notify, publish, record, run};

/// ConsoleQA - E2E reporting for the speech platform console
#[derive(Parser)]
#[command(name = "consoleqa")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Settings file
    #[arg(long, env = "CONSOLEQA_CONFIG", default_value = DEFAULT_CONFIG_FILE, global = true)]
    config: PathBuf,

    /// Directory the artifact paths are relative to
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: output::OutputFormat,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the suite, then aggregate, notify and optionally publish
    Run(run::RunArgs),

    /// Record test-end events into the spreadsheet
    Record(record::RecordArgs),

    /// Regenerate dashboard data from the last report
    Aggregate,

    /// Email the latest run summary
    Notify,

    /// Commit and push dashboard artifacts
    Publish,

    /// Trigger the scheduled workflow remotely
    Dispatch(dispatch::DispatchArgs),

    /// Show the effective settings
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .init();

    let mut settings = Settings::load(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    settings.apply_env();
    if let Some(root) = cli.root {
        settings.paths.root = root;
    }

    match cli.command {
        Commands::Run(args) => {
            let code = run::execute(args, settings, cli.format).await?;
            if code != 0 {
                std::process::exit(code);
            }
        }
        Commands::Record(args) => record::execute(args, settings).await?,
        Commands::Aggregate => aggregate::execute(settings, cli.format).await?,
        Commands::Notify => notify::execute(settings).await?,
        Commands::Publish => publish::execute(settings).await?,
        Commands::Dispatch(args) => dispatch::execute(args, settings).await?,
        Commands::Config => {
            let mut shown = settings;
            if shown.target.password.is_some() {
                shown.target.password = Some("********".to_string());
            }
            if shown.publish.token.is_some() {
                shown.publish.token = Some("********".to_string());
            }
            println!("{}", toml::to_string_pretty(&shown)?);
        }
    }

    Ok(())
}
