//! ConsoleQA reporting pipeline
//!
//! This crate turns the output of the console's Playwright suite into the
//! artifacts people actually look at:
//! - Records each test as it finishes into the QA spreadsheet
//! - Flattens the engine's JSON report into one outcome per test
//! - Writes the dashboard snapshot, the bounded run history and CSV exports
//! - Emails an HTML summary through the mail relay
//! - Commits the dashboard and triggers the remote scheduler
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Pipeline                                                   │
//! │    ├── SuiteLauncher::run()  -> SuiteRun (verdict)          │
//! │    │     └── npx playwright test ──┬── test-events.jsonl    │
//! │    │                               │     └── RunRecorder    │
//! │    │                               │         (followed live)│
//! │    │                               └── report JSON          │
//! │    ├── RunRecorder::finish()  -> sheet or console table     │
//! │    ├── DashboardAggregator::run()                           │
//! │    │     ├── PlaywrightReport::extract() -> [TestOutcome]   │
//! │    │     ├── latest.json                                    │
//! │    │     ├── history/runs.json (newest first, capped)       │
//! │    │     └── current-run.csv, all-runs-summary.csv          │
//! │    ├── Notifier::notify()     -> mail relay                 │
//! │    └── DashboardPublisher     -> git commit + push          │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod aggregator;
pub mod error;
pub mod export;
pub mod extractor;
pub mod history;
pub mod notifier;
pub mod playwright;
pub mod publish;
pub mod recorder;
pub mod runner;

pub use aggregator::{AggregationOutput, DashboardAggregator};
pub use error::{E2eError, E2eResult};
pub use extractor::PlaywrightReport;
pub use history::RunHistory;
pub use notifier::{Notifier, NotifyOutcome};
pub use playwright::{ReportTargets, SuiteLauncher, SuiteRun};
pub use publish::{DashboardPublisher, PublishOutcome, SchedulerTrigger};
pub use recorder::{RecorderOutcome, RunRecorder, SheetSink};
pub use runner::{Pipeline, PipelineConfig, PipelineReport};
