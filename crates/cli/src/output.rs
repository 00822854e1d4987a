//! Output formatting for CLI

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

use consoleqa_common::types::pass_rate;
use consoleqa_common::RunSnapshot;

/// Output format
#[derive(Debug, Clone, Copy, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable table format
    #[default]
    Table,
    /// JSON format
    Json,
    /// YAML format
    Yaml,
    /// Plain text format
    Plain,
}

/// Trait for items that can be displayed in a table
pub trait TableDisplay {
    fn headers() -> Vec<&'static str>;
    fn row(&self) -> Vec<String>;
}

/// Per-module line of a run summary
#[derive(Debug, Clone, Serialize)]
pub struct ModuleRow {
    pub module: String,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub pass_rate: u32,
}

impl ModuleRow {
    /// Rows for every module, followed by the run total
    pub fn from_snapshot(snapshot: &RunSnapshot) -> Vec<Self> {
        let mut rows: Vec<Self> = snapshot
            .modules
            .values()
            .map(|m| Self {
                module: m.label.clone(),
                total: m.counts.total,
                passed: m.counts.passed,
                failed: m.counts.failures(),
                skipped: m.counts.skipped,
                pass_rate: pass_rate(m.counts.passed, m.counts.total),
            })
            .collect();

        let s = &snapshot.summary;
        rows.push(Self {
            module: "Total".to_string(),
            total: s.total,
            passed: s.passed,
            failed: s.failures(),
            skipped: s.skipped,
            pass_rate: snapshot.pass_rate,
        });
        rows
    }
}

impl TableDisplay for ModuleRow {
    fn headers() -> Vec<&'static str> {
        vec!["Module", "Total", "Passed", "Failed", "Skipped", "Pass Rate"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.module.clone(),
            self.total.to_string(),
            self.passed.to_string(),
            self.failed.to_string(),
            self.skipped.to_string(),
            format!("{}%", self.pass_rate),
        ]
    }
}

/// Print a list of items
pub fn print_list<T: Serialize + TableDisplay>(items: &[T], format: OutputFormat) {
    if items.is_empty() {
        println!("No items found.");
        return;
    }

    match format {
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic);

            table.set_header(T::headers());
            for item in items {
                table.add_row(item.row());
            }

            println!("{table}");
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(items).unwrap_or_default());
        }
        OutputFormat::Yaml => {
            println!("{}", serde_yaml::to_string(items).unwrap_or_default());
        }
        OutputFormat::Plain => {
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    println!("---");
                }
                let row = item.row();
                for (header, value) in T::headers().iter().zip(row.iter()) {
                    println!("{}: {}", header, value);
                }
            }
        }
    }
}

/// Print success message
pub fn print_success(message: &str) {
    println!("✅ {}", message);
}

/// Print error message
pub fn print_error(message: &str) {
    eprintln!("❌ {}", message);
}

/// Print warning message
pub fn print_warning(message: &str) {
    println!("⚠️  {}", message);
}

/// Print info message
pub fn print_info(message: &str) {
    println!("ℹ️  {}", message);
}
