//! Command-line surface: `analyze`, `metrics`, `debt`, `server`.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::report::OutputFormat;

#[derive(Debug, Parser)]
#[command(name = "anteater", version, about = "Static analyzer for a typed OO language")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run style rules over a project.
    Analyze(AnalyzeArgs),
    /// Compute per-function and project metrics.
    Metrics(MetricsArgs),
    /// Quantify technical debt.
    Debt(DebtArgs),
    /// Run as a long-lived analyzer service.
    Server(ServerArgs),
}

#[derive(Debug, Parser)]
pub struct AnalyzeArgs {
    #[arg(short, long, default_value = ".")]
    pub path: PathBuf,
    #[arg(short, long, default_value = "text")]
    pub format: String,
    /// Re-run on file-system change instead of exiting after one pass.
    #[arg(long)]
    pub watch: bool,
    #[arg(long)]
    pub no_fatal_warnings: bool,
    #[arg(long)]
    pub no_fatal_infos: bool,
    #[arg(short, long)]
    pub quiet: bool,
}

#[derive(Debug, Parser)]
pub struct MetricsArgs {
    #[arg(short, long, default_value = ".")]
    pub path: PathBuf,
    #[arg(short, long, default_value = "text")]
    pub format: String,
    #[arg(long)]
    pub threshold_cc: Option<u32>,
    #[arg(long)]
    pub threshold_mi: Option<f64>,
    #[arg(long)]
    pub watch: bool,
}

#[derive(Debug, Parser)]
pub struct DebtArgs {
    #[arg(short, long, default_value = ".")]
    pub path: PathBuf,
    #[arg(short, long, default_value = "text")]
    pub format: String,
    #[arg(long)]
    pub threshold: Option<f64>,
    #[arg(long)]
    pub fail_on_threshold: bool,
}

#[derive(Debug, Parser)]
pub struct ServerArgs {}

impl AnalyzeArgs {
    pub fn output_format(&self) -> Result<OutputFormat, String> {
        self.format.parse()
    }
}

impl MetricsArgs {
    pub fn output_format(&self) -> Result<OutputFormat, String> {
        self.format.parse()
    }
}

impl DebtArgs {
    pub fn output_format(&self) -> Result<OutputFormat, String> {
        self.format.parse()
    }
}
