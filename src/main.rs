//! mlp-sweep
//!
//! Trains one small classifier per point of a hyperparameter grid and
//! writes a comparison report.
//!
//! `mlp-sweep experiment.properties` writes the spreadsheet report to the
//! configured location.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use mlp_sweep::{publish, ExperimentConfig, OutputOptions, Pipeline};

#[derive(Parser)]
#[command(name = "mlp-sweep")]
#[command(about = "Grid search over hidden width, activation and updater")]
#[command(version)]
struct Cli {
    /// Experiment properties file
    config: PathBuf,
    /// Write the spreadsheet here instead of the configured location
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Print every record's statistics to stdout
    #[arg(short, long)]
    print: bool,
    /// Skip the spreadsheet report
    #[arg(long)]
    no_spreadsheet: bool,
    /// Also write the report rows as CSV
    #[arg(long)]
    csv: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let config = ExperimentConfig::load(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    let options = OutputOptions {
        print: cli.print,
        spreadsheet: !cli.no_spreadsheet,
        spreadsheet_path: cli.output,
        csv_path: cli.csv,
    };

    options.check(&config)?;

    let pipeline = Pipeline::new(config);
    let report = pipeline.run()?;
    let written = publish(&report, pipeline.config(), &options)?;
    for path in &written {
        info!(path = %path.display(), "report written");
    }
    Ok(())
}
