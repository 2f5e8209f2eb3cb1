//! featlab CLI: build feature matrices and inspect their configuration.
//!
//! Commands:
//! - `build`: load the input tables named in a run file, assemble, audit, export
//! - `catalog`: list the output columns a configuration produces
//! - `check-config`: validate a run file without reading any data

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

use featlab_core::financial::FINANCIAL_COLUMNS;
use featlab_core::{FeatureSchema, PipelineConfig};
use featlab_runner::{run_pipeline, RunConfig, RunResult};

#[derive(Parser)]
#[command(
    name = "featlab",
    about = "featlab: point-in-time feature matrices for daily stock prediction"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the feature matrix described by a run file.
    Build {
        /// Path to a TOML run file.
        #[arg(long)]
        config: PathBuf,

        /// Override the train/test cutoff (YYYY-MM-DD).
        #[arg(long)]
        cutoff: Option<String>,

        /// Override the output path (.csv or .parquet).
        #[arg(long)]
        output: Option<PathBuf>,

        /// Worker threads for assembly. 0 uses every core.
        #[arg(long)]
        threads: Option<usize>,
    },
    /// List the output columns in order.
    Catalog {
        /// Run file whose pipeline section shapes the columns. Defaults apply without one.
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Validate a run file and print its pipeline hash.
    CheckConfig {
        /// Path to a TOML run file.
        #[arg(long)]
        config: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Build {
            config,
            cutoff,
            output,
            threads,
        } => run_build(config, cutoff, output, threads),
        Commands::Catalog { config } => run_catalog(config),
        Commands::CheckConfig { config } => run_check_config(config),
    }
}

fn load_run_config(path: &Path) -> Result<RunConfig> {
    RunConfig::from_file(path).with_context(|| format!("invalid run file {}", path.display()))
}

fn run_build(
    config_path: PathBuf,
    cutoff: Option<String>,
    output: Option<PathBuf>,
    threads: Option<usize>,
) -> Result<()> {
    let config = load_run_config(&config_path)?;
    let config = apply_overrides(config, cutoff, output, threads)?;

    let result = run_pipeline(&config)?;
    info!(
        output = %result.manifest.output.display(),
        manifest = ?result.manifest_path,
        "build finished"
    );
    print_summary(&result);
    Ok(())
}

/// Command-line values win over the run file.
fn apply_overrides(
    mut config: RunConfig,
    cutoff: Option<String>,
    output: Option<PathBuf>,
    threads: Option<usize>,
) -> Result<RunConfig> {
    if let Some(cutoff) = cutoff {
        let date = NaiveDate::parse_from_str(&cutoff, "%Y-%m-%d")
            .with_context(|| format!("--cutoff '{cutoff}' is not YYYY-MM-DD"))?;
        info!(%date, "cutoff override");
        config = config.with_cutoff(date);
    }
    if let Some(output) = output {
        info!(path = %output.display(), "output override");
        config = config.with_output(output);
    }
    if let Some(threads) = threads {
        info!(threads, "thread count override");
        config = config.with_threads(threads);
    }
    Ok(config)
}

fn print_summary(result: &RunResult) {
    let m = &result.manifest;
    println!();
    println!("=== Feature Matrix ===");
    println!("Columns:       {}", m.columns.len());
    println!("Symbols:       {}", m.stats.symbols);
    println!(
        "Rows:          {} ({} train / {} test, cutoff {})",
        m.stats.rows, m.stats.train_rows, m.stats.test_rows, m.cutoff_date
    );
    println!("Null targets:  {}", m.stats.null_targets);
    println!("Feature dates: {}", m.stats.feature_dates);
    println!();
    println!("--- Inputs ---");
    for (table, counts) in &m.ingest.sources {
        println!(
            "{:<20} {:>9} read {:>9} accepted {:>7} rejected",
            table, counts.read, counts.accepted, counts.rejected
        );
    }
    println!("Duplicate bars collapsed:   {}", m.stats.duplicates_collapsed);
    println!("Statements never released:  {}", m.stats.excluded_statements);
    println!("Unlisted economic points:   {}", m.stats.ignored_economic_points);
    println!();
    println!("Config hash:   {}", &m.config_hash[..16]);
    println!("Snapshot hash: {}", &m.snapshot_hash[..16]);
}

fn run_catalog(config_path: Option<PathBuf>) -> Result<()> {
    let pipeline = match config_path {
        Some(path) => load_run_config(&path)?.pipeline,
        None => PipelineConfig::default(),
    };
    let schema = FeatureSchema::from_config(&pipeline);

    println!("{:<16} {:<36}", "Series", "Column");
    println!("{}", "-".repeat(50));
    for s in &pipeline.economic_series {
        println!("{:<16} {:<36}", s.series_id, s.column);
    }
    println!();
    println!("{:<4} {:<36} {:<8}", "#", "Column", "Type");
    println!("{}", "-".repeat(50));
    for (i, col) in schema.columns().iter().enumerate() {
        println!("{:<4} {:<36} {:<8}", i, col.name, format!("{:?}", col.dtype));
    }
    println!();
    println!(
        "{} columns: {} financial, {} economic, {} sentiment sources",
        schema.len(),
        FINANCIAL_COLUMNS.len(),
        pipeline.economic_series.len(),
        pipeline.sentiment_sources.len()
    );
    Ok(())
}

fn run_check_config(config_path: PathBuf) -> Result<()> {
    let config = load_run_config(&config_path)?;
    let hash = config.pipeline.config_hash()?;
    let schema = FeatureSchema::from_config(&config.pipeline);

    println!("{} is valid", config_path.display());
    println!("Output:      {} ({:?})", config.output.path.display(), config.output_format()?);
    println!("Columns:     {}", schema.len());
    println!("Cutoff:      {}", config.pipeline.cutoff_date);
    println!("Config hash: {hash}");
    Ok(())
}
