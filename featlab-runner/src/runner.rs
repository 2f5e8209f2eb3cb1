//! Pipeline runner: load, assemble, audit, export.
//!
//! Two entry points:
//! - `build_matrix()`: loads the snapshot and assembles in memory. Used by tests
//!   and by callers that want the rows rather than a file.
//! - `run_pipeline()`: `build_matrix()` plus audit, export and manifest. Used by the CLI.

use std::path::PathBuf;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use featlab_core::audit::{audit_matrix, AuditError};
use featlab_core::data::{DataError, IngestReport, SourceSnapshot};
use featlab_core::{build_feature_matrix, AssemblyStats, FeatureMatrix, FEATURE_SCHEMA_VERSION};

use crate::config::{ConfigError, RunConfig};
use crate::export::{write_manifest, write_matrix, ExportError};

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] DataError),
    #[error("audit failed: {0}")]
    Audit(#[from] AuditError),
    #[error("export error: {0}")]
    Export(#[from] ExportError),
    #[error("pipeline config error: {0}")]
    Pipeline(#[from] featlab_core::ConfigError),
    #[error("failed to start worker pool: {0}")]
    ThreadPool(String),
}

/// Current schema version for the run manifest.
pub const SCHEMA_VERSION: u32 = 1;

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Everything needed to reproduce and sanity-check one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub feature_schema_version: u32,
    pub columns: Vec<String>,
    pub config_hash: String,
    pub snapshot_hash: String,
    pub cutoff_date: NaiveDate,
    pub stats: AssemblyStats,
    pub ingest: IngestReport,
    pub output: PathBuf,
    pub generated_at: DateTime<Utc>,
}

impl RunManifest {
    pub fn rejected_rows(&self) -> usize {
        self.ingest.total_rejected()
    }
}

/// An assembled matrix plus the metadata needed for its manifest.
#[derive(Debug, Clone)]
pub struct BuiltMatrix {
    pub matrix: FeatureMatrix,
    pub ingest: IngestReport,
    pub snapshot_hash: String,
}

#[derive(Debug, Clone)]
pub struct RunResult {
    pub manifest: RunManifest,
    pub manifest_path: Option<PathBuf>,
}

/// Load the snapshot and assemble it on a pool of `config.threads` workers.
pub fn build_matrix(config: &RunConfig) -> Result<BuiltMatrix, RunError> {
    config.validate()?;
    let (snapshot, ingest) = SourceSnapshot::load(&config.inputs, &config.pipeline)?;
    let snapshot_hash = snapshot.content_hash();
    info!(
        prices = snapshot.prices.len(),
        statements = snapshot.statements.len(),
        earnings = snapshot.earnings.len(),
        economic = snapshot.economic.len(),
        hash = %&snapshot_hash[..12],
        "snapshot loaded"
    );

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.threads)
        .thread_name(|i| format!("featlab-worker-{i}"))
        .build()
        .map_err(|e| RunError::ThreadPool(e.to_string()))?;
    let pipeline = &config.pipeline;
    let matrix = pool.install(|| build_feature_matrix(snapshot, pipeline));

    info!(
        rows = matrix.stats.rows,
        symbols = matrix.stats.symbols,
        train = matrix.stats.train_rows,
        test = matrix.stats.test_rows,
        "feature matrix assembled"
    );
    if matrix.stats.null_targets > 0 {
        warn!(rows = matrix.stats.null_targets, "rows with null target");
    }

    Ok(BuiltMatrix {
        matrix,
        ingest,
        snapshot_hash,
    })
}

/// Build, audit and export the matrix, then write the manifest.
///
/// Nothing is written when the audit fails.
pub fn run_pipeline(config: &RunConfig) -> Result<RunResult, RunError> {
    let format = config.output_format()?;
    let built = build_matrix(config)?;
    audit_matrix(&built.matrix)?;

    write_matrix(&built.matrix, &config.output.path, format)?;

    let manifest = RunManifest {
        schema_version: SCHEMA_VERSION,
        feature_schema_version: FEATURE_SCHEMA_VERSION,
        columns: built.matrix.schema.names().map(str::to_string).collect(),
        config_hash: config.pipeline.config_hash()?,
        snapshot_hash: built.snapshot_hash,
        cutoff_date: config.pipeline.cutoff_date,
        stats: built.matrix.stats.clone(),
        ingest: built.ingest,
        output: config.output.path.clone(),
        generated_at: Utc::now(),
    };

    let manifest_path = if config.output.manifest {
        let path = config.manifest_path();
        write_manifest(&manifest, &path)?;
        Some(path)
    } else {
        None
    };

    Ok(RunResult {
        manifest,
        manifest_path,
    })
}
