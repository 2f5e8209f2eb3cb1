//! Run-file configuration (TOML).
//!
//! ```toml
//! threads = 4
//!
//! [pipeline]
//! cutoff_date = "2025-10-24"
//!
//! [inputs]
//! prices = "data/prices.parquet"
//! statements = "data/statements.parquet"
//! earnings = "data/earnings.csv"
//! economic = "data/fred.csv"
//!
//! [inputs.sentiment]
//! finbert = "data/news_finbert.parquet"
//! roberta = "data/news_roberta.parquet"
//!
//! [output]
//! path = "out/features.parquet"
//! ```
//!
//! Relative input and output paths resolve against the run file's directory.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use featlab_core::data::SourcePaths;
use featlab_core::PipelineConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read run file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse run file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid pipeline configuration: {0}")]
    Pipeline(#[from] featlab_core::ConfigError),

    #[error("output path {0} must end in .csv or .parquet")]
    OutputFormat(String),

    #[error("sentiment source '{0}' has no input path")]
    MissingSentimentInput(String),
}

/// File format of the feature matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Csv,
    Parquet,
}

impl OutputFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("csv") => Some(Self::Csv),
            Some("parquet") => Some(Self::Parquet),
            _ => None,
        }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    pub path: PathBuf,
    /// Write `manifest.json` next to the output.
    #[serde(default = "default_true")]
    pub manifest: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    #[serde(default)]
    pub pipeline: PipelineConfig,
    pub inputs: SourcePaths,
    pub output: OutputConfig,
    /// Worker threads for assembly; 0 lets rayon decide.
    #[serde(default)]
    pub threads: usize,
}

impl RunConfig {
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a run file; relative paths are taken relative to its directory.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let mut config = Self::from_toml(&text)?;
        if let Some(base) = path.parent() {
            config.inputs = config.inputs.relative_to(base);
            if config.output.path.is_relative() {
                config.output.path = base.join(&config.output.path);
            }
        }
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.pipeline.validate()?;
        self.output_format()?;
        for source in &self.pipeline.sentiment_sources {
            if !self.inputs.sentiment.contains_key(&source.name) {
                return Err(ConfigError::MissingSentimentInput(source.name.clone()));
            }
        }
        Ok(())
    }

    pub fn output_format(&self) -> Result<OutputFormat, ConfigError> {
        OutputFormat::from_path(&self.output.path)
            .ok_or_else(|| ConfigError::OutputFormat(self.output.path.display().to_string()))
    }

    pub fn with_cutoff(mut self, cutoff: NaiveDate) -> Self {
        self.pipeline.cutoff_date = cutoff;
        self
    }

    pub fn with_output(mut self, path: PathBuf) -> Self {
        self.output.path = path;
        self
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// Path of the run manifest, beside the output file.
    pub fn manifest_path(&self) -> PathBuf {
        self.output
            .path
            .parent()
            .map(|p| p.join("manifest.json"))
            .unwrap_or_else(|| PathBuf::from("manifest.json"))
    }
}
