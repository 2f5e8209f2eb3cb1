//! Pipeline configuration: the cutoff, the series catalog, sentiment sources.
//!
//! Supplied once at run start and immutable for the run. `validate` must
//! pass before any data is read.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use crate::pivot::{default_series_catalog, SeriesColumn};
use crate::schema;

/// Default train/test cutoff.
pub const DEFAULT_CUTOFF: (i32, u32, u32) = (2025, 10, 24);

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("economic series #{index} has an empty series id")]
    EmptySeriesId { index: usize },

    #[error("economic series id '{0}' listed more than once")]
    DuplicateSeriesId(String),

    #[error("column name '{0}' is not a valid identifier")]
    InvalidColumnName(String),

    #[error("column name '{0}' is used more than once")]
    DuplicateColumn(String),

    #[error("sentiment source #{index} has an empty name")]
    EmptySourceName { index: usize },

    #[error("sentiment source '{0}' listed more than once")]
    DuplicateSource(String),

    #[error("start_date {start} is after end_date {end}")]
    InvertedRange { start: NaiveDate, end: NaiveDate },
}

/// A sentiment classifier whose daily aggregates become one column group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentimentSource {
    pub name: String,
    /// Column prefix, e.g. `finbert` → `finbert_positive_count`.
    pub prefix: String,
}

impl SentimentSource {
    pub fn new(name: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            prefix: prefix.into(),
        }
    }
}

pub fn default_sentiment_sources() -> Vec<SentimentSource> {
    vec![
        SentimentSource::new("finbert", "finbert"),
        SentimentSource::new("roberta", "roberta"),
    ]
}

fn default_cutoff() -> NaiveDate {
    let (y, m, d) = DEFAULT_CUTOFF;
    NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    /// Last prediction date labeled `train`.
    #[serde(default = "default_cutoff")]
    pub cutoff_date: NaiveDate,

    /// Inclusive bounds on prediction dates.
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,

    /// Restrict output to these symbols. `None` keeps every symbol.
    #[serde(default)]
    pub symbols: Option<Vec<String>>,

    #[serde(default = "default_series_catalog")]
    pub economic_series: Vec<SeriesColumn>,

    #[serde(default = "default_sentiment_sources")]
    pub sentiment_sources: Vec<SentimentSource>,

    /// Append `*_known_at` provenance columns to the output.
    #[serde(default)]
    pub emit_provenance: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            cutoff_date: default_cutoff(),
            start_date: None,
            end_date: None,
            symbols: None,
            economic_series: default_series_catalog(),
            sentiment_sources: default_sentiment_sources(),
            emit_provenance: false,
        }
    }
}

impl PipelineConfig {
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&text)
    }

    /// Reject configurations that would produce an ambiguous output schema.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if start > end {
                return Err(ConfigError::InvertedRange { start, end });
            }
        }

        let mut ids = HashSet::new();
        for (index, s) in self.economic_series.iter().enumerate() {
            if s.series_id.trim().is_empty() {
                return Err(ConfigError::EmptySeriesId { index });
            }
            if !ids.insert(s.series_id.as_str()) {
                return Err(ConfigError::DuplicateSeriesId(s.series_id.clone()));
            }
        }

        let mut names = HashSet::new();
        for (index, s) in self.sentiment_sources.iter().enumerate() {
            if s.name.trim().is_empty() {
                return Err(ConfigError::EmptySourceName { index });
            }
            if !names.insert(s.name.as_str()) {
                return Err(ConfigError::DuplicateSource(s.name.clone()));
            }
            if !is_identifier(&s.prefix) {
                return Err(ConfigError::InvalidColumnName(s.prefix.clone()));
            }
        }

        // Every output column must be unique, fixed ones included.
        let mut columns = HashSet::new();
        for column in schema::output_columns(self) {
            if !is_identifier(&column) {
                return Err(ConfigError::InvalidColumnName(column));
            }
            if !columns.insert(column.clone()) {
                return Err(ConfigError::DuplicateColumn(column));
            }
        }
        Ok(())
    }

    pub fn split_policy(&self) -> crate::split::SplitPolicy {
        crate::split::SplitPolicy::new(self.cutoff_date)
    }

    /// Whether a prediction date falls inside the configured bounds.
    pub fn in_range(&self, prediction_date: NaiveDate) -> bool {
        self.start_date.map_or(true, |s| prediction_date >= s)
            && self.end_date.map_or(true, |e| prediction_date <= e)
    }

    pub fn allows_symbol(&self, symbol: &str) -> bool {
        self.symbols
            .as_ref()
            .map_or(true, |list| list.iter().any(|s| s == symbol))
    }

    /// BLAKE3 of the canonical JSON form.
    pub fn config_hash(&self) -> Result<String, ConfigError> {
        let json = serde_json::to_string(self)?;
        Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
    }
}

/// `[A-Za-z_][A-Za-z0-9_]*`
fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
