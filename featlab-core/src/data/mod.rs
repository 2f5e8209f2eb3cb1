//! Source-table ingestion: Parquet/CSV in, typed domain records out.
//!
//! Table-level problems (unreadable file, missing column, wrong column type)
//! are errors. Row-level problems (null key, unknown label) reject the row and
//! are counted in the [`IngestReport`].

pub mod frame;
pub mod ingest;
pub mod snapshot;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

pub use ingest::{
    read_earnings, read_economic, read_prices, read_sentiment, read_statements, Ingested,
};
pub use snapshot::{SourcePaths, SourceSnapshot};

#[derive(Debug, Error)]
pub enum DataError {
    #[error("failed to open {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("unsupported file type for {0} (expected .csv or .parquet)")]
    UnsupportedFormat(String),

    #[error("failed to read {path}: {reason}")]
    Read { path: String, reason: String },

    #[error("{table}: missing required column '{column}'")]
    MissingColumn { table: String, column: String },

    #[error("{table}: column '{column}' has unsupported type {dtype}")]
    ColumnType {
        table: String,
        column: String,
        dtype: String,
    },

    #[error("no input configured for sentiment source '{0}'")]
    MissingSentimentSource(String),
}

/// Row counts for one source table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceCounts {
    pub read: usize,
    pub accepted: usize,
    pub rejected: usize,
}

impl SourceCounts {
    pub fn accept(&mut self) {
        self.read += 1;
        self.accepted += 1;
    }

    pub fn reject(&mut self) {
        self.read += 1;
        self.rejected += 1;
    }
}

/// Per-source ingestion counts, keyed by table name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestReport {
    pub sources: BTreeMap<String, SourceCounts>,
}

impl IngestReport {
    pub fn record(&mut self, table: impl Into<String>, counts: SourceCounts) {
        self.sources.insert(table.into(), counts);
    }

    pub fn total_rejected(&self) -> usize {
        self.sources.values().map(|c| c.rejected).sum()
    }

    pub fn rejected(&self) -> BTreeMap<String, usize> {
        self.sources
            .iter()
            .map(|(k, c)| (k.clone(), c.rejected))
            .collect()
    }
}
