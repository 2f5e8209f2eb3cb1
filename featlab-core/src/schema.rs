//! Output schema contract for the feature matrix.
//!
//! Column order is fixed: keys, target, stock features, financial features,
//! economic series (config order), sentiment per source (config order),
//! split, then the optional `*_known_at` provenance columns.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::PipelineConfig;
use crate::domain::{FeatureRow, StatementType};
use crate::financial::FINANCIAL_COLUMNS;

/// Bump when the column set or order changes.
pub const FEATURE_SCHEMA_VERSION: u32 = 1;

pub const KEY_COLUMNS: [&str; 3] = ["symbol", "prediction_date", "feature_date"];
pub const TARGET_COLUMN: &str = "target";
pub const SPLIT_COLUMN: &str = "split";

pub const STOCK_COLUMNS: [&str; 9] = [
    "prev_open",
    "prev_high",
    "prev_low",
    "prev_close",
    "prev_volume",
    "prev_vwap",
    "prev_trade_count",
    "prev_daily_change",
    "days_since_prev_bar",
];

pub const SENTIMENT_SUFFIXES: [&str; 5] = [
    "positive_count",
    "neutral_count",
    "negative_count",
    "total_count",
    "avg_confidence",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SchemaType {
    Utf8,
    Date,
    Float64,
    Int64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    pub dtype: SchemaType,
}

impl ColumnSpec {
    fn new(name: impl Into<String>, dtype: SchemaType) -> Self {
        Self {
            name: name.into(),
            dtype,
        }
    }
}

/// One output value. Nullable kinds carry `Option`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cell<'a> {
    Str(&'a str),
    Date(Option<NaiveDate>),
    Float(Option<f64>),
    Int(Option<i64>),
}

/// The concrete column list for one pipeline configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    columns: Vec<ColumnSpec>,
    sentiment_sources: usize,
    emit_provenance: bool,
}

impl FeatureSchema {
    pub fn from_config(config: &PipelineConfig) -> Self {
        use SchemaType::*;

        let mut columns = vec![
            ColumnSpec::new(KEY_COLUMNS[0], Utf8),
            ColumnSpec::new(KEY_COLUMNS[1], Date),
            ColumnSpec::new(KEY_COLUMNS[2], Date),
            ColumnSpec::new(TARGET_COLUMN, Float64),
        ];
        for name in STOCK_COLUMNS {
            let dtype = match name {
                "prev_trade_count" | "days_since_prev_bar" => Int64,
                _ => Float64,
            };
            columns.push(ColumnSpec::new(name, dtype));
        }
        for c in &FINANCIAL_COLUMNS {
            columns.push(ColumnSpec::new(c.name, Float64));
        }
        for s in &config.economic_series {
            columns.push(ColumnSpec::new(s.column.as_str(), Float64));
        }
        for src in &config.sentiment_sources {
            for suffix in SENTIMENT_SUFFIXES {
                let dtype = if suffix == "avg_confidence" { Float64 } else { Int64 };
                columns.push(ColumnSpec::new(format!("{}_{}", src.prefix, suffix), dtype));
            }
        }
        columns.push(ColumnSpec::new(SPLIT_COLUMN, Utf8));

        if config.emit_provenance {
            columns.push(ColumnSpec::new("price_known_at", Date));
            for st in StatementType::ALL {
                columns.push(ColumnSpec::new(format!("{st}_known_at"), Date));
            }
            columns.push(ColumnSpec::new("earnings_known_at", Date));
            columns.push(ColumnSpec::new("economic_known_at", Date));
            for src in &config.sentiment_sources {
                columns.push(ColumnSpec::new(format!("{}_known_at", src.prefix), Date));
            }
        }

        Self {
            columns,
            sentiment_sources: config.sentiment_sources.len(),
            emit_provenance: config.emit_provenance,
        }
    }

    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Flatten a row into cells, aligned with [`columns`](Self::columns).
    pub fn cells<'a>(&self, row: &'a FeatureRow) -> Vec<Cell<'a>> {
        let mut out = Vec::with_capacity(self.columns.len());
        out.push(Cell::Str(&row.symbol));
        out.push(Cell::Date(Some(row.prediction_date)));
        out.push(Cell::Date(Some(row.feature_date)));
        out.push(Cell::Float(row.target));

        let s = &row.stock;
        out.extend([
            Cell::Float(s.prev_open),
            Cell::Float(s.prev_high),
            Cell::Float(s.prev_low),
            Cell::Float(s.prev_close),
            Cell::Float(s.prev_volume),
            Cell::Float(s.prev_vwap),
            Cell::Int(s.prev_trade_count.and_then(|n| i64::try_from(n).ok())),
            Cell::Float(s.prev_daily_change),
            Cell::Int(s.days_since_prev_bar),
        ]);

        out.extend(row.financial.iter().map(|v| Cell::Float(*v)));
        out.extend(row.economic.iter().map(|v| Cell::Float(*v)));

        for i in 0..self.sentiment_sources {
            match row.sentiment.get(i).and_then(Option::as_ref) {
                Some(d) => out.extend([
                    Cell::Int(Some(i64::from(d.positive_count))),
                    Cell::Int(Some(i64::from(d.neutral_count))),
                    Cell::Int(Some(i64::from(d.negative_count))),
                    Cell::Int(Some(i64::from(d.total_count))),
                    Cell::Float(Some(d.avg_confidence)),
                ]),
                None => out.extend([
                    Cell::Int(None),
                    Cell::Int(None),
                    Cell::Int(None),
                    Cell::Int(None),
                    Cell::Float(None),
                ]),
            }
        }
        out.push(Cell::Str(row.split.as_str()));

        if self.emit_provenance {
            let p = &row.provenance;
            out.push(Cell::Date(p.price));
            out.extend(p.statements.iter().map(|d| Cell::Date(*d)));
            out.push(Cell::Date(p.earnings));
            out.push(Cell::Date(p.economic));
            for i in 0..self.sentiment_sources {
                out.push(Cell::Date(p.sentiment.get(i).copied().flatten()));
            }
        }
        out
    }
}

/// Output column names for `config`, in order.
pub fn output_columns(config: &PipelineConfig) -> Vec<String> {
    FeatureSchema::from_config(config)
        .names()
        .map(str::to_string)
        .collect()
}
