//! FeatureRow: one output row per (symbol, prediction_date).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::price::PriceObservation;
use super::StatementType;
use crate::daily_sentiment::DailySentiment;
use crate::split::SplitLabel;

/// Price features taken from the latest bar known as of the feature date.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StockFeatures {
    pub prev_open: Option<f64>,
    pub prev_high: Option<f64>,
    pub prev_low: Option<f64>,
    pub prev_close: Option<f64>,
    pub prev_volume: Option<f64>,
    pub prev_vwap: Option<f64>,
    pub prev_trade_count: Option<u64>,
    pub prev_daily_change: Option<f64>,
    pub days_since_prev_bar: Option<i64>,
}

impl StockFeatures {
    pub fn from_bar(bar: Option<&PriceObservation>, feature_date: NaiveDate) -> Self {
        let Some(bar) = bar else {
            return Self::default();
        };
        Self {
            prev_open: finite(bar.open),
            prev_high: finite(bar.high),
            prev_low: finite(bar.low),
            prev_close: finite(bar.close),
            prev_volume: finite(bar.volume),
            prev_vwap: bar.vwap.and_then(finite),
            prev_trade_count: bar.trade_count,
            prev_daily_change: bar.percent_daily_price_change(),
            days_since_prev_bar: Some((feature_date - bar.trade_date).num_days()),
        }
    }
}

fn finite(v: f64) -> Option<f64> {
    v.is_finite().then_some(v)
}

/// Knowledge dates of every fact that fed a row.
///
/// Only facts that were actually selected appear; an absent lookup leaves
/// its slot `None`. Used by the leakage audit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    pub price: Option<NaiveDate>,
    pub statements: [Option<NaiveDate>; 3],
    pub earnings: Option<NaiveDate>,
    /// Latest knowledge date among the economic vintages used.
    pub economic: Option<NaiveDate>,
    /// Sentiment day per configured source.
    pub sentiment: Vec<Option<NaiveDate>>,
}

impl Provenance {
    pub fn statement(&self, statement_type: StatementType) -> Option<NaiveDate> {
        self.statements[statement_type.index()]
    }

    /// All recorded knowledge dates with a short label for diagnostics.
    pub fn known_dates(&self) -> Vec<(String, NaiveDate)> {
        let mut out = Vec::new();
        if let Some(d) = self.price {
            out.push(("price".to_string(), d));
        }
        for st in StatementType::ALL {
            if let Some(d) = self.statement(st) {
                out.push((format!("{st}_statement"), d));
            }
        }
        if let Some(d) = self.earnings {
            out.push(("earnings".to_string(), d));
        }
        if let Some(d) = self.economic {
            out.push(("economic".to_string(), d));
        }
        for (i, d) in self.sentiment.iter().enumerate() {
            if let Some(d) = d {
                out.push((format!("sentiment[{i}]"), *d));
            }
        }
        out
    }
}

/// A fully assembled training row.
///
/// `financial` and `economic` are positional: they line up with the column
/// lists of the financial catalog and the configured series catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    pub symbol: String,
    pub prediction_date: NaiveDate,
    pub feature_date: NaiveDate,
    pub target: Option<f64>,
    pub stock: StockFeatures,
    pub financial: Vec<Option<f64>>,
    pub economic: Vec<Option<f64>>,
    /// One entry per configured sentiment source; `None` means no news that day.
    pub sentiment: Vec<Option<DailySentiment>>,
    pub split: SplitLabel,
    pub provenance: Provenance,
}

impl FeatureRow {
    pub fn key(&self) -> (&str, NaiveDate) {
        (self.symbol.as_str(), self.prediction_date)
    }
}
