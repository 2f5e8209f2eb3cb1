//! Per-source readers. Each turns a DataFrame into domain records and
//! counts the rows it had to reject.

use polars::prelude::DataFrame;
use std::collections::BTreeMap;

use super::frame::Table;
use super::{DataError, SourceCounts};
use crate::domain::{
    EarningsReleaseEvent, EconomicSeriesPoint, FiscalStatement, NewsSentimentRecord,
    PriceObservation, SentimentLabel, StatementType,
};

/// Records read from one table plus their row counts.
#[derive(Debug, Clone)]
pub struct Ingested<T> {
    pub records: Vec<T>,
    pub counts: SourceCounts,
}

/// `symbol, trade_date, open, high, low, close, volume, vwap?, trade_count?`
///
/// Rows without a symbol or a usable trade date are rejected, including a
/// date with no previous calendar day. A `trade_count` that is negative,
/// non-finite or not a whole number is read as null rather than rounded.
pub fn read_prices(df: &DataFrame) -> Result<Ingested<PriceObservation>, DataError> {
    let t = Table::new("prices", df);
    let symbols = t.strings("symbol")?;
    let dates = t.dates("trade_date")?;
    let open = t.floats("open")?;
    let high = t.floats("high")?;
    let low = t.floats("low")?;
    let close = t.floats("close")?;
    let volume = t.floats("volume")?;
    let vwap = t.optional_floats("vwap")?;
    let trade_count = t.optional_floats("trade_count")?;

    let mut counts = SourceCounts::default();
    let mut records = Vec::with_capacity(t.height());
    for i in 0..t.height() {
        let (Some(symbol), Some(trade_date)) = (symbols[i].clone(), dates[i]) else {
            counts.reject();
            continue;
        };
        if trade_date.pred_opt().is_none() {
            counts.reject();
            continue;
        }
        counts.accept();
        records.push(PriceObservation {
            symbol,
            trade_date,
            open: open[i].unwrap_or(f64::NAN),
            high: high[i].unwrap_or(f64::NAN),
            low: low[i].unwrap_or(f64::NAN),
            close: close[i].unwrap_or(f64::NAN),
            volume: volume[i].unwrap_or(f64::NAN),
            vwap: vwap[i],
            trade_count: trade_count[i].and_then(whole_count),
        });
    }
    Ok(Ingested { records, counts })
}

fn whole_count(n: f64) -> Option<u64> {
    (n.is_finite() && n >= 0.0 && n.fract() == 0.0 && n <= u64::MAX as f64).then_some(n as u64)
}

/// Long format: `symbol, fiscal_period_end, statement_type, metric, value`.
///
/// Rows are grouped into one statement per (symbol, period end, type). A
/// repeated metric within a statement keeps its last value. A null value
/// leaves the metric absent but still counts toward the statement.
pub fn read_statements(df: &DataFrame) -> Result<Ingested<FiscalStatement>, DataError> {
    let t = Table::new("statements", df);
    let symbols = t.strings("symbol")?;
    let period_ends = t.dates("fiscal_period_end")?;
    let types = t.strings("statement_type")?;
    let metrics = t.strings("metric")?;
    let values = t.floats("value")?;

    let mut counts = SourceCounts::default();
    let mut grouped: BTreeMap<(String, chrono::NaiveDate, StatementType), BTreeMap<String, f64>> =
        BTreeMap::new();
    for i in 0..t.height() {
        let (Some(symbol), Some(period_end), Some(ty), Some(metric)) = (
            symbols[i].clone(),
            period_ends[i],
            types[i].as_deref().and_then(|s| s.parse::<StatementType>().ok()),
            metrics[i].clone(),
        ) else {
            counts.reject();
            continue;
        };
        counts.accept();
        let entry = grouped.entry((symbol, period_end, ty)).or_default();
        if let Some(v) = values[i] {
            entry.insert(metric, v);
        }
    }

    let records = grouped
        .into_iter()
        .map(
            |((symbol, fiscal_period_end, statement_type), metric_values)| FiscalStatement {
                symbol,
                fiscal_period_end,
                statement_type,
                metric_values,
            },
        )
        .collect();
    Ok(Ingested { records, counts })
}

/// `symbol, release_date, eps_estimate?, reported_eps?, surprise_pct?`
pub fn read_earnings(df: &DataFrame) -> Result<Ingested<EarningsReleaseEvent>, DataError> {
    let t = Table::new("earnings", df);
    let symbols = t.strings("symbol")?;
    let dates = t.dates("release_date")?;
    let estimate = t.optional_floats("eps_estimate")?;
    let reported = t.optional_floats("reported_eps")?;
    let surprise = t.optional_floats("surprise_pct")?;

    let mut counts = SourceCounts::default();
    let mut records = Vec::with_capacity(t.height());
    for i in 0..t.height() {
        let (Some(symbol), Some(release_date)) = (symbols[i].clone(), dates[i]) else {
            counts.reject();
            continue;
        };
        counts.accept();
        records.push(EarningsReleaseEvent {
            symbol,
            release_date,
            eps_estimate: estimate[i],
            reported_eps: reported[i],
            surprise_pct: surprise[i],
        });
    }
    Ok(Ingested { records, counts })
}

/// `series_id, realtime_start, value, observation_date?`
pub fn read_economic(df: &DataFrame) -> Result<Ingested<EconomicSeriesPoint>, DataError> {
    let t = Table::new("economic", df);
    let ids = t.strings("series_id")?;
    let knowledge = t.dates("realtime_start")?;
    let values = t.floats("value")?;
    let observed = t.optional_dates("observation_date")?;

    let mut counts = SourceCounts::default();
    let mut records = Vec::with_capacity(t.height());
    for i in 0..t.height() {
        let (Some(series_id), Some(knowledge_date)) = (ids[i].clone(), knowledge[i]) else {
            counts.reject();
            continue;
        };
        counts.accept();
        records.push(EconomicSeriesPoint {
            series_id,
            observation_date: observed[i],
            knowledge_date,
            value: values[i].filter(|v| v.is_finite()),
        });
    }
    Ok(Ingested { records, counts })
}

/// `symbol, news_date, sentiment_label, confidence` for one classifier.
///
/// Rows without a finite confidence are rejected: they cannot enter the mean.
pub fn read_sentiment(df: &DataFrame) -> Result<Ingested<NewsSentimentRecord>, DataError> {
    let t = Table::new("sentiment", df);
    let symbols = t.strings("symbol")?;
    let dates = t.dates("news_date")?;
    let labels = t.strings("sentiment_label")?;
    let confidence = t.floats("confidence")?;

    let mut counts = SourceCounts::default();
    let mut records = Vec::with_capacity(t.height());
    for i in 0..t.height() {
        let (Some(symbol), Some(news_date), Some(sentiment_label), Some(confidence)) = (
            symbols[i].clone(),
            dates[i],
            labels[i].as_deref().and_then(|s| s.parse::<SentimentLabel>().ok()),
            confidence[i].filter(|c| c.is_finite()),
        ) else {
            counts.reject();
            continue;
        };
        counts.accept();
        records.push(NewsSentimentRecord {
            symbol,
            news_date,
            sentiment_label,
            confidence,
        });
    }
    Ok(Ingested { records, counts })
}
