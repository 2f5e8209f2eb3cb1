//! The immutable input snapshot for one run.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{info, warn};

use super::frame::read_frame;
use super::ingest::{
    read_earnings, read_economic, read_prices, read_sentiment, read_statements, Ingested,
};
use super::{DataError, IngestReport, SourceCounts};
use crate::config::PipelineConfig;
use crate::domain::{
    EarningsReleaseEvent, EconomicSeriesPoint, FiscalStatement, NewsSentimentRecord,
    PriceObservation,
};

/// Locations of the five source tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourcePaths {
    pub prices: PathBuf,
    pub statements: PathBuf,
    pub earnings: PathBuf,
    pub economic: PathBuf,
    /// One table per sentiment source, keyed by source name.
    #[serde(default)]
    pub sentiment: BTreeMap<String, PathBuf>,
}

impl SourcePaths {
    /// Resolve relative paths against `base`.
    pub fn relative_to(&self, base: &std::path::Path) -> Self {
        let join = |p: &PathBuf| {
            if p.is_absolute() {
                p.clone()
            } else {
                base.join(p)
            }
        };
        Self {
            prices: join(&self.prices),
            statements: join(&self.statements),
            earnings: join(&self.earnings),
            economic: join(&self.economic),
            sentiment: self
                .sentiment
                .iter()
                .map(|(k, v)| (k.clone(), join(v)))
                .collect(),
        }
    }
}

/// All source records for a run, in snapshot order.
#[derive(Debug, Clone, Default)]
pub struct SourceSnapshot {
    pub prices: Vec<PriceObservation>,
    pub statements: Vec<FiscalStatement>,
    pub earnings: Vec<EarningsReleaseEvent>,
    pub economic: Vec<EconomicSeriesPoint>,
    /// Records per sentiment source name.
    pub sentiment: BTreeMap<String, Vec<NewsSentimentRecord>>,
}

impl SourceSnapshot {
    /// Read every table the configuration needs.
    ///
    /// Each configured sentiment source must have a path.
    pub fn load(
        paths: &SourcePaths,
        config: &PipelineConfig,
    ) -> Result<(Self, IngestReport), DataError> {
        let mut report = IngestReport::default();

        let prices = load_table(&paths.prices, "prices", read_prices, &mut report)?;
        let statements = load_table(&paths.statements, "statements", read_statements, &mut report)?;
        let earnings = load_table(&paths.earnings, "earnings", read_earnings, &mut report)?;
        let economic = load_table(&paths.economic, "economic", read_economic, &mut report)?;

        let mut sentiment = BTreeMap::new();
        for source in &config.sentiment_sources {
            let path = paths
                .sentiment
                .get(&source.name)
                .ok_or_else(|| DataError::MissingSentimentSource(source.name.clone()))?;
            let table = format!("sentiment.{}", source.name);
            let records = load_table(path, &table, read_sentiment, &mut report)?;
            sentiment.insert(source.name.clone(), records);
        }
        for name in paths.sentiment.keys() {
            if !config.sentiment_sources.iter().any(|s| &s.name == name) {
                warn!(source = %name, "sentiment input not in configuration, skipped");
            }
        }

        if report.total_rejected() > 0 {
            warn!(rejected = report.total_rejected(), "source rows rejected at ingestion");
        }

        Ok((
            Self {
                prices,
                statements,
                earnings,
                economic,
                sentiment,
            },
            report,
        ))
    }

    /// BLAKE3 over every record in snapshot order.
    ///
    /// Order is part of the hash: it decides full ties in as-of lookups.
    pub fn content_hash(&self) -> String {
        let mut h = blake3::Hasher::new();
        let opt = |h: &mut blake3::Hasher, v: Option<f64>| match v {
            Some(x) => {
                h.update(&[1]);
                h.update(&x.to_le_bytes());
            }
            None => {
                h.update(&[0]);
            }
        };

        h.update(b"prices");
        for p in &self.prices {
            h.update(p.symbol.as_bytes());
            h.update(p.trade_date.to_string().as_bytes());
            for v in [p.open, p.high, p.low, p.close, p.volume] {
                h.update(&v.to_le_bytes());
            }
            opt(&mut h, p.vwap);
            opt(&mut h, p.trade_count.map(|n| n as f64));
        }

        h.update(b"statements");
        for s in &self.statements {
            h.update(s.symbol.as_bytes());
            h.update(s.fiscal_period_end.to_string().as_bytes());
            h.update(s.statement_type.as_str().as_bytes());
            for (k, v) in &s.metric_values {
                h.update(k.as_bytes());
                h.update(&v.to_le_bytes());
            }
        }

        h.update(b"earnings");
        for e in &self.earnings {
            h.update(e.symbol.as_bytes());
            h.update(e.release_date.to_string().as_bytes());
            opt(&mut h, e.eps_estimate);
            opt(&mut h, e.reported_eps);
            opt(&mut h, e.surprise_pct);
        }

        h.update(b"economic");
        for p in &self.economic {
            h.update(p.series_id.as_bytes());
            h.update(p.knowledge_date.to_string().as_bytes());
            if let Some(d) = p.observation_date {
                h.update(d.to_string().as_bytes());
            }
            opt(&mut h, p.value);
        }

        for (name, records) in &self.sentiment {
            h.update(b"sentiment");
            h.update(name.as_bytes());
            for r in records {
                h.update(r.symbol.as_bytes());
                h.update(r.news_date.to_string().as_bytes());
                h.update(r.sentiment_label.as_str().as_bytes());
                h.update(&r.confidence.to_le_bytes());
            }
        }

        h.finalize().to_hex().to_string()
    }
}

fn load_table<T>(
    path: &std::path::Path,
    table: &str,
    read: fn(&polars::prelude::DataFrame) -> Result<Ingested<T>, DataError>,
    report: &mut IngestReport,
) -> Result<Vec<T>, DataError> {
    let df = read_frame(path)?;
    let Ingested { records, counts } = read(&df)?;
    log_counts(table, &counts);
    report.record(table, counts);
    Ok(records)
}

fn log_counts(table: &str, counts: &SourceCounts) {
    info!(
        table,
        read = counts.read,
        accepted = counts.accepted,
        rejected = counts.rejected,
        "source ingested"
    );
}
