//! Feature Assembler.
//!
//! Base price observations drive iteration. For each one:
//! feature date → statements and earnings (as-of) → economic row (shared,
//! per feature date) → sentiment per source (exact day) → split label → row.
//! Every lookup yields `None` on absence; no stage fails a row.
//!
//! Symbols are independent and are assembled in parallel on whatever rayon
//! pool is current. Output order does not depend on the thread count.

use chrono::NaiveDate;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

use crate::asof::{Timeline, VintageIndex};
use crate::config::PipelineConfig;
use crate::daily_sentiment::SentimentIndex;
use crate::data::SourceSnapshot;
use crate::domain::{
    feature_date_for, EarningsReleaseEvent, FeatureRow, PriceObservation, Provenance,
    StatementType, StockFeatures,
};
use crate::financial::FinancialContext;
use crate::pivot::{EconomicPivot, EconomicRow};
use crate::resolver::{FiscalReleaseResolver, ResolvedPool};
use crate::schema::FeatureSchema;
use crate::split::{SplitLabel, SplitPolicy};

/// Indexed, read-only facts for one run.
#[derive(Debug)]
pub struct FactStore {
    /// Price bars per symbol, one per trade date.
    prices: BTreeMap<String, Timeline<PriceObservation>>,
    statements: ResolvedPool,
    earnings: VintageIndex<String, EarningsReleaseEvent>,
    economic: EconomicPivot,
    /// Positional to the configured sentiment sources.
    sentiment: Vec<SentimentIndex>,
    /// Base observations dropped because another bar shared their key.
    pub duplicates_collapsed: usize,
}

impl FactStore {
    /// Index a snapshot. Statement resolution happens here, once.
    pub fn build(snapshot: SourceSnapshot, config: &PipelineConfig) -> Self {
        let SourceSnapshot {
            prices,
            statements,
            earnings,
            economic,
            mut sentiment,
        } = snapshot;

        let (prices, duplicates_collapsed) = index_prices(prices);
        if duplicates_collapsed > 0 {
            info!(duplicates_collapsed, "duplicate price bars collapsed");
        }

        let statements = FiscalReleaseResolver::from_events(&earnings).resolve_all(statements);
        let earnings = VintageIndex::build(earnings, |e: &EarningsReleaseEvent| e.symbol.clone());
        let economic = EconomicPivot::new(config.economic_series.clone(), economic);
        let sentiment = config
            .sentiment_sources
            .iter()
            .map(|s| {
                let records = sentiment.remove(&s.name).unwrap_or_default();
                SentimentIndex::from_records(&records)
            })
            .collect();

        debug!(
            symbols = prices.len(),
            statements = statements.resolved_count(),
            earnings = earnings.fact_count(),
            "fact store built"
        );

        Self {
            prices,
            statements,
            earnings,
            economic,
            sentiment,
            duplicates_collapsed,
        }
    }

    pub fn excluded_statements(&self) -> usize {
        self.statements.excluded
    }

    pub fn ignored_economic_points(&self) -> usize {
        self.economic.ignored_points
    }
}

/// Group bars by symbol, keep the last bar per trade date.
fn index_prices(
    prices: Vec<PriceObservation>,
) -> (BTreeMap<String, Timeline<PriceObservation>>, usize) {
    let mut by_symbol: BTreeMap<String, Vec<PriceObservation>> = BTreeMap::new();
    for p in prices {
        by_symbol.entry(p.symbol.clone()).or_default().push(p);
    }

    let mut collapsed = 0usize;
    let index = by_symbol
        .into_iter()
        .map(|(symbol, bars)| {
            let sorted = Timeline::new(bars);
            let mut unique: Vec<PriceObservation> = Vec::with_capacity(sorted.len());
            for bar in sorted.facts() {
                match unique.last_mut() {
                    Some(prev) if prev.trade_date == bar.trade_date => {
                        *prev = bar.clone();
                        collapsed += 1;
                    }
                    _ => unique.push(bar.clone()),
                }
            }
            (symbol, Timeline::new(unique))
        })
        .collect();
    (index, collapsed)
}

/// Counters describing one assembly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssemblyStats {
    pub symbols: usize,
    pub rows: usize,
    pub train_rows: usize,
    pub test_rows: usize,
    pub null_targets: usize,
    pub feature_dates: usize,
    pub duplicates_collapsed: usize,
    pub excluded_statements: usize,
    pub ignored_economic_points: usize,
}

/// The assembled output: rows sorted by (symbol, prediction_date).
#[derive(Debug, Clone)]
pub struct FeatureMatrix {
    pub schema: FeatureSchema,
    pub rows: Vec<FeatureRow>,
    pub stats: AssemblyStats,
}

pub struct FeatureAssembler<'a> {
    config: &'a PipelineConfig,
    store: &'a FactStore,
    split: SplitPolicy,
}

impl<'a> FeatureAssembler<'a> {
    pub fn new(config: &'a PipelineConfig, store: &'a FactStore) -> Self {
        Self {
            config,
            store,
            split: config.split_policy(),
        }
    }

    /// Base observations selected by the configured symbol list and date range.
    fn base_bars<'s>(&'s self, symbol: &str) -> impl Iterator<Item = &'s PriceObservation> + 's {
        let bars = self
            .store
            .prices
            .get(symbol)
            .map(|t| t.facts())
            .unwrap_or(&[]);
        bars.iter().filter(|b| self.config.in_range(b.trade_date))
    }

    fn selected_symbols(&self) -> Vec<&'a str> {
        self.store
            .prices
            .keys()
            .map(String::as_str)
            .filter(|s| self.config.allows_symbol(s))
            .collect()
    }

    pub fn assemble(&self) -> FeatureMatrix {
        let symbols = self.selected_symbols();

        // Economic features depend on the date only: compute once, share.
        let feature_dates: BTreeSet<NaiveDate> = symbols
            .iter()
            .flat_map(|s| self.base_bars(s).map(|b| b.feature_date()))
            .collect();
        let economic = self.store.economic.pivot_dates(feature_dates.iter().copied());
        info!(feature_dates = economic.len(), "economic features pivoted");

        let per_symbol: Vec<Vec<FeatureRow>> = symbols
            .par_iter()
            .map(|symbol| self.assemble_symbol(symbol, &economic))
            .collect();
        let mut rows: Vec<FeatureRow> = per_symbol.into_iter().flatten().collect();

        // Distinct-row guarantee, independent of upstream collapsing.
        rows.sort_by(|a, b| a.key().cmp(&b.key()));
        let before = rows.len();
        rows.dedup_by(|b, a| a.key() == b.key());
        let extra = before - rows.len();
        if extra > 0 {
            debug!(extra, "duplicate output keys dropped");
        }

        let train_rows = rows.iter().filter(|r| r.split == SplitLabel::Train).count();
        let stats = AssemblyStats {
            symbols: symbols.len(),
            rows: rows.len(),
            train_rows,
            test_rows: rows.len() - train_rows,
            null_targets: rows.iter().filter(|r| r.target.is_none()).count(),
            feature_dates: feature_dates.len(),
            duplicates_collapsed: self.store.duplicates_collapsed + extra,
            excluded_statements: self.store.excluded_statements(),
            ignored_economic_points: self.store.ignored_economic_points(),
        };
        info!(
            rows = stats.rows,
            train = stats.train_rows,
            test = stats.test_rows,
            "feature matrix assembled"
        );

        FeatureMatrix {
            schema: FeatureSchema::from_config(self.config),
            rows,
            stats,
        }
    }

    fn assemble_symbol(
        &self,
        symbol: &str,
        economic: &BTreeMap<NaiveDate, EconomicRow>,
    ) -> Vec<FeatureRow> {
        let Some(prices) = self.store.prices.get(symbol) else {
            return Vec::new();
        };
        self.base_bars(symbol)
            .map(|bar| {
                let feature_date = feature_date_for(bar.trade_date);
                self.assemble_row(bar, feature_date, prices, economic.get(&feature_date))
            })
            .collect()
    }

    /// `assemble(observation)`: one row for one base bar.
    pub fn assemble_row(
        &self,
        bar: &PriceObservation,
        feature_date: NaiveDate,
        prices: &Timeline<PriceObservation>,
        economic: Option<&EconomicRow>,
    ) -> FeatureRow {
        let symbol = bar.symbol.as_str();
        let mut provenance = Provenance::default();

        let prev = prices.as_of(feature_date);
        provenance.price = prev.map(|p| p.trade_date);
        let stock = StockFeatures::from_bar(prev, feature_date);

        let mut picked = [None; 3];
        for st in StatementType::ALL {
            let r = self.store.statements.as_of(symbol, st, feature_date);
            provenance.statements[st.index()] = r.map(|r| r.release_date);
            picked[st.index()] = r;
        }
        let earnings = self.store.earnings.as_of(symbol, feature_date);
        provenance.earnings = earnings.map(|e| e.release_date);

        let financial = FinancialContext {
            feature_date,
            income: picked[StatementType::Income.index()],
            balance: picked[StatementType::Balance.index()],
            cashflow: picked[StatementType::Cashflow.index()],
            earnings,
            close: stock.prev_close,
        }
        .values();

        let economic = match economic {
            Some(row) => {
                provenance.economic = row.known_at;
                row.values.clone()
            }
            None => {
                let row = self.store.economic.pivot(feature_date);
                provenance.economic = row.known_at;
                row.values
            }
        };

        let sentiment: Vec<_> = self
            .store
            .sentiment
            .iter()
            .map(|index| index.get(symbol, feature_date).cloned())
            .collect();
        provenance.sentiment = sentiment
            .iter()
            .map(|s| s.as_ref().map(|s| s.news_date))
            .collect();

        FeatureRow {
            symbol: bar.symbol.clone(),
            prediction_date: bar.trade_date,
            feature_date,
            target: bar.percent_daily_price_change(),
            stock,
            financial,
            economic,
            sentiment,
            split: self.split.label(bar.trade_date),
            provenance,
        }
    }
}

/// Index `snapshot` and assemble it under `config`.
pub fn build_feature_matrix(snapshot: SourceSnapshot, config: &PipelineConfig) -> FeatureMatrix {
    let store = FactStore::build(snapshot, config);
    FeatureAssembler::new(config, &store).assemble()
}
