//! Property tests for the point-in-time engine.
//!
//! Uses proptest to verify:
//! 1. As-of equivalence: indexed lookup, batch sweep and the linear reference agree
//! 2. Monotonic selection: the selected fact has the latest visible knowledge date
//! 3. Determinism: identical inputs give identical outputs
//! 4. Resolver correctness: the release is the first one after the period end
//! 5. Uniqueness: one row per (symbol, prediction_date), sorted, audit-clean
//! 6. Sentiment aggregates: counts add up, mean lies within the inputs

use chrono::{Duration, NaiveDate};
use proptest::prelude::*;
use std::collections::BTreeMap;

use featlab_core::asof::{as_of_unsorted, Timeline, Vintage};
use featlab_core::audit::audit_matrix;
use featlab_core::daily_sentiment::DailySentiment;
use featlab_core::data::SourceSnapshot;
use featlab_core::domain::{
    EarningsReleaseEvent, FiscalStatement, NewsSentimentRecord, PriceObservation, SentimentLabel,
    StatementType,
};
use featlab_core::resolver::FiscalReleaseResolver;
use featlab_core::{build_feature_matrix, PipelineConfig};

fn base() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
}

fn day(offset: i64) -> NaiveDate {
    base() + Duration::days(offset)
}

#[derive(Debug, Clone, PartialEq)]
struct Fact {
    kd: NaiveDate,
    tie: u8,
    id: usize,
}

impl Vintage for Fact {
    type TieKey = u8;

    fn knowledge_date(&self) -> NaiveDate {
        self.kd
    }

    fn tie_key(&self) -> u8 {
        self.tie
    }
}

// ── Strategies (proptest) ────────────────────────────────────────────

/// Facts crowded into a short window so ties are common.
fn arb_facts() -> impl Strategy<Value = Vec<Fact>> {
    prop::collection::vec((0..30i64, 0..3u8), 0..40).prop_map(|raw| {
        raw.into_iter()
            .enumerate()
            .map(|(id, (offset, tie))| Fact {
                kd: day(offset),
                tie,
                id,
            })
            .collect()
    })
}

fn arb_query() -> impl Strategy<Value = NaiveDate> {
    (-5..40i64).prop_map(day)
}

fn arb_label() -> impl Strategy<Value = SentimentLabel> {
    prop_oneof![
        Just(SentimentLabel::Positive),
        Just(SentimentLabel::Neutral),
        Just(SentimentLabel::Negative),
    ]
}

/// Price bars for up to three symbols over 20 days, duplicates included.
fn arb_prices() -> impl Strategy<Value = Vec<PriceObservation>> {
    prop::collection::vec((0..3usize, 0..20i64, 1.0..100.0f64, 1.0..100.0f64), 1..60).prop_map(
        |raw| {
            raw.into_iter()
                .map(|(s, offset, open, close)| PriceObservation {
                    symbol: ["AAA", "BBB", "CCC"][s].to_string(),
                    trade_date: day(offset),
                    open,
                    high: open.max(close),
                    low: open.min(close),
                    close,
                    volume: 1_000.0,
                    vwap: None,
                    trade_count: None,
                })
                .collect()
        },
    )
}

// ── 1. As-of equivalence ─────────────────────────────────────────────

proptest! {
    #[test]
    fn indexed_as_of_matches_linear_reference(facts in arb_facts(), q in arb_query()) {
        let timeline = Timeline::new(facts.clone());
        let indexed = timeline.as_of(q).map(|f| f.id);
        let reference = as_of_unsorted(&facts, q).map(|f| f.id);
        prop_assert_eq!(indexed, reference);
    }

    #[test]
    fn sweep_matches_point_lookups(facts in arb_facts(), mut qs in prop::collection::vec(arb_query(), 0..30)) {
        qs.sort();
        let timeline = Timeline::new(facts);
        let swept: Vec<Option<usize>> = timeline.sweep(&qs).into_iter().map(|f| f.map(|f| f.id)).collect();
        let point: Vec<Option<usize>> = qs.iter().map(|q| timeline.as_of(*q).map(|f| f.id)).collect();
        prop_assert_eq!(swept, point);
    }
}

// ── 2. Monotonic selection ───────────────────────────────────────────

proptest! {
    #[test]
    fn selected_fact_is_latest_visible(facts in arb_facts(), q in arb_query()) {
        let timeline = Timeline::new(facts.clone());
        let visible: Vec<&Fact> = facts.iter().filter(|f| f.kd <= q).collect();
        match timeline.as_of(q) {
            None => prop_assert!(visible.is_empty()),
            Some(sel) => {
                prop_assert!(sel.kd <= q);
                for f in &visible {
                    prop_assert!(f.kd <= sel.kd);
                    if f.kd == sel.kd {
                        prop_assert!(f.tie <= sel.tie);
                    }
                }
            }
        }
    }
}

// ── 3. Determinism ───────────────────────────────────────────────────

proptest! {
    #[test]
    fn as_of_is_deterministic(facts in arb_facts(), q in arb_query()) {
        let a = Timeline::new(facts.clone()).as_of(q).cloned();
        let b = Timeline::new(facts).as_of(q).cloned();
        prop_assert_eq!(a, b);
    }
}

// ── 4. Resolver correctness ──────────────────────────────────────────

proptest! {
    #[test]
    fn resolver_picks_first_release_after_period_end(
        releases in prop::collection::vec(0..200i64, 0..8),
        period_end in 0..200i64,
    ) {
        let events: Vec<EarningsReleaseEvent> = releases
            .iter()
            .map(|&o| EarningsReleaseEvent {
                symbol: "X".into(),
                release_date: day(o),
                eps_estimate: None,
                reported_eps: None,
                surprise_pct: None,
            })
            .collect();
        let statement = FiscalStatement {
            symbol: "X".into(),
            fiscal_period_end: day(period_end),
            statement_type: StatementType::Balance,
            metric_values: BTreeMap::new(),
        };
        let expected = releases.iter().filter(|&&o| o > period_end).min().map(|&o| day(o));
        let got = FiscalReleaseResolver::from_events(&events)
            .resolve(statement)
            .map(|r| r.release_date);
        prop_assert_eq!(got, expected);
    }
}

// ── 5. Uniqueness ────────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn one_row_per_symbol_and_date(prices in arb_prices()) {
        let mut keys: Vec<(String, NaiveDate)> =
            prices.iter().map(|p| (p.symbol.clone(), p.trade_date)).collect();
        keys.sort();
        keys.dedup();

        let snapshot = SourceSnapshot { prices, ..SourceSnapshot::default() };
        let matrix = build_feature_matrix(snapshot, &PipelineConfig::default());

        let got: Vec<(String, NaiveDate)> =
            matrix.rows.iter().map(|r| (r.symbol.clone(), r.prediction_date)).collect();
        prop_assert_eq!(got, keys);
        prop_assert!(audit_matrix(&matrix).is_ok());
    }
}

// ── 6. Sentiment aggregates ──────────────────────────────────────────

proptest! {
    #[test]
    fn sentiment_counts_add_up(
        raw in prop::collection::vec((arb_label(), 0.0..1.0f64), 0..25),
    ) {
        let records: Vec<NewsSentimentRecord> = raw
            .iter()
            .map(|(label, confidence)| NewsSentimentRecord {
                symbol: "X".into(),
                news_date: base(),
                sentiment_label: *label,
                confidence: *confidence,
            })
            .collect();
        match DailySentiment::from_records(base(), &records) {
            None => prop_assert!(records.is_empty()),
            Some(agg) => {
                prop_assert_eq!(agg.total_count as usize, records.len());
                prop_assert_eq!(
                    agg.positive_count + agg.neutral_count + agg.negative_count,
                    agg.total_count
                );
                let lo = records.iter().map(|r| r.confidence).fold(f64::INFINITY, f64::min);
                let hi = records.iter().map(|r| r.confidence).fold(f64::NEG_INFINITY, f64::max);
                prop_assert!(agg.avg_confidence >= lo - 1e-12 && agg.avg_confidence <= hi + 1e-12);
            }
        }
    }
}
