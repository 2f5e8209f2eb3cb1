//! Fiscal-Release Resolver.
//!
//! A statement's numbers describe its fiscal period end but become public only
//! at the next earnings release. Resolution maps each statement to the first
//! release date strictly after its period end. It depends only on the
//! statement and the release calendar, so it runs once per statement, before
//! any as-of query.

use chrono::NaiveDate;
use std::collections::HashMap;
use tracing::{debug, info};

use crate::asof::VintageIndex;
use crate::domain::{EarningsReleaseEvent, FiscalStatement, ResolvedStatement, StatementType};

/// Sorted, deduplicated release dates per symbol.
#[derive(Debug, Clone, Default)]
pub struct ReleaseCalendar {
    dates: HashMap<String, Vec<NaiveDate>>,
}

impl ReleaseCalendar {
    pub fn from_events<'a, I>(events: I) -> Self
    where
        I: IntoIterator<Item = &'a EarningsReleaseEvent>,
    {
        let mut dates: HashMap<String, Vec<NaiveDate>> = HashMap::new();
        for ev in events {
            dates.entry(ev.symbol.clone()).or_default().push(ev.release_date);
        }
        for v in dates.values_mut() {
            v.sort_unstable();
            v.dedup();
        }
        Self { dates }
    }

    /// First release date strictly after `period_end`.
    pub fn next_release_after(&self, symbol: &str, period_end: NaiveDate) -> Option<NaiveDate> {
        let dates = self.dates.get(symbol)?;
        let idx = dates.partition_point(|d| *d <= period_end);
        dates.get(idx).copied()
    }
}

/// Resolves statements against a release calendar.
#[derive(Debug, Clone)]
pub struct FiscalReleaseResolver {
    calendar: ReleaseCalendar,
}

impl FiscalReleaseResolver {
    pub fn new(calendar: ReleaseCalendar) -> Self {
        Self { calendar }
    }

    pub fn from_events(events: &[EarningsReleaseEvent]) -> Self {
        Self::new(ReleaseCalendar::from_events(events))
    }

    /// `resolve(statement)`. `None` means the statement is not yet public.
    pub fn resolve(&self, statement: FiscalStatement) -> Option<ResolvedStatement> {
        let release_date = self
            .calendar
            .next_release_after(&statement.symbol, statement.fiscal_period_end)?;
        Some(ResolvedStatement {
            statement,
            release_date,
        })
    }

    /// Resolve every statement once and index the survivors per statement type.
    pub fn resolve_all(&self, statements: Vec<FiscalStatement>) -> ResolvedPool {
        let total = statements.len();
        let mut by_type: [Vec<ResolvedStatement>; 3] = Default::default();
        let mut excluded = 0usize;
        for st in statements {
            let ty = st.statement_type;
            match self.resolve(st) {
                Some(r) => by_type[ty.index()].push(r),
                None => excluded += 1,
            }
        }
        if excluded > 0 {
            info!(excluded, total, "statements without a later release excluded");
        }
        let [income, balance, cashflow] = by_type;
        let index = |v: Vec<ResolvedStatement>| {
            VintageIndex::build(v, |r: &ResolvedStatement| r.statement.symbol.clone())
        };
        let pool = ResolvedPool {
            pools: [index(income), index(balance), index(cashflow)],
            excluded,
        };
        debug!(resolved = total - excluded, "statement pool built");
        pool
    }
}

/// Release-dated statements, one as-of index per statement type.
#[derive(Debug, Clone, Default)]
pub struct ResolvedPool {
    pools: [VintageIndex<String, ResolvedStatement>; 3],
    /// Statements dropped because no release followed their period end.
    pub excluded: usize,
}

impl ResolvedPool {
    pub fn pool(&self, statement_type: StatementType) -> &VintageIndex<String, ResolvedStatement> {
        &self.pools[statement_type.index()]
    }

    /// Latest statement of `statement_type` public on `as_of`.
    pub fn as_of(
        &self,
        symbol: &str,
        statement_type: StatementType,
        as_of: NaiveDate,
    ) -> Option<&ResolvedStatement> {
        self.pool(statement_type).as_of(symbol, as_of)
    }

    pub fn resolved_count(&self) -> usize {
        self.pools.iter().map(VintageIndex::fact_count).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn release(symbol: &str, date: NaiveDate) -> EarningsReleaseEvent {
        EarningsReleaseEvent {
            symbol: symbol.into(),
            release_date: date,
            eps_estimate: None,
            reported_eps: None,
            surprise_pct: None,
        }
    }

    fn statement(symbol: &str, period_end: NaiveDate, revenue: f64) -> FiscalStatement {
        let mut metric_values = BTreeMap::new();
        metric_values.insert("revenue".to_string(), revenue);
        FiscalStatement {
            symbol: symbol.into(),
            fiscal_period_end: period_end,
            statement_type: StatementType::Income,
            metric_values,
        }
    }

    #[test]
    fn resolves_to_first_release_after_period_end() {
        let resolver = FiscalReleaseResolver::from_events(&[
            release("X", d(2024, 7, 19)),
            release("X", d(2024, 4, 20)),
        ]);
        let r = resolver.resolve(statement("X", d(2024, 3, 31), 1.0)).unwrap();
        assert_eq!(r.release_date, d(2024, 4, 20));
    }

    #[test]
    fn release_on_period_end_does_not_count() {
        let resolver = FiscalReleaseResolver::from_events(&[
            release("X", d(2024, 3, 31)),
            release("X", d(2024, 4, 25)),
        ]);
        let r = resolver.resolve(statement("X", d(2024, 3, 31), 1.0)).unwrap();
        assert_eq!(r.release_date, d(2024, 4, 25));
    }

    #[test]
    fn no_later_release_is_excluded() {
        let resolver = FiscalReleaseResolver::from_events(&[release("X", d(2024, 1, 20))]);
        assert!(resolver.resolve(statement("X", d(2024, 3, 31), 1.0)).is_none());
        // Another symbol's releases never apply.
        let resolver = FiscalReleaseResolver::from_events(&[release("Y", d(2024, 4, 20))]);
        assert!(resolver.resolve(statement("X", d(2024, 3, 31), 1.0)).is_none());
    }

    #[test]
    fn pool_counts_exclusions_and_serves_as_of() {
        let resolver = FiscalReleaseResolver::from_events(&[
            release("X", d(2024, 4, 20)),
            release("X", d(2024, 7, 19)),
        ]);
        let pool = resolver.resolve_all(vec![
            statement("X", d(2024, 3, 31), 1.0),
            statement("X", d(2024, 6, 30), 2.0),
            statement("X", d(2024, 9, 30), 3.0),
        ]);
        assert_eq!(pool.excluded, 1);
        assert_eq!(pool.resolved_count(), 2);

        let at = |date| {
            pool.as_of("X", StatementType::Income, date)
                .and_then(|r| r.metric("revenue"))
        };
        assert_eq!(at(d(2024, 4, 19)), None);
        assert_eq!(at(d(2024, 4, 20)), Some(1.0));
        assert_eq!(at(d(2024, 7, 18)), Some(1.0));
        assert_eq!(at(d(2024, 12, 31)), Some(2.0));
        assert!(pool.as_of("X", StatementType::Balance, d(2024, 12, 31)).is_none());
    }

    #[test]
    fn restatement_sharing_a_release_picks_later_period() {
        // Two income statements both resolve to 2024-04-20.
        let resolver = FiscalReleaseResolver::from_events(&[release("X", d(2024, 4, 20))]);
        let pool = resolver.resolve_all(vec![
            statement("X", d(2024, 3, 31), 20.0),
            statement("X", d(2023, 12, 31), 10.0),
        ]);
        let r = pool.as_of("X", StatementType::Income, d(2024, 5, 1)).unwrap();
        assert_eq!(r.statement.fiscal_period_end, d(2024, 3, 31));
        assert_eq!(r.metric("revenue"), Some(20.0));
    }
}
