//! Financial feature catalog.
//!
//! Each output column is either a raw statement metric or a function of the
//! statements, earnings event and lagged close selected for one row. All
//! inputs were chosen by as-of lookups on the feature date, so every column
//! is point-in-time by construction.

use chrono::NaiveDate;

use crate::domain::{EarningsReleaseEvent, ResolvedStatement, StatementType};

/// Facts selected for one (symbol, feature_date).
#[derive(Debug, Clone, Copy)]
pub struct FinancialContext<'a> {
    pub feature_date: NaiveDate,
    pub income: Option<&'a ResolvedStatement>,
    pub balance: Option<&'a ResolvedStatement>,
    pub cashflow: Option<&'a ResolvedStatement>,
    pub earnings: Option<&'a EarningsReleaseEvent>,
    /// Close of the lagged price bar, for valuation ratios.
    pub close: Option<f64>,
}

impl<'a> FinancialContext<'a> {
    pub fn statement(&self, statement_type: StatementType) -> Option<&'a ResolvedStatement> {
        match statement_type {
            StatementType::Income => self.income,
            StatementType::Balance => self.balance,
            StatementType::Cashflow => self.cashflow,
        }
    }

    fn metric(&self, statement_type: StatementType, name: &str) -> Option<f64> {
        self.statement(statement_type)?.metric(name)
    }

    fn income(&self, name: &str) -> Option<f64> {
        self.metric(StatementType::Income, name)
    }

    fn balance(&self, name: &str) -> Option<f64> {
        self.metric(StatementType::Balance, name)
    }

    fn cashflow(&self, name: &str) -> Option<f64> {
        self.metric(StatementType::Cashflow, name)
    }

    fn age(&self, statement_type: StatementType) -> Option<f64> {
        let st = self.statement(statement_type)?;
        Some((self.feature_date - st.release_date).num_days() as f64)
    }

    /// Evaluate every catalog column, in catalog order.
    pub fn values(&self) -> Vec<Option<f64>> {
        FINANCIAL_COLUMNS.iter().map(|c| c.evaluate(self)).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinancialGroup {
    Income,
    Balance,
    Cashflow,
    Derived,
    Earnings,
    Age,
}

#[derive(Clone, Copy)]
pub enum FinancialSource {
    Metric(StatementType, &'static str),
    Derived(fn(&FinancialContext<'_>) -> Option<f64>),
}

#[derive(Clone, Copy)]
pub struct FinancialColumn {
    pub name: &'static str,
    pub group: FinancialGroup,
    pub source: FinancialSource,
}

impl FinancialColumn {
    pub fn evaluate(&self, ctx: &FinancialContext<'_>) -> Option<f64> {
        let v = match self.source {
            FinancialSource::Metric(st, metric) => ctx.metric(st, metric),
            FinancialSource::Derived(f) => f(ctx),
        };
        v.filter(|x| x.is_finite())
    }
}

impl std::fmt::Debug for FinancialColumn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FinancialColumn")
            .field("name", &self.name)
            .field("group", &self.group)
            .finish()
    }
}

/// `num / den`, absent when either side is absent or `den` is zero.
fn ratio(num: Option<f64>, den: Option<f64>) -> Option<f64> {
    let (n, d) = (num?, den?);
    if d == 0.0 {
        return None;
    }
    Some(n / d)
}

fn market_cap(ctx: &FinancialContext<'_>) -> Option<f64> {
    Some(ctx.close? * ctx.balance("shares_outstanding")?)
}

const fn metric(name: &'static str, st: StatementType) -> FinancialColumn {
    let group = match st {
        StatementType::Income => FinancialGroup::Income,
        StatementType::Balance => FinancialGroup::Balance,
        StatementType::Cashflow => FinancialGroup::Cashflow,
    };
    FinancialColumn {
        name,
        group,
        source: FinancialSource::Metric(st, name),
    }
}

const fn derived(
    name: &'static str,
    group: FinancialGroup,
    f: fn(&FinancialContext<'_>) -> Option<f64>,
) -> FinancialColumn {
    FinancialColumn {
        name,
        group,
        source: FinancialSource::Derived(f),
    }
}

use FinancialGroup::{Age, Derived, Earnings};
use StatementType::{Balance, Cashflow, Income};

/// Output column order for the financial block.
pub static FINANCIAL_COLUMNS: [FinancialColumn; 44] = [
    // ── Income ──
    metric("revenue", Income),
    metric("cost_of_revenue", Income),
    metric("gross_profit", Income),
    metric("operating_income", Income),
    metric("net_income", Income),
    metric("ebitda", Income),
    metric("eps", Income),
    metric("eps_diluted", Income),
    // ── Balance ──
    metric("total_assets", Balance),
    metric("total_liabilities", Balance),
    metric("total_equity", Balance),
    metric("current_assets", Balance),
    metric("current_liabilities", Balance),
    metric("cash_and_equivalents", Balance),
    metric("total_debt", Balance),
    metric("shares_outstanding", Balance),
    // ── Cash flow ──
    metric("operating_cash_flow", Cashflow),
    metric("capital_expenditure", Cashflow),
    metric("free_cash_flow", Cashflow),
    metric("dividends_paid", Cashflow),
    metric("net_change_in_cash", Cashflow),
    // ── Derived ──
    derived("gross_margin", Derived, |c| ratio(c.income("gross_profit"), c.income("revenue"))),
    derived("operating_margin", Derived, |c| {
        ratio(c.income("operating_income"), c.income("revenue"))
    }),
    derived("net_margin", Derived, |c| ratio(c.income("net_income"), c.income("revenue"))),
    derived("ebitda_margin", Derived, |c| ratio(c.income("ebitda"), c.income("revenue"))),
    derived("current_ratio", Derived, |c| {
        ratio(c.balance("current_assets"), c.balance("current_liabilities"))
    }),
    derived("cash_ratio", Derived, |c| {
        ratio(c.balance("cash_and_equivalents"), c.balance("current_liabilities"))
    }),
    derived("debt_to_equity", Derived, |c| {
        ratio(c.balance("total_debt"), c.balance("total_equity"))
    }),
    derived("debt_to_assets", Derived, |c| {
        ratio(c.balance("total_debt"), c.balance("total_assets"))
    }),
    derived("liabilities_to_assets", Derived, |c| {
        ratio(c.balance("total_liabilities"), c.balance("total_assets"))
    }),
    derived("return_on_assets", Derived, |c| {
        ratio(c.income("net_income"), c.balance("total_assets"))
    }),
    derived("return_on_equity", Derived, |c| {
        ratio(c.income("net_income"), c.balance("total_equity"))
    }),
    derived("fcf_margin", Derived, |c| {
        ratio(c.cashflow("free_cash_flow"), c.income("revenue"))
    }),
    derived("market_cap", Derived, market_cap),
    derived("price_to_earnings", Derived, |c| ratio(c.close, c.income("eps"))),
    derived("price_to_book", Derived, |c| ratio(market_cap(c), c.balance("total_equity"))),
    derived("price_to_sales", Derived, |c| ratio(market_cap(c), c.income("revenue"))),
    // ── Earnings event ──
    derived("eps_estimate", Earnings, |c| c.earnings?.eps_estimate),
    derived("reported_eps", Earnings, |c| c.earnings?.reported_eps),
    derived("surprise_pct", Earnings, |c| c.earnings?.surprise_pct),
    derived("days_since_earnings", Earnings, |c| {
        Some((c.feature_date - c.earnings?.release_date).num_days() as f64)
    }),
    // ── Statement ages ──
    derived("days_since_income_release", Age, |c| c.age(Income)),
    derived("days_since_balance_release", Age, |c| c.age(Balance)),
    derived("days_since_cashflow_release", Age, |c| c.age(Cashflow)),
];

pub fn financial_column_names() -> impl Iterator<Item = &'static str> {
    FINANCIAL_COLUMNS.iter().map(|c| c.name)
}
