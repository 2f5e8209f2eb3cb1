//! Fiscal statements, earnings releases, and release-dated statements.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::asof::Vintage;

/// The three statement families reported each fiscal period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatementType {
    Income,
    Balance,
    Cashflow,
}

impl StatementType {
    pub const ALL: [StatementType; 3] = [Self::Income, Self::Balance, Self::Cashflow];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Balance => "balance",
            Self::Cashflow => "cashflow",
        }
    }

    /// Position in [`StatementType::ALL`]; used to index per-type arrays.
    pub fn index(self) -> usize {
        match self {
            Self::Income => 0,
            Self::Balance => 1,
            Self::Cashflow => 2,
        }
    }
}

impl fmt::Display for StatementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for an unrecognized statement type label.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown statement type '{0}'")]
pub struct UnknownStatementType(pub String);

impl FromStr for StatementType {
    type Err = UnknownStatementType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "income" | "income_statement" => Ok(Self::Income),
            "balance" | "balance_sheet" => Ok(Self::Balance),
            "cashflow" | "cash_flow" | "cash_flow_statement" => Ok(Self::Cashflow),
            other => Err(UnknownStatementType(other.to_string())),
        }
    }
}

/// A statement as filed for one fiscal period.
///
/// `fiscal_period_end` is the date the numbers describe, not the date they
/// became public. On its own the statement has no knowledge date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FiscalStatement {
    pub symbol: String,
    pub fiscal_period_end: NaiveDate,
    pub statement_type: StatementType,
    pub metric_values: BTreeMap<String, f64>,
}

impl FiscalStatement {
    pub fn metric(&self, name: &str) -> Option<f64> {
        self.metric_values.get(name).copied().filter(|v| v.is_finite())
    }
}

/// An earnings announcement.
///
/// Serves two roles: its own EPS fields are features, and its release date
/// is the public disclosure date of the statements for the preceding period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EarningsReleaseEvent {
    pub symbol: String,
    pub release_date: NaiveDate,
    pub eps_estimate: Option<f64>,
    pub reported_eps: Option<f64>,
    pub surprise_pct: Option<f64>,
}

impl Vintage for EarningsReleaseEvent {
    type TieKey = ();

    fn knowledge_date(&self) -> NaiveDate {
        self.release_date
    }

    fn tie_key(&self) -> Self::TieKey {}
}

/// A fiscal statement stamped with the date it became public.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedStatement {
    pub statement: FiscalStatement,
    pub release_date: NaiveDate,
}

impl ResolvedStatement {
    pub fn symbol(&self) -> &str {
        &self.statement.symbol
    }

    pub fn statement_type(&self) -> StatementType {
        self.statement.statement_type
    }

    pub fn metric(&self, name: &str) -> Option<f64> {
        self.statement.metric(name)
    }
}

/// Restatements released on the same day resolve to the later period end.
impl Vintage for ResolvedStatement {
    type TieKey = NaiveDate;

    fn knowledge_date(&self) -> NaiveDate {
        self.release_date
    }

    fn tie_key(&self) -> Self::TieKey {
        self.statement.fiscal_period_end
    }
}
