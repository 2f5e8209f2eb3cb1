//! Leakage audit for an assembled matrix.
//!
//! Checks, per row: feature date is the day before the prediction date, and
//! every recorded knowledge date is on or before the feature date. Across
//! rows: sorted by (symbol, prediction_date) with no repeated key.

use chrono::NaiveDate;
use thiserror::Error;

use crate::assembler::FeatureMatrix;
use crate::domain::{feature_date_for, FeatureRow};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuditError {
    #[error("{symbol} {prediction_date}: feature date {feature_date} is not the previous day")]
    FeatureDate {
        symbol: String,
        prediction_date: NaiveDate,
        feature_date: NaiveDate,
    },

    #[error("{symbol} {prediction_date}: {fact} known at {known_at}, after feature date {feature_date}")]
    Lookahead {
        symbol: String,
        prediction_date: NaiveDate,
        feature_date: NaiveDate,
        fact: String,
        known_at: NaiveDate,
    },

    #[error("{symbol} {prediction_date}: duplicate row")]
    Duplicate {
        symbol: String,
        prediction_date: NaiveDate,
    },

    #[error("rows out of order at {symbol} {prediction_date}")]
    Unsorted {
        symbol: String,
        prediction_date: NaiveDate,
    },
}

/// Audit one row in isolation.
pub fn audit_row(row: &FeatureRow) -> Result<(), AuditError> {
    if row.feature_date != feature_date_for(row.prediction_date) {
        return Err(AuditError::FeatureDate {
            symbol: row.symbol.clone(),
            prediction_date: row.prediction_date,
            feature_date: row.feature_date,
        });
    }
    for (fact, known_at) in row.provenance.known_dates() {
        if known_at > row.feature_date {
            return Err(AuditError::Lookahead {
                symbol: row.symbol.clone(),
                prediction_date: row.prediction_date,
                feature_date: row.feature_date,
                fact,
                known_at,
            });
        }
    }
    Ok(())
}

/// Audit every row and the ordering between rows. Stops at the first failure.
pub fn audit_rows(rows: &[FeatureRow]) -> Result<(), AuditError> {
    for row in rows {
        audit_row(row)?;
    }
    for pair in rows.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        match a.key().cmp(&b.key()) {
            std::cmp::Ordering::Less => {}
            std::cmp::Ordering::Equal => {
                return Err(AuditError::Duplicate {
                    symbol: b.symbol.clone(),
                    prediction_date: b.prediction_date,
                })
            }
            std::cmp::Ordering::Greater => {
                return Err(AuditError::Unsorted {
                    symbol: b.symbol.clone(),
                    prediction_date: b.prediction_date,
                })
            }
        }
    }
    Ok(())
}

pub fn audit_matrix(matrix: &FeatureMatrix) -> Result<(), AuditError> {
    audit_rows(&matrix.rows)
}
