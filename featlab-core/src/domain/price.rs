//! PriceObservation: one daily bar per (symbol, trade_date).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::asof::Vintage;

/// Daily price bar aggregated from intraday trades.
///
/// The bar is the base observation that drives iteration: its trade date is
/// the prediction date of one output row, and its open/close produce the
/// target. As a fact stream it is knowable from `trade_date` onward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceObservation {
    pub symbol: String,
    pub trade_date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub vwap: Option<f64>,
    pub trade_count: Option<u64>,
}

impl PriceObservation {
    /// Intraday percent change `(close - open) / open`.
    ///
    /// `None` when open is not a positive finite number or close is not finite.
    pub fn percent_daily_price_change(&self) -> Option<f64> {
        if !self.open.is_finite() || self.open <= 0.0 || !self.close.is_finite() {
            return None;
        }
        Some((self.close - self.open) / self.open)
    }

    /// Feature date for a row predicting this bar: one calendar day earlier.
    pub fn feature_date(&self) -> NaiveDate {
        feature_date_for(self.trade_date)
    }
}

/// The as-of date used for every feature lookup of a row predicting `prediction_date`.
///
/// Saturates at `NaiveDate::MIN`, which has no predecessor.
pub fn feature_date_for(prediction_date: NaiveDate) -> NaiveDate {
    prediction_date.pred_opt().unwrap_or(NaiveDate::MIN)
}

impl Vintage for PriceObservation {
    type TieKey = ();

    fn knowledge_date(&self) -> NaiveDate {
        self.trade_date
    }

    fn tie_key(&self) -> Self::TieKey {}
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(open: f64, close: f64) -> PriceObservation {
        PriceObservation {
            symbol: "AAPL".into(),
            trade_date: NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(),
            open,
            high: open.max(close) + 1.0,
            low: open.min(close) - 1.0,
            close,
            volume: 1_000.0,
            vwap: None,
            trade_count: None,
        }
    }

    #[test]
    fn daily_change_is_relative_to_open() {
        let change = bar(100.0, 102.0).percent_daily_price_change().unwrap();
        assert!((change - 0.02).abs() < 1e-12);
    }

    #[test]
    fn daily_change_rejects_non_positive_open() {
        assert_eq!(bar(0.0, 1.0).percent_daily_price_change(), None);
        assert_eq!(bar(-5.0, 1.0).percent_daily_price_change(), None);
        assert_eq!(bar(f64::NAN, 1.0).percent_daily_price_change(), None);
    }

    #[test]
    fn feature_date_is_previous_calendar_day() {
        // Monday → Sunday; the as-of lookup is what skips the weekend.
        assert_eq!(
            bar(1.0, 1.0).feature_date(),
            NaiveDate::from_ymd_opt(2024, 3, 3).unwrap()
        );
    }

    #[test]
    fn feature_date_saturates_at_min_date() {
        assert_eq!(feature_date_for(NaiveDate::MIN), NaiveDate::MIN);
    }
}
