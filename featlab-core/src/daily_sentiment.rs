//! Daily Sentiment Aggregator.
//!
//! Groups per-article classifier output by `(symbol, news_date)`. A day
//! without news has no aggregate at all; it is never a row of zeros.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::{NewsSentimentRecord, SentimentLabel};

/// Summary of one symbol's news on one day, from one classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySentiment {
    pub news_date: NaiveDate,
    pub positive_count: u32,
    pub neutral_count: u32,
    pub negative_count: u32,
    pub total_count: u32,
    pub avg_confidence: f64,
}

impl DailySentiment {
    /// `aggregate(symbol, date, records)`; `None` for an empty group.
    ///
    /// Records are assumed to share one symbol and date.
    pub fn from_records<'a, I>(news_date: NaiveDate, records: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a NewsSentimentRecord>,
    {
        let mut agg = Accumulator::default();
        for r in records {
            agg.push(r);
        }
        agg.finish(news_date)
    }
}

#[derive(Debug, Default)]
struct Accumulator {
    positive: u32,
    neutral: u32,
    negative: u32,
    confidence_sum: f64,
}

impl Accumulator {
    fn push(&mut self, r: &NewsSentimentRecord) {
        match r.sentiment_label {
            SentimentLabel::Positive => self.positive += 1,
            SentimentLabel::Neutral => self.neutral += 1,
            SentimentLabel::Negative => self.negative += 1,
        }
        self.confidence_sum += r.confidence;
    }

    fn total(&self) -> u32 {
        self.positive + self.neutral + self.negative
    }

    fn finish(self, news_date: NaiveDate) -> Option<DailySentiment> {
        let total = self.total();
        if total == 0 {
            return None;
        }
        Some(DailySentiment {
            news_date,
            positive_count: self.positive,
            neutral_count: self.neutral,
            negative_count: self.negative,
            total_count: total,
            avg_confidence: self.confidence_sum / f64::from(total),
        })
    }
}

/// Daily aggregates for one sentiment source, keyed by symbol then date.
#[derive(Debug, Clone, Default)]
pub struct SentimentIndex {
    days: HashMap<String, HashMap<NaiveDate, DailySentiment>>,
}

impl SentimentIndex {
    /// Aggregate all records of one source in a single pass.
    pub fn from_records(records: &[NewsSentimentRecord]) -> Self {
        let mut acc: HashMap<&str, HashMap<NaiveDate, Accumulator>> = HashMap::new();
        for r in records {
            acc.entry(r.symbol.as_str())
                .or_default()
                .entry(r.news_date)
                .or_default()
                .push(r);
        }
        let days = acc
            .into_iter()
            .map(|(symbol, by_day)| {
                let by_day = by_day
                    .into_iter()
                    .filter_map(|(date, a)| a.finish(date).map(|s| (date, s)))
                    .collect();
                (symbol.to_string(), by_day)
            })
            .collect();
        Self { days }
    }

    /// Aggregate for exactly `date`, or `None` when there was no news.
    pub fn get(&self, symbol: &str, date: NaiveDate) -> Option<&DailySentiment> {
        self.days.get(symbol)?.get(&date)
    }

    /// Number of (symbol, day) aggregates.
    pub fn len(&self) -> usize {
        self.days.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn rec(symbol: &str, date: NaiveDate, label: SentimentLabel, confidence: f64) -> NewsSentimentRecord {
        NewsSentimentRecord {
            symbol: symbol.into(),
            news_date: date,
            sentiment_label: label,
            confidence,
        }
    }

    #[test]
    fn counts_and_mean_confidence() {
        let day = d(2024, 5, 2);
        let records = vec![
            rec("X", day, SentimentLabel::Positive, 0.9),
            rec("X", day, SentimentLabel::Positive, 0.7),
            rec("X", day, SentimentLabel::Negative, 0.5),
            rec("X", day, SentimentLabel::Neutral, 0.3),
        ];
        let s = DailySentiment::from_records(day, &records).unwrap();
        assert_eq!(s.positive_count, 2);
        assert_eq!(s.neutral_count, 1);
        assert_eq!(s.negative_count, 1);
        assert_eq!(s.total_count, 4);
        assert!((s.avg_confidence - 0.6).abs() < 1e-12);
    }

    #[test]
    fn empty_group_is_absent_not_zero() {
        let none: Vec<NewsSentimentRecord> = vec![];
        assert!(DailySentiment::from_records(d(2024, 5, 2), &none).is_none());

        let index = SentimentIndex::from_records(&[rec("X", d(2024, 5, 2), SentimentLabel::Neutral, 0.5)]);
        assert!(index.get("X", d(2024, 5, 3)).is_none());
        assert!(index.get("Y", d(2024, 5, 2)).is_none());
        assert!(index.get("X", d(2024, 5, 2)).is_some());
    }

    #[test]
    fn groups_do_not_mix_symbols_or_days() {
        let index = SentimentIndex::from_records(&[
            rec("X", d(2024, 5, 2), SentimentLabel::Positive, 1.0),
            rec("Y", d(2024, 5, 2), SentimentLabel::Negative, 0.2),
            rec("X", d(2024, 5, 3), SentimentLabel::Negative, 0.4),
        ]);
        assert_eq!(index.len(), 3);
        let x = index.get("X", d(2024, 5, 2)).unwrap();
        assert_eq!((x.positive_count, x.negative_count), (1, 0));
        assert_eq!(x.avg_confidence, 1.0);
    }
}
