//! Per-article news sentiment records.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Classifier output label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SentimentLabel {
    Positive,
    Neutral,
    Negative,
}

impl SentimentLabel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Neutral => "neutral",
            Self::Negative => "negative",
        }
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown sentiment label '{0}'")]
pub struct UnknownSentimentLabel(pub String);

impl FromStr for SentimentLabel {
    type Err = UnknownSentimentLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "positive" | "pos" => Ok(Self::Positive),
            "neutral" | "neu" => Ok(Self::Neutral),
            "negative" | "neg" => Ok(Self::Negative),
            other => Err(UnknownSentimentLabel(other.to_string())),
        }
    }
}

/// One classified article. `news_date` is the publish date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsSentimentRecord {
    pub symbol: String,
    pub news_date: NaiveDate,
    pub sentiment_label: SentimentLabel,
    pub confidence: f64,
}
