//! Domain types for the five input sources and the output row.

pub mod economic;
pub mod fundamentals;
pub mod price;
pub mod row;
pub mod sentiment;

pub use economic::EconomicSeriesPoint;
pub use fundamentals::{
    EarningsReleaseEvent, FiscalStatement, ResolvedStatement, StatementType, UnknownStatementType,
};
pub use price::{feature_date_for, PriceObservation};
pub use row::{FeatureRow, Provenance, StockFeatures};
pub use sentiment::{NewsSentimentRecord, SentimentLabel, UnknownSentimentLabel};

