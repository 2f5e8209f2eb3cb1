//! featlab core: point-in-time feature matrix engine.
//!
//! This crate turns five independently updated sources into one
//! leakage-free training row per (symbol, prediction_date):
//! - As-of join engine over per-entity sorted timelines
//! - Fiscal-release resolver (statement period end → public release date)
//! - Wide pivot of economic indicator series
//! - Daily sentiment aggregation per classifier
//! - Feature assembler with a fixed-date train/test split
//! - Leakage audit over the assembled rows
//! - Parquet/CSV source ingestion

pub mod asof;
pub mod assembler;
pub mod audit;
pub mod config;
pub mod daily_sentiment;
pub mod data;
pub mod domain;
pub mod financial;
pub mod pivot;
pub mod resolver;
pub mod schema;
pub mod split;

pub use assembler::{build_feature_matrix, AssemblyStats, FactStore, FeatureAssembler, FeatureMatrix};
pub use audit::{audit_matrix, AuditError};
pub use config::{ConfigError, PipelineConfig, SentimentSource};
pub use schema::{FeatureSchema, FEATURE_SCHEMA_VERSION};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: shared run state is Send + Sync.
    ///
    /// The assembler fans out over a rayon pool; if any of these stops being
    /// shareable the build breaks here rather than at the call site.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<domain::PriceObservation>();
        require_sync::<domain::PriceObservation>();
        require_send::<domain::ResolvedStatement>();
        require_sync::<domain::ResolvedStatement>();
        require_send::<domain::EconomicSeriesPoint>();
        require_sync::<domain::EconomicSeriesPoint>();
        require_send::<domain::FeatureRow>();
        require_sync::<domain::FeatureRow>();

        require_send::<FactStore>();
        require_sync::<FactStore>();
        require_sync::<FeatureAssembler<'static>>();
        require_send::<FeatureMatrix>();
        require_sync::<FeatureMatrix>();
        require_sync::<PipelineConfig>();
        require_sync::<pivot::EconomicRow>();
    }

    #[test]
    fn default_output_matches_documented_width() {
        let config = PipelineConfig::default();
        config.validate().unwrap();
        // keys, target, stock, financial, economic, sentiment, split
        assert_eq!(FeatureSchema::from_config(&config).len(), 97);
    }
}
