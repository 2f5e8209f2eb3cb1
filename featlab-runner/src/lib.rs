//! featlab runner: run files, snapshot loading, parallel assembly, export.
//!
//! This crate builds on `featlab-core` to provide:
//! - TOML run files naming the input tables and the output artifact
//! - Assembly on a dedicated rayon pool sized from the run file
//! - Pre-export audit of the assembled rows
//! - CSV/Parquet export and a JSON run manifest

pub mod config;
pub mod export;
pub mod runner;

pub use config::{ConfigError, OutputConfig, OutputFormat, RunConfig};
pub use export::{
    export_csv_string, read_manifest, to_dataframe, write_csv, write_manifest, write_matrix,
    write_parquet, ExportError,
};
pub use runner::{build_matrix, run_pipeline, BuiltMatrix, RunError, RunManifest, RunResult};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn config_types_are_send_sync() {
        assert_send::<RunConfig>();
        assert_sync::<RunConfig>();
        assert_send::<OutputFormat>();
        assert_sync::<OutputFormat>();
    }

    #[test]
    fn run_manifest_is_send_sync() {
        assert_send::<RunManifest>();
        assert_sync::<RunManifest>();
    }

    #[test]
    fn built_matrix_is_send_sync() {
        assert_send::<BuiltMatrix>();
        assert_sync::<BuiltMatrix>();
    }
}
