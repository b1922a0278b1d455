//! TradeSim Runner: backtest orchestration on top of `tradesim-core`.
//!
//! This crate provides:
//! - TOML backtest configuration with validation and a content-addressed run id
//! - Data loading from CSV files or a seeded synthetic random walk
//! - Single-backtest runner and parallel strategy comparison
//! - JSON, CSV and text artifact export
//! - Run fingerprinting

pub mod config;
pub mod data_loader;
pub mod export;
pub mod fingerprint;
pub mod runner;

pub use config::{BacktestConfig, BacktestSection, ConfigError, RunId};
pub use data_loader::{
    load_series, CsvSource, LoadError, LoadOptions, LoadedData, SyntheticSource, MIN_DATA_POINTS,
};
pub use export::{save_artifacts, ReportRenderer};
pub use fingerprint::{report_digest, Fingerprint};
pub use runner::{
    compare, comparison_engine_config, default_comparison_set, run_backtest_from_data,
    run_single_backtest, BacktestResult, ComparisonRow, RunError,
};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn config_types_are_send_sync() {
        assert_send::<BacktestConfig>();
        assert_sync::<BacktestConfig>();
        assert_send::<LoadOptions>();
        assert_sync::<LoadOptions>();
    }

    #[test]
    fn sources_are_send_sync() {
        assert_send::<CsvSource>();
        assert_sync::<CsvSource>();
        assert_send::<SyntheticSource>();
        assert_sync::<SyntheticSource>();
    }

    #[test]
    fn results_are_send_sync() {
        assert_send::<BacktestResult>();
        assert_sync::<BacktestResult>();
        assert_send::<ComparisonRow>();
        assert_sync::<ComparisonRow>();
        assert_send::<RunError>();
        assert_sync::<RunError>();
    }
}
