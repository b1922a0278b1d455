//! Backtest runner: wires together data loading, the engine, and analysis.
//!
//! Entry points:
//! - `run_single_backtest()`: loads data for a `BacktestConfig`, then runs. Used by the CLI.
//! - `run_backtest_from_data()`: takes a pre-loaded series. No I/O.
//! - `compare()`: runs several strategies over one series in parallel.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use tradesim_core::data::BarSource;
use tradesim_core::domain::BarSeries;
use tradesim_core::engine::{run_backtest, EngineConfig};
use tradesim_core::{EngineError, Report, StrategyConfig};

use crate::config::{BacktestConfig, ConfigError, RunId};
use crate::data_loader::{load_series, CsvSource, LoadError, LoadedData, SyntheticSource};

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
    #[error("failed to fingerprint run: {0}")]
    Fingerprint(#[from] serde_json::Error),
}

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// Initial cash for comparisons, matching the default lump-sum investment.
pub const COMPARISON_CASH: f64 = 12_000_000.0;

/// A report plus where it came from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestResult {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub run_id: RunId,
    pub dataset_hash: String,
    /// Whether the bars were generated rather than loaded.
    pub synthetic: bool,
    pub report: Report,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Load the configured data and run the configured strategy.
///
/// Bars come from `data_path` when set, otherwise from a `SyntheticSource`.
pub fn run_single_backtest(config: &BacktestConfig) -> Result<BacktestResult, RunError> {
    config.validate()?;
    let run_id = config.run_id()?;
    let loaded = load_for_config(config)?;
    let report = run_backtest_from_data(&loaded.series, &config.strategy, &config.engine_config())?;

    Ok(BacktestResult {
        schema_version: SCHEMA_VERSION,
        run_id,
        dataset_hash: loaded.dataset_hash,
        synthetic: loaded.synthetic,
        report,
    })
}

/// Resolve the data source named by `config` and load through it.
pub fn load_for_config(config: &BacktestConfig) -> Result<LoadedData, RunError> {
    let b = &config.backtest;
    let opts = config.load_options();
    let loaded = match &b.data_path {
        Some(path) => {
            let source = CsvSource::open(&b.symbol, path)?;
            load_series(&source, &b.symbol, &opts, false)?
        }
        None => {
            let source = SyntheticSource::new(b.synthetic_seed.unwrap_or_default());
            load_series(&source, &b.symbol, &opts, true)?
        }
    };
    Ok(loaded)
}

/// Run one strategy over a pre-loaded series.
pub fn run_backtest_from_data(
    series: &BarSeries,
    strategy: &StrategyConfig,
    engine_config: &EngineConfig,
) -> Result<Report, RunError> {
    Ok(run_backtest(series, strategy, engine_config)?)
}

/// Fetch through any `BarSource` and run.
pub fn run_with_source(
    source: &dyn BarSource,
    config: &BacktestConfig,
) -> Result<Report, RunError> {
    let loaded = load_series(source, &config.backtest.symbol, &config.load_options(), false)?;
    run_backtest_from_data(&loaded.series, &config.strategy, &config.engine_config())
}

// ─── Comparison ─────────────────────────────────────────────────────

/// One strategy's outcome in a comparison, rounded to cents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonRow {
    pub label: String,
    pub strategy: String,
    pub final_value: f64,
    pub profit: f64,
    pub roi_pct: f64,
    pub trades: usize,
}

impl ComparisonRow {
    fn from_report(strategy: &StrategyConfig, report: &Report) -> Self {
        let initial = report.meta.initial_cash;
        let final_value = report.final_equity();
        let profit = final_value - initial;
        Self {
            label: strategy.label(),
            strategy: strategy.kind().to_string(),
            final_value: round2(final_value),
            profit: round2(profit),
            roi_pct: round2(profit / initial * 100.0),
            trades: report.summary.total_trades,
        }
    }
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Crossover 10/30, monthly accumulation of 1,000,000, lump sum of 12,000,000.
pub fn default_comparison_set() -> Vec<StrategyConfig> {
    vec![
        StrategyConfig::ma_cross(10, 30),
        StrategyConfig::monthly_accumulation(1_000_000.0),
        StrategyConfig::lump_sum(12_000_000.0),
    ]
}

/// Engine settings for comparisons: `COMPARISON_CASH`, no commission.
pub fn comparison_engine_config() -> EngineConfig {
    EngineConfig::frictionless(COMPARISON_CASH)
}

/// Run every strategy over the same series in parallel.
///
/// Each run owns its own broker and indicators; only the series is shared.
/// Rows come back in the order of `strategies`. The first error aborts.
pub fn compare(
    series: &BarSeries,
    strategies: &[StrategyConfig],
    engine_config: &EngineConfig,
) -> Result<Vec<ComparisonRow>, RunError> {
    let rows = strategies
        .par_iter()
        .map(|strategy| {
            let report = run_backtest(series, strategy, engine_config)?;
            Ok(ComparisonRow::from_report(strategy, &report))
        })
        .collect::<Result<Vec<_>, RunError>>()?;

    info!(
        symbol = series.symbol(),
        strategies = rows.len(),
        "comparison completed"
    );
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tradesim_core::domain::Bar;

    fn rising_series(n: usize) -> BarSeries {
        let start = NaiveDate::from_ymd_opt(2022, 1, 3).unwrap();
        let bars = (0..n)
            .map(|i| {
                let close = 100.0 + i as f64;
                Bar {
                    timestamp: (start + chrono::Duration::days(i as i64))
                        .and_hms_opt(0, 0, 0)
                        .unwrap(),
                    open: close - 0.5,
                    high: close + 1.0,
                    low: close - 1.5,
                    close,
                    volume: 1_000,
                }
            })
            .collect();
        BarSeries::new("TEST", bars).unwrap()
    }

    #[test]
    fn default_set_matches_reference_parameters() {
        let set = default_comparison_set();
        assert_eq!(set.len(), 3);
        assert_eq!(set[0], StrategyConfig::ma_cross(10, 30));
        assert_eq!(set[2].kind(), "lump_sum");
        assert_eq!(comparison_engine_config().initial_cash, 12_000_000.0);
        assert_eq!(comparison_engine_config().commission_rate, 0.0);
    }

    #[test]
    fn compare_preserves_order_and_rounds() {
        let series = rising_series(120);
        let rows = compare(&series, &default_comparison_set(), &comparison_engine_config()).unwrap();

        let kinds: Vec<&str> = rows.iter().map(|r| r.strategy.as_str()).collect();
        assert_eq!(kinds, vec!["ma_cross", "monthly_accumulation", "lump_sum"]);
        for row in &rows {
            assert_eq!(row.final_value, round2(row.final_value));
            assert!((row.profit - (row.final_value - COMPARISON_CASH)).abs() < 0.011);
        }
        // A strictly rising market rewards every long strategy.
        assert!(rows.iter().all(|r| r.profit > 0.0));
    }

    #[test]
    fn compare_is_deterministic() {
        let series = rising_series(80);
        let strategies = default_comparison_set();
        let config = comparison_engine_config();
        assert_eq!(
            compare(&series, &strategies, &config).unwrap(),
            compare(&series, &strategies, &config).unwrap()
        );
    }

    #[test]
    fn compare_propagates_invalid_strategy() {
        let series = rising_series(60);
        let strategies = vec![StrategyConfig::ma_cross(30, 10)];
        let err = compare(&series, &strategies, &comparison_engine_config()).unwrap_err();
        assert!(matches!(err, RunError::Engine(EngineError::InvalidParameter(_))));
    }

    #[test]
    fn single_backtest_on_synthetic_data() {
        let config = BacktestConfig::from_toml(
            r#"
[backtest]
symbol = "SYN"
synthetic_seed = 42
start_date = "2023-01-01"
end_date = "2023-12-31"
"#,
        )
        .unwrap();
        let result = run_single_backtest(&config).unwrap();
        assert!(result.synthetic);
        assert_eq!(result.schema_version, SCHEMA_VERSION);
        assert_eq!(result.run_id, config.run_id().unwrap());
        assert_eq!(result.report.meta.symbol, "SYN");
        assert_eq!(result.report.equity_curve.len(), result.report.meta.bar_count);
    }
}
