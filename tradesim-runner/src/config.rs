//! Backtest configuration files.
//!
//! ```toml
//! [backtest]
//! symbol = "AAPL"
//! data_path = "data/aapl.csv"   # omit for synthetic bars
//! start_date = "2022-01-01"
//! end_date = "2023-01-01"
//! initial_cash = 10000.0
//! commission_rate = 0.002
//! fill_policy = "at_close"
//!
//! [strategy]
//! type = "ma_cross"
//! fast_period = 10
//! slow_period = 20
//! ```

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tradesim_core::engine::{EngineConfig, FillPolicy};
use tradesim_core::StrategyConfig;

use crate::data_loader::{LoadOptions, MIN_DATA_POINTS};

/// Unique identifier for a backtest run (content-addressable hash).
pub type RunId = String;

const MAX_SYMBOL_LEN: usize = 10;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// A complete, reproducible backtest description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfig {
    pub backtest: BacktestSection,
    #[serde(default)]
    pub strategy: StrategyConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestSection {
    pub symbol: String,
    /// CSV file with the bars. Synthetic bars are generated when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_path: Option<PathBuf>,
    /// Seed for synthetic bars.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synthetic_seed: Option<u64>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default = "default_initial_cash")]
    pub initial_cash: f64,
    #[serde(default = "default_commission_rate")]
    pub commission_rate: f64,
    #[serde(default)]
    pub fill_policy: FillPolicy,
    #[serde(default = "default_lot_size")]
    pub lot_size: f64,
    #[serde(default = "default_close_at_end")]
    pub close_at_end: bool,
    #[serde(default = "default_min_bars")]
    pub min_bars: usize,
}

fn default_initial_cash() -> f64 {
    EngineConfig::default().initial_cash
}

fn default_commission_rate() -> f64 {
    EngineConfig::default().commission_rate
}

fn default_lot_size() -> f64 {
    EngineConfig::default().lot_size
}

fn default_close_at_end() -> bool {
    true
}

fn default_min_bars() -> usize {
    MIN_DATA_POINTS
}

impl BacktestConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    /// Parse, normalize the symbol to upper case, and validate.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let mut config: BacktestConfig = toml::from_str(text)?;
        config.backtest.symbol = config.backtest.symbol.trim().to_uppercase();
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let b = &self.backtest;
        if b.symbol.is_empty()
            || b.symbol.len() > MAX_SYMBOL_LEN
            || !b.symbol.chars().all(|c| c.is_ascii_alphabetic())
        {
            return Err(ConfigError::Invalid(format!(
                "symbol must be 1-{MAX_SYMBOL_LEN} ASCII letters, got '{}'",
                b.symbol
            )));
        }
        if b.end_date < b.start_date {
            return Err(ConfigError::Invalid(format!(
                "end_date {} precedes start_date {}",
                b.end_date, b.start_date
            )));
        }
        if b.min_bars == 0 {
            return Err(ConfigError::Invalid("min_bars must be at least 1".into()));
        }
        self.engine_config()
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        self.strategy
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        Ok(())
    }

    pub fn engine_config(&self) -> EngineConfig {
        let b = &self.backtest;
        EngineConfig {
            initial_cash: b.initial_cash,
            commission_rate: b.commission_rate,
            fill_policy: b.fill_policy,
            lot_size: b.lot_size,
            close_at_end: b.close_at_end,
        }
    }

    pub fn load_options(&self) -> LoadOptions {
        LoadOptions::new(self.backtest.start_date, self.backtest.end_date)
            .with_min_bars(self.backtest.min_bars)
    }

    /// Deterministic BLAKE3 hash of the configuration.
    ///
    /// Two runs with identical configs share a RunId.
    pub fn run_id(&self) -> Result<RunId, serde_json::Error> {
        let json = serde_json::to_string(self)?;
        Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tradesim_core::strategy::MaType;

    const MINIMAL: &str = r#"
[backtest]
symbol = "aapl"
start_date = "2022-01-01"
end_date = "2023-01-01"
"#;

    #[test]
    fn minimal_config_uses_defaults() {
        let config = BacktestConfig::from_toml(MINIMAL).unwrap();
        assert_eq!(config.backtest.symbol, "AAPL");
        assert_eq!(config.backtest.initial_cash, 10_000.0);
        assert_eq!(config.backtest.commission_rate, 0.002);
        assert_eq!(config.backtest.fill_policy, FillPolicy::AtClose);
        assert_eq!(config.backtest.min_bars, 50);
        assert!(config.backtest.close_at_end);
        assert!(config.backtest.data_path.is_none());
        assert_eq!(config.strategy, StrategyConfig::default());
    }

    #[test]
    fn full_config_parses() {
        let text = r#"
[backtest]
symbol = "SPY"
data_path = "data/spy.csv"
start_date = "2020-01-01"
end_date = "2020-12-31"
initial_cash = 50000.0
commission_rate = 0.0
fill_policy = "next_open"
lot_size = 10.0
close_at_end = false
min_bars = 100

[strategy]
type = "ma_cross"
fast_period = 5
slow_period = 30
ma_type = "ema"
"#;
        let config = BacktestConfig::from_toml(text).unwrap();
        let engine = config.engine_config();
        assert_eq!(engine.initial_cash, 50_000.0);
        assert_eq!(engine.fill_policy, FillPolicy::NextOpen);
        assert_eq!(engine.lot_size, 10.0);
        assert!(!engine.close_at_end);
        assert_eq!(config.load_options().min_bars, 100);

        let StrategyConfig::MaCross(params) = &config.strategy else {
            panic!("expected ma_cross, got {:?}", config.strategy);
        };
        assert_eq!((params.fast_period, params.slow_period), (5, 30));
        assert_eq!(params.ma_type, MaType::Ema);
        assert_eq!(params.position_size, 0.5);
    }

    #[test]
    fn strategy_type_only_takes_parameter_defaults() {
        let text = format!("{MINIMAL}\n[strategy]\ntype = \"lump_sum\"\n");
        let config = BacktestConfig::from_toml(&text).unwrap();
        assert_eq!(config.strategy, StrategyConfig::lump_sum(12_000_000.0));
    }

    #[test]
    fn inverted_dates_rejected() {
        let text = r#"
[backtest]
symbol = "SPY"
start_date = "2023-01-01"
end_date = "2022-01-01"
"#;
        let err = BacktestConfig::from_toml(text).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        assert!(err.to_string().contains("precedes"));
    }

    #[test]
    fn bad_symbol_rejected() {
        for symbol in ["", "SPY1", "TOOLONGSYMBOL"] {
            let text = format!(
                "[backtest]\nsymbol = \"{symbol}\"\nstart_date = \"2022-01-01\"\nend_date = \"2022-02-01\"\n"
            );
            assert!(
                matches!(BacktestConfig::from_toml(&text), Err(ConfigError::Invalid(_))),
                "{symbol}"
            );
        }
    }

    #[test]
    fn engine_and_strategy_parameters_validated() {
        let text = format!("{MINIMAL}\n[strategy]\ntype = \"ma_cross\"\nfast_period = 30\nslow_period = 10\n");
        assert!(matches!(
            BacktestConfig::from_toml(&text),
            Err(ConfigError::Invalid(_))
        ));

        let text = MINIMAL.replace("end_date", "commission_rate = 1.5\nend_date");
        assert!(matches!(
            BacktestConfig::from_toml(&text),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn unknown_strategy_is_parse_error() {
        let text = format!("{MINIMAL}\n[strategy]\ntype = \"martingale\"\n");
        assert!(matches!(
            BacktestConfig::from_toml(&text),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn run_id_deterministic_and_sensitive() {
        let a = BacktestConfig::from_toml(MINIMAL).unwrap();
        let mut b = a.clone();
        assert_eq!(a.run_id().unwrap(), b.run_id().unwrap());

        b.strategy = StrategyConfig::ma_cross(20, 50);
        assert_ne!(a.run_id().unwrap(), b.run_id().unwrap());
        assert_eq!(a.run_id().unwrap().len(), 64);
    }

    #[test]
    fn toml_round_trip() {
        let config = BacktestConfig::from_toml(MINIMAL).unwrap();
        let text = config.to_toml().unwrap();
        assert_eq!(BacktestConfig::from_toml(&text).unwrap(), config);
    }
}
