//! TradeSim Core: deterministic single-asset, bar-by-bar backtesting engine.
//!
//! This crate contains the engine and nothing that does I/O:
//! - Domain types (bars, validated series, orders, fills, positions, trades)
//! - Incremental indicator engine with warm-up aware views
//! - Broker with cash/position bookkeeping and commission on both legs
//! - Strategy capability plus crossover, monthly accumulation and lump-sum
//! - Simulation state machine with explicit fill policy and force-close
//! - Performance analysis, drawdown periods, and a sanitized report

pub mod analysis;
pub mod broker;
pub mod data;
pub mod domain;
pub mod engine;
pub mod error;
pub mod indicators;
pub mod strategy;

pub use analysis::Report;
pub use domain::{Bar, BarSeries};
pub use engine::{run_backtest, EngineConfig, FillPolicy, Simulation};
pub use error::EngineError;
pub use strategy::{Strategy, StrategyConfig};
