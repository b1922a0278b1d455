//! Serializable strategy selection.
//!
//! ```toml
//! [strategy]
//! type = "ma_cross"
//! fast_period = 10
//! slow_period = 20
//! ```

use serde::{Deserialize, Serialize};

use super::{LumpSum, MaCross, MaType, MonthlyAccumulation, Strategy};
use crate::error::EngineError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaCrossParams {
    pub fast_period: usize,
    pub slow_period: usize,
    pub ma_type: MaType,
    pub position_size: f64,
    pub enter_on_warmup_trend: bool,
}

impl Default for MaCrossParams {
    fn default() -> Self {
        Self {
            fast_period: 10,
            slow_period: 20,
            ma_type: MaType::Sma,
            position_size: 0.5,
            enter_on_warmup_trend: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccumulationParams {
    /// Cash spent on the first bar of each calendar month.
    pub investment: f64,
}

impl Default for AccumulationParams {
    fn default() -> Self {
        Self {
            investment: 1_000_000.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LumpSumParams {
    pub investment: f64,
}

impl Default for LumpSumParams {
    fn default() -> Self {
        Self {
            investment: 12_000_000.0,
        }
    }
}

/// Strategy variant plus its parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StrategyConfig {
    MaCross(MaCrossParams),
    MonthlyAccumulation(AccumulationParams),
    LumpSum(LumpSumParams),
}

impl Default for StrategyConfig {
    fn default() -> Self {
        StrategyConfig::MaCross(MaCrossParams::default())
    }
}

impl StrategyConfig {
    pub fn ma_cross(fast_period: usize, slow_period: usize) -> Self {
        StrategyConfig::MaCross(MaCrossParams {
            fast_period,
            slow_period,
            ..MaCrossParams::default()
        })
    }

    pub fn monthly_accumulation(investment: f64) -> Self {
        StrategyConfig::MonthlyAccumulation(AccumulationParams { investment })
    }

    pub fn lump_sum(investment: f64) -> Self {
        StrategyConfig::LumpSum(LumpSumParams { investment })
    }

    /// Variant identifier, matching the `type` tag.
    pub fn kind(&self) -> &'static str {
        match self {
            StrategyConfig::MaCross(_) => "ma_cross",
            StrategyConfig::MonthlyAccumulation(_) => "monthly_accumulation",
            StrategyConfig::LumpSum(_) => "lump_sum",
        }
    }

    /// Human-readable label including the key parameters.
    pub fn label(&self) -> String {
        match self {
            StrategyConfig::MaCross(p) => format!(
                "{} cross {}/{}",
                p.ma_type.prefix().to_uppercase(),
                p.fast_period,
                p.slow_period
            ),
            StrategyConfig::MonthlyAccumulation(p) => {
                format!("monthly accumulation {}", p.investment)
            }
            StrategyConfig::LumpSum(p) => format!("lump sum {}", p.investment),
        }
    }

    /// Check parameters without building anything.
    pub fn validate(&self) -> Result<(), EngineError> {
        self.build().map(|_| ())
    }

    pub fn build(&self) -> Result<Box<dyn Strategy>, EngineError> {
        Ok(match self {
            StrategyConfig::MaCross(p) => Box::new(
                MaCross::new(p.fast_period, p.slow_period, p.ma_type, p.position_size)?
                    .with_warmup_trend_entry(p.enter_on_warmup_trend),
            ),
            StrategyConfig::MonthlyAccumulation(p) => {
                Box::new(MonthlyAccumulation::new(p.investment)?)
            }
            StrategyConfig::LumpSum(p) => Box::new(LumpSum::new(p.investment)?),
        })
    }
}
