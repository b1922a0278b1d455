//! Per-run engine configuration.

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Where a market order fills. Fixed for the whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillPolicy {
    /// Close of the bar that produced the signal. Optimistic: the signal and
    /// the fill see the same price.
    #[default]
    AtClose,
    /// Open of the following bar.
    NextOpen,
}

impl FillPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            FillPolicy::AtClose => "at_close",
            FillPolicy::NextOpen => "next_open",
        }
    }
}

impl std::fmt::Display for FillPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FillPolicy {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "at_close" | "close" => Ok(FillPolicy::AtClose),
            "next_open" | "open" => Ok(FillPolicy::NextOpen),
            other => Err(EngineError::InvalidParameter(format!(
                "unknown fill policy '{other}' (expected at_close or next_open)"
            ))),
        }
    }
}

/// Configuration for a single simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub initial_cash: f64,
    /// Fraction of notional charged on every fill, entry and exit.
    pub commission_rate: f64,
    pub fill_policy: FillPolicy,
    /// Quantities are floored to a multiple of this.
    pub lot_size: f64,
    /// Force-close an open position at the last bar's close.
    pub close_at_end: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            initial_cash: 10_000.0,
            commission_rate: 0.002,
            fill_policy: FillPolicy::AtClose,
            lot_size: 1.0,
            close_at_end: true,
        }
    }
}

impl EngineConfig {
    pub fn new(initial_cash: f64) -> Self {
        Self {
            initial_cash,
            ..Self::default()
        }
    }

    /// Zero commission, fills at close.
    pub fn frictionless(initial_cash: f64) -> Self {
        Self {
            initial_cash,
            commission_rate: 0.0,
            ..Self::default()
        }
    }

    pub fn with_commission(mut self, rate: f64) -> Self {
        self.commission_rate = rate;
        self
    }

    pub fn with_fill_policy(mut self, policy: FillPolicy) -> Self {
        self.fill_policy = policy;
        self
    }

    pub fn with_lot_size(mut self, lot_size: f64) -> Self {
        self.lot_size = lot_size;
        self
    }

    pub fn with_close_at_end(mut self, close_at_end: bool) -> Self {
        self.close_at_end = close_at_end;
        self
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if !self.initial_cash.is_finite() || self.initial_cash <= 0.0 {
            return Err(EngineError::InvalidParameter(format!(
                "initial_cash must be finite and > 0, got {}",
                self.initial_cash
            )));
        }
        if !(0.0..1.0).contains(&self.commission_rate) {
            return Err(EngineError::InvalidParameter(format!(
                "commission_rate must be in [0, 1), got {}",
                self.commission_rate
            )));
        }
        if !self.lot_size.is_finite() || self.lot_size <= 0.0 {
            return Err(EngineError::InvalidParameter(format!(
                "lot_size must be finite and > 0, got {}",
                self.lot_size
            )));
        }
        Ok(())
    }
}
