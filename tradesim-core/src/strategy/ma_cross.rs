//! Dual moving average crossover.
//!
//! Buys when the fast MA crosses above the slow MA and exits when it crosses
//! back below. Long only, one position at a time.
//!
//! A strict crossover needs a defined previous bar on both averages, so a
//! trend already in place when the slow average warms up would otherwise never
//! be traded. With `enter_on_warmup_trend`, the first bar where both averages
//! are defined counts as a crossover if fast is already above slow.

use serde::{Deserialize, Serialize};

use super::{BarContext, InitContext, Strategy};
use crate::domain::{OrderIntent, Sizing};
use crate::error::EngineError;
use crate::indicators::{Ema, Indicator, IndicatorId, Sma};

/// Moving average type selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaType {
    #[default]
    Sma,
    Ema,
}

impl MaType {
    pub fn prefix(&self) -> &'static str {
        match self {
            MaType::Sma => "sma",
            MaType::Ema => "ema",
        }
    }

    fn build(&self, period: usize) -> Result<Box<dyn Indicator>, EngineError> {
        Ok(match self {
            MaType::Sma => Box::new(Sma::new(period)?),
            MaType::Ema => Box::new(Ema::new(period)?),
        })
    }
}

#[derive(Debug, Clone)]
pub struct MaCross {
    pub fast_period: usize,
    pub slow_period: usize,
    pub ma_type: MaType,
    /// Fraction of equity committed per entry.
    pub position_size: f64,
    pub enter_on_warmup_trend: bool,
    fast: Option<IndicatorId>,
    slow: Option<IndicatorId>,
    warmed_up: bool,
}

impl MaCross {
    pub fn new(
        fast_period: usize,
        slow_period: usize,
        ma_type: MaType,
        position_size: f64,
    ) -> Result<Self, EngineError> {
        if fast_period == 0 {
            return Err(EngineError::InvalidParameter(
                "fast_period must be >= 1".into(),
            ));
        }
        if slow_period <= fast_period {
            return Err(EngineError::InvalidParameter(format!(
                "slow_period ({slow_period}) must be greater than fast_period ({fast_period})"
            )));
        }
        if !Sizing::FractionOfEquity(position_size).is_valid() {
            return Err(EngineError::InvalidParameter(format!(
                "position_size must be in (0, 1], got {position_size}"
            )));
        }
        Ok(Self {
            fast_period,
            slow_period,
            ma_type,
            position_size,
            enter_on_warmup_trend: true,
            fast: None,
            slow: None,
            warmed_up: false,
        })
    }

    pub fn with_warmup_trend_entry(mut self, enabled: bool) -> Self {
        self.enter_on_warmup_trend = enabled;
        self
    }

    pub fn fast_key(&self) -> String {
        format!("{}_{}", self.ma_type.prefix(), self.fast_period)
    }

    pub fn slow_key(&self) -> String {
        format!("{}_{}", self.ma_type.prefix(), self.slow_period)
    }
}

impl Strategy for MaCross {
    fn name(&self) -> &str {
        "ma_cross"
    }

    fn on_init(&mut self, ctx: &mut InitContext<'_>) -> Result<(), EngineError> {
        self.fast = Some(ctx.register(self.ma_type.build(self.fast_period)?));
        self.slow = Some(ctx.register(self.ma_type.build(self.slow_period)?));
        self.warmed_up = false;
        Ok(())
    }

    fn on_bar(&mut self, ctx: &BarContext<'_>) -> OrderIntent {
        let (Some(fast), Some(slow)) = (self.fast, self.slow) else {
            return OrderIntent::Hold;
        };
        let view = &ctx.indicators;
        let (Some(fast_now), Some(slow_now)) = (view.value(fast), view.value(slow)) else {
            return OrderIntent::Hold;
        };

        let first_defined_bar = !self.warmed_up;
        self.warmed_up = true;

        if ctx.account.is_flat() {
            let crossed = view.crossed_over(fast, slow);
            let warmup_trend = self.enter_on_warmup_trend && first_defined_bar && fast_now > slow_now;
            if crossed || warmup_trend {
                return OrderIntent::Buy(Sizing::FractionOfEquity(self.position_size));
            }
        } else if view.crossed_under(fast, slow) {
            return OrderIntent::Exit;
        }

        OrderIntent::Hold
    }
}
