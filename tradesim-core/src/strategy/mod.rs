//! Strategy capability and the built-in strategies.
//!
//! A strategy is any value implementing [`Strategy`]. The simulation owns it,
//! calls `on_init` once before the first bar, `on_bar` once per bar, and
//! `on_finish` after the last. Strategies only read: bars, indicators and
//! account state arrive through borrowed contexts that do not outlive the call.

pub mod accumulation;
pub mod config;
pub mod lump_sum;
pub mod ma_cross;

pub use accumulation::MonthlyAccumulation;
pub use config::{AccumulationParams, LumpSumParams, MaCrossParams, StrategyConfig};
pub use lump_sum::LumpSum;
pub use ma_cross::{MaCross, MaType};

use crate::broker::AccountSnapshot;
use crate::domain::{Bar, BarSeries, OrderIntent};
use crate::engine::EngineConfig;
use crate::error::EngineError;
use crate::indicators::{Indicator, IndicatorEngine, IndicatorId, IndicatorView};

/// Polymorphic per-bar decision unit.
pub trait Strategy: Send {
    /// Stable identifier used in reports (e.g. "ma_cross").
    fn name(&self) -> &str;

    /// Called once before the first bar. Register indicators here.
    fn on_init(&mut self, ctx: &mut InitContext<'_>) -> Result<(), EngineError> {
        let _ = ctx;
        Ok(())
    }

    /// Called once per bar, after indicators have consumed that bar.
    fn on_bar(&mut self, ctx: &BarContext<'_>) -> OrderIntent;

    /// Called once after the last bar and any force-close.
    fn on_finish(&mut self, ctx: &BarContext<'_>) {
        let _ = ctx;
    }
}

/// Setup access: the full series and indicator registration.
pub struct InitContext<'a> {
    series: &'a BarSeries,
    config: &'a EngineConfig,
    indicators: &'a mut IndicatorEngine,
}

impl<'a> InitContext<'a> {
    pub fn new(
        series: &'a BarSeries,
        config: &'a EngineConfig,
        indicators: &'a mut IndicatorEngine,
    ) -> Self {
        Self {
            series,
            config,
            indicators,
        }
    }

    pub fn series(&self) -> &BarSeries {
        self.series
    }

    pub fn config(&self) -> &EngineConfig {
        self.config
    }

    pub fn register(&mut self, indicator: Box<dyn Indicator>) -> IndicatorId {
        self.indicators.register(indicator)
    }
}

/// Everything a strategy may look at for bar `index`.
pub struct BarContext<'a> {
    pub index: usize,
    /// Bars `0..=index`.
    pub bars: &'a [Bar],
    pub indicators: IndicatorView<'a>,
    pub account: AccountSnapshot,
}

impl<'a> BarContext<'a> {
    /// The bar being processed.
    pub fn bar(&self) -> &'a Bar {
        &self.bars[self.index]
    }

    pub fn is_first_bar(&self) -> bool {
        self.index == 0
    }
}
