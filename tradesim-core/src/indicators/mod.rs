//! Indicator engine: incremental rolling statistics aligned with the bar series.
//!
//! Indicators are fed one bar at a time as the simulation advances. Each one
//! reports `None` until its warm-up window is full; strategies treat `None` as
//! "no signal", never as zero.
//!
//! The same indicators can also be run over a whole series up front with
//! [`precompute`], producing an immutable [`IndicatorSet`] that concurrent
//! runs may share by reference.

pub mod crossover;
pub mod ema;
pub mod engine;
pub mod sma;

pub use crossover::{crossover, crossunder};
pub use ema::Ema;
pub use engine::{
    precompute, IndicatorEngine, IndicatorId, IndicatorSeries, IndicatorSet, IndicatorView,
};
pub use sma::Sma;

use crate::domain::Bar;

/// Incremental indicator.
///
/// # Look-ahead contamination guard
/// `update` receives bars strictly in order and sees each bar once. The value
/// it returns for bar t may only depend on bars 0..=t.
pub trait Indicator: Send + Sync {
    /// Stable name (e.g. "sma_20"). Two indicators with the same name are
    /// treated as the same series by the engine.
    fn name(&self) -> &str;

    /// Number of bars before the first defined value.
    fn lookback(&self) -> usize;

    /// Consume the next bar and return the value at that bar, if defined.
    fn update(&mut self, bar: &Bar) -> Option<f64>;

    /// Drop all accumulated state.
    fn reset(&mut self);

    /// Reset, then feed every bar. Returns one value per bar.
    fn compute(&mut self, bars: &[Bar]) -> Vec<Option<f64>> {
        self.reset();
        bars.iter().map(|bar| self.update(bar)).collect()
    }
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
