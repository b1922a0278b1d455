//! Indicator engine, per-bar views, and precomputed sets.

use serde::Serialize;

use super::crossover::crossover;
use super::Indicator;
use crate::domain::{Bar, BarSeries};

/// Handle to a registered indicator series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct IndicatorId(usize);

impl IndicatorId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Values of one indicator, aligned 1:1 with the bars seen so far.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorSeries {
    name: String,
    lookback: usize,
    values: Vec<Option<f64>>,
}

impl IndicatorSeries {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn lookback(&self) -> usize {
        self.lookback
    }

    pub fn values(&self) -> &[Option<f64>] {
        &self.values
    }

    /// Value at bar `index`; `None` during warm-up or past the end.
    pub fn get(&self, index: usize) -> Option<f64> {
        self.values.get(index).copied().flatten()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Owns every indicator registered for a run and advances them bar by bar.
#[derive(Default)]
pub struct IndicatorEngine {
    indicators: Vec<Box<dyn Indicator>>,
    series: Vec<IndicatorSeries>,
    bars_seen: usize,
}

impl std::fmt::Debug for IndicatorEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndicatorEngine")
            .field("series", &self.names())
            .field("bars_seen", &self.bars_seen)
            .finish()
    }
}

impl IndicatorEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an indicator. An indicator whose name is already registered
    /// is dropped and the existing handle is returned.
    ///
    /// Indicators registered after bars have been fed start with `None` for
    /// the bars they missed.
    pub fn register(&mut self, indicator: Box<dyn Indicator>) -> IndicatorId {
        if let Some(id) = self.id_of(indicator.name()) {
            return id;
        }
        let id = IndicatorId(self.series.len());
        self.series.push(IndicatorSeries {
            name: indicator.name().to_string(),
            lookback: indicator.lookback(),
            values: vec![None; self.bars_seen],
        });
        self.indicators.push(indicator);
        id
    }

    pub fn id_of(&self, name: &str) -> Option<IndicatorId> {
        self.series
            .iter()
            .position(|s| s.name == name)
            .map(IndicatorId)
    }

    /// Feed the next bar to every indicator.
    pub fn advance(&mut self, bar: &Bar) {
        for (indicator, series) in self.indicators.iter_mut().zip(self.series.iter_mut()) {
            series.values.push(indicator.update(bar));
        }
        self.bars_seen += 1;
    }

    /// Read-only view of everything computed so far.
    pub fn view(&self) -> IndicatorView<'_> {
        IndicatorView {
            series: &self.series,
            visible: self.bars_seen,
        }
    }

    pub fn series(&self, id: IndicatorId) -> Option<&IndicatorSeries> {
        self.series.get(id.0)
    }

    pub fn bars_seen(&self) -> usize {
        self.bars_seen
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.series.iter().map(|s| s.name.as_str()).collect()
    }

    /// Freeze the computed series.
    pub fn into_set(self) -> IndicatorSet {
        IndicatorSet {
            series: self.series,
            len: self.bars_seen,
        }
    }
}

/// Indicator values restricted to bars `0..visible`.
///
/// This is the only way strategies see indicators, so a value past the
/// current bar is unreachable.
#[derive(Debug, Clone, Copy)]
pub struct IndicatorView<'a> {
    series: &'a [IndicatorSeries],
    visible: usize,
}

impl<'a> IndicatorView<'a> {
    /// Index of the current bar, or `None` before the first bar.
    pub fn current_index(&self) -> Option<usize> {
        self.visible.checked_sub(1)
    }

    pub fn id_of(&self, name: &str) -> Option<IndicatorId> {
        self.series
            .iter()
            .position(|s| s.name == name)
            .map(IndicatorId)
    }

    /// Value at the current bar.
    pub fn value(&self, id: IndicatorId) -> Option<f64> {
        self.current_index().and_then(|i| self.value_at(id, i))
    }

    /// Value at the bar before the current one.
    pub fn previous(&self, id: IndicatorId) -> Option<f64> {
        self.current_index()
            .and_then(|i| i.checked_sub(1))
            .and_then(|i| self.value_at(id, i))
    }

    /// Value at any already-visible bar.
    pub fn value_at(&self, id: IndicatorId, index: usize) -> Option<f64> {
        if index >= self.visible {
            return None;
        }
        self.series.get(id.0).and_then(|s| s.get(index))
    }

    /// Visible history of one indicator.
    pub fn history(&self, id: IndicatorId) -> &'a [Option<f64>] {
        match self.series.get(id.0) {
            Some(s) => &s.values[..self.visible.min(s.values.len())],
            None => &[],
        }
    }

    /// `a` crossed strictly above `b` at the current bar.
    pub fn crossed_over(&self, a: IndicatorId, b: IndicatorId) -> bool {
        match self.current_index() {
            Some(i) => crossover(self.history(a), self.history(b), i),
            None => false,
        }
    }

    /// `a` crossed strictly below `b` at the current bar.
    pub fn crossed_under(&self, a: IndicatorId, b: IndicatorId) -> bool {
        self.crossed_over(b, a)
    }
}

/// Immutable, fully computed indicator series for one bar series.
///
/// Shareable across threads; each run takes its own bounded view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorSet {
    series: Vec<IndicatorSeries>,
    len: usize,
}

impl IndicatorSet {
    /// View of bars `0..=index`.
    pub fn view_at(&self, index: usize) -> IndicatorView<'_> {
        IndicatorView {
            series: &self.series,
            visible: (index + 1).min(self.len),
        }
    }

    pub fn id_of(&self, name: &str) -> Option<IndicatorId> {
        self.view_at(0).id_of(name)
    }

    pub fn series(&self, id: IndicatorId) -> Option<&IndicatorSeries> {
        self.series.get(id.0)
    }

    /// Number of bars covered.
    pub fn bar_count(&self) -> usize {
        self.len
    }
}

/// Run `indicators` over the whole series.
pub fn precompute(series: &BarSeries, indicators: Vec<Box<dyn Indicator>>) -> IndicatorSet {
    let mut engine = IndicatorEngine::new();
    for indicator in indicators {
        engine.register(indicator);
    }
    for bar in series.bars() {
        engine.advance(bar);
    }
    engine.into_set()
}
