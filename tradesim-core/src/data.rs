//! Market-data provider contract.
//!
//! The engine never fetches prices itself. A `BarSource` hands it a
//! validated series for a symbol and date range, or fails with
//! `NoDataAvailable` when the range is empty.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::domain::{Bar, BarSeries};
use crate::error::EngineError;

pub trait BarSource: Send + Sync {
    /// Bars for `symbol` with dates in `[start, end]`, inclusive.
    fn fetch(&self, symbol: &str, start: NaiveDate, end: NaiveDate)
        -> Result<BarSeries, EngineError>;
}

/// Bars held in memory, keyed by symbol.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    bars: BTreeMap<String, Vec<Bar>>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, symbol: impl Into<String>, bars: Vec<Bar>) {
        self.bars.insert(symbol.into(), bars);
    }

    pub fn with(mut self, symbol: impl Into<String>, bars: Vec<Bar>) -> Self {
        self.insert(symbol, bars);
        self
    }
}

impl BarSource for InMemorySource {
    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<BarSeries, EngineError> {
        if end < start {
            return Err(EngineError::InvalidParameter(format!(
                "end date {end} precedes start date {start}"
            )));
        }
        let bars: Vec<Bar> = self
            .bars
            .get(symbol)
            .map(|bars| {
                bars.iter()
                    .filter(|b| {
                        let date = b.timestamp.date();
                        date >= start && date <= end
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        BarSeries::new(symbol, bars)
    }
}
