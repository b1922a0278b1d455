//! BarSeries: validated, immutable price history for one instrument.

use chrono::NaiveDateTime;
use serde::Serialize;

use super::bar::Bar;
use crate::error::EngineError;

/// Ordered bars with strictly increasing timestamps.
///
/// Construction validates every bar and fails on the first violation; bars
/// are never reordered or dropped. Once built the series is read-only and can
/// be shared by reference across concurrent runs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarSeries {
    symbol: String,
    bars: Vec<Bar>,
}

impl BarSeries {
    pub fn new(symbol: impl Into<String>, bars: Vec<Bar>) -> Result<Self, EngineError> {
        let symbol = symbol.into();
        if bars.is_empty() {
            return Err(EngineError::NoDataAvailable { symbol });
        }

        for (index, bar) in bars.iter().enumerate() {
            bar.validate()
                .map_err(|reason| EngineError::InvalidBarData { index, reason })?;

            if index > 0 {
                let prev = bars[index - 1].timestamp;
                if bar.timestamp <= prev {
                    return Err(EngineError::InvalidBarData {
                        index,
                        reason: format!(
                            "timestamp {} not after previous {}",
                            bar.timestamp, prev
                        ),
                    });
                }
            }
        }

        Ok(Self { symbol, bars })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Bounds-checked access.
    pub fn get(&self, index: usize) -> Result<&Bar, EngineError> {
        self.bars.get(index).ok_or(EngineError::IndexOutOfRange {
            index,
            len: self.bars.len(),
        })
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    /// Always false for a constructed series; kept for API symmetry.
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn first(&self) -> &Bar {
        &self.bars[0]
    }

    pub fn last(&self) -> &Bar {
        &self.bars[self.bars.len() - 1]
    }

    pub fn start(&self) -> NaiveDateTime {
        self.first().timestamp
    }

    pub fn end(&self) -> NaiveDateTime {
        self.last().timestamp
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::make_bars;

    #[test]
    fn accepts_valid_bars() {
        let series = BarSeries::new("SPY", make_bars(&[10.0, 11.0, 12.0])).unwrap();
        assert_eq!(series.len(), 3);
        assert_eq!(series.symbol(), "SPY");
        assert_eq!(series.closes(), vec![10.0, 11.0, 12.0]);
        assert!(series.start() < series.end());
    }

    #[test]
    fn empty_input_is_no_data() {
        let err = BarSeries::new("SPY", vec![]).unwrap_err();
        assert_eq!(
            err,
            EngineError::NoDataAvailable {
                symbol: "SPY".into()
            }
        );
    }

    #[test]
    fn names_first_invalid_bar() {
        let mut bars = make_bars(&[10.0, 11.0, 12.0, 13.0]);
        bars[2].high = bars[2].low - 1.0;
        bars[3].close = f64::NAN;
        match BarSeries::new("SPY", bars).unwrap_err() {
            EngineError::InvalidBarData { index, .. } => assert_eq!(index, 2),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn rejects_duplicate_timestamp() {
        let mut bars = make_bars(&[10.0, 11.0, 12.0]);
        bars[2].timestamp = bars[1].timestamp;
        match BarSeries::new("SPY", bars).unwrap_err() {
            EngineError::InvalidBarData { index, reason } => {
                assert_eq!(index, 2);
                assert!(reason.contains("not after"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn rejects_out_of_order_timestamp() {
        let mut bars = make_bars(&[10.0, 11.0, 12.0]);
        bars.swap(0, 1);
        // Each bar is still individually valid; only ordering is broken.
        assert!(matches!(
            BarSeries::new("SPY", bars),
            Err(EngineError::InvalidBarData { index: 1, .. })
        ));
    }

    #[test]
    fn get_is_bounds_checked() {
        let series = BarSeries::new("SPY", make_bars(&[10.0, 11.0])).unwrap();
        assert_eq!(series.get(1).unwrap().close, 11.0);
        assert_eq!(
            series.get(2).unwrap_err(),
            EngineError::IndexOutOfRange { index: 2, len: 2 }
        );
    }
}
