//! Bar: the fundamental market data unit.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// OHLCV bar for a single instrument over one interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl Bar {
    /// Check the OHLC envelope: finite positive prices and
    /// `high >= max(open, close) >= min(open, close) >= low`.
    ///
    /// Returns a human-readable reason on the first violation.
    pub fn validate(&self) -> Result<(), String> {
        let fields = [
            ("open", self.open),
            ("high", self.high),
            ("low", self.low),
            ("close", self.close),
        ];
        for (name, value) in fields {
            if !value.is_finite() {
                return Err(format!("{name} is not finite ({value})"));
            }
            if value <= 0.0 {
                return Err(format!("{name} must be positive ({value})"));
            }
        }

        let body_high = self.open.max(self.close);
        let body_low = self.open.min(self.close);
        if self.high < body_high {
            return Err(format!(
                "high {} below max(open, close) {}",
                self.high, body_high
            ));
        }
        if self.low > body_low {
            return Err(format!(
                "low {} above min(open, close) {}",
                self.low, body_low
            ));
        }
        Ok(())
    }

    pub fn is_sane(&self) -> bool {
        self.validate().is_ok()
    }

    /// Whether `price` lies inside this bar's traded range.
    pub fn contains(&self, price: f64) -> bool {
        price >= self.low && price <= self.high
    }
}
