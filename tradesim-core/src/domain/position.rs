use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Open position held by the broker.
///
/// Quantity is signed (positive = long). A flat account holds no `Position`
/// at all rather than one with zero quantity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub quantity: f64,
    pub avg_entry_price: f64,
    pub entry_bar: usize,
    pub entry_time: NaiveDateTime,
    /// Commission paid on every entry fill so far, charged to the trade on close.
    pub entry_commission: f64,
}

impl Position {
    pub fn open(
        quantity: f64,
        price: f64,
        bar_index: usize,
        time: NaiveDateTime,
        commission: f64,
    ) -> Self {
        Self {
            quantity,
            avg_entry_price: price,
            entry_bar: bar_index,
            entry_time: time,
            entry_commission: commission,
        }
    }

    pub fn is_long(&self) -> bool {
        self.quantity > 0.0
    }

    pub fn is_short(&self) -> bool {
        self.quantity < 0.0
    }

    pub fn market_value(&self, current_price: f64) -> f64 {
        self.quantity * current_price
    }

    pub fn unrealized_pnl(&self, current_price: f64) -> f64 {
        self.quantity * (current_price - self.avg_entry_price)
    }

    /// Add to the position, re-averaging the entry price by quantity.
    ///
    /// Entry bar and time stay at the first fill.
    pub fn scale_in(&mut self, quantity: f64, price: f64, commission: f64) {
        let total = self.quantity + quantity;
        if total != 0.0 {
            self.avg_entry_price =
                (self.avg_entry_price * self.quantity + price * quantity) / total;
        }
        self.quantity = total;
        self.entry_commission += commission;
    }
}
