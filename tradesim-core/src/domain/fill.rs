use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::order::OrderSide;

/// An executed order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    pub bar_index: usize,
    pub timestamp: NaiveDateTime,
    pub side: OrderSide,
    pub quantity: f64,
    pub price: f64,
    pub commission: f64,
    /// True when this buy added to an already-open position.
    pub scale_in: bool,
}

impl Fill {
    pub fn notional(&self) -> f64 {
        self.quantity * self.price
    }
}
