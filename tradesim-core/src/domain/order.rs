//! Orders: what a strategy asks for and how it is sized.

use serde::{Deserialize, Serialize};

/// Tolerance applied before flooring so that 2.9999999999 units floor to 3.
const LOT_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderSide {
    Buy,
    Sell,
}

/// How large a buy should be.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sizing {
    /// Fraction `f` of current equity, 0 < f <= 1.
    FractionOfEquity(f64),
    /// Absolute number of units.
    Units(f64),
}

impl Sizing {
    pub fn is_valid(&self) -> bool {
        match *self {
            Sizing::FractionOfEquity(f) => f.is_finite() && f > 0.0 && f <= 1.0,
            Sizing::Units(u) => u.is_finite() && u > 0.0,
        }
    }

    /// Tradable quantity at `price`, floored to `lot_size`. May be zero.
    pub fn quantity(&self, equity: f64, price: f64, lot_size: f64) -> f64 {
        match *self {
            Sizing::FractionOfEquity(f) => {
                if price <= 0.0 {
                    return 0.0;
                }
                floor_to_lot(f * equity / price, lot_size)
            }
            Sizing::Units(u) => floor_to_lot(u, lot_size),
        }
    }
}

/// Floor `raw` to a whole multiple of `lot_size`. Negative input floors to zero.
pub fn floor_to_lot(raw: f64, lot_size: f64) -> f64 {
    if !raw.is_finite() || raw <= 0.0 || lot_size <= 0.0 {
        return 0.0;
    }
    ((raw / lot_size) + LOT_EPSILON).floor() * lot_size
}

/// Per-bar decision returned by a strategy.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderIntent {
    #[default]
    Hold,
    /// Open a long position. Rejected if one is already open.
    Buy(Sizing),
    /// Add to the open long position, or open one if flat.
    ScaleIn(Sizing),
    /// Sell the whole position.
    Exit,
}

impl OrderIntent {
    pub fn is_hold(&self) -> bool {
        matches!(self, OrderIntent::Hold)
    }
}

/// A market order created from an intent at `requested_bar`.
///
/// A sell carries no sizing: it always closes the full position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub side: OrderSide,
    pub sizing: Option<Sizing>,
    pub scale_in: bool,
    pub requested_bar: usize,
}

impl Order {
    /// `None` for `Hold`.
    pub fn from_intent(intent: OrderIntent, requested_bar: usize) -> Option<Self> {
        match intent {
            OrderIntent::Hold => None,
            OrderIntent::Buy(sizing) => Some(Self {
                side: OrderSide::Buy,
                sizing: Some(sizing),
                scale_in: false,
                requested_bar,
            }),
            OrderIntent::ScaleIn(sizing) => Some(Self {
                side: OrderSide::Buy,
                sizing: Some(sizing),
                scale_in: true,
                requested_bar,
            }),
            OrderIntent::Exit => Some(Self {
                side: OrderSide::Sell,
                sizing: None,
                scale_in: false,
                requested_bar,
            }),
        }
    }
}
