//! Non-finite value substitution at the serialization boundary.
//!
//! JSON has no representation for NaN or infinity. Every float in a report
//! goes through [`finite`] before serialization:
//!
//! | input | output        |
//! |-------|---------------|
//! | +inf  | [`FINITE_CAP`] |
//! | -inf  | 0.0           |
//! | NaN   | 0.0           |

use super::drawdown::{DrawdownPeriod, DrawdownPoint};
use super::metrics::Summary;
use super::report::{Report, ReportMeta};
use crate::domain::{Fill, Trade};
use crate::engine::EquitySnapshot;

/// Stand-in for positive infinity.
pub const FINITE_CAP: f64 = 1e9;

pub fn finite(x: f64) -> f64 {
    if x.is_nan() {
        0.0
    } else if x == f64::INFINITY {
        FINITE_CAP
    } else if x == f64::NEG_INFINITY {
        0.0
    } else {
        x
    }
}

/// Replace every non-finite float in place.
pub trait Sanitize {
    fn sanitize(&mut self);
}

impl Sanitize for f64 {
    fn sanitize(&mut self) {
        *self = finite(*self);
    }
}

impl<T: Sanitize> Sanitize for Vec<T> {
    fn sanitize(&mut self) {
        for item in self.iter_mut() {
            item.sanitize();
        }
    }
}

macro_rules! sanitize_fields {
    ($ty:ty { $($field:ident),* $(,)? }) => {
        impl Sanitize for $ty {
            fn sanitize(&mut self) {
                $( self.$field.sanitize(); )*
            }
        }
    };
}

sanitize_fields!(Trade {
    entry_price,
    exit_price,
    quantity,
    pnl,
    return_pct,
    commission,
});

sanitize_fields!(Fill {
    quantity,
    price,
    commission,
});

sanitize_fields!(EquitySnapshot {
    equity,
    cash,
    position_quantity,
});

sanitize_fields!(DrawdownPoint { peak, drawdown });

sanitize_fields!(DrawdownPeriod { max_drawdown });

sanitize_fields!(ReportMeta {
    initial_cash,
    commission_rate,
    lot_size,
});

sanitize_fields!(Summary {
    win_rate,
    profit_factor,
    expectancy,
    expectancy_pct,
    gross_profit,
    gross_loss,
    best_trade_pct,
    worst_trade_pct,
    avg_trade_pct,
    avg_trade_bars,
    total_commission,
    equity_final,
    equity_peak,
    total_return,
    buy_and_hold_return,
    exposure,
    max_drawdown,
    avg_drawdown,
    avg_drawdown_duration_bars,
});

sanitize_fields!(Report {
    meta,
    summary,
    trades,
    fills,
    equity_curve,
    drawdown,
    drawdown_periods,
});
