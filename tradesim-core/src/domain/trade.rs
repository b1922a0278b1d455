//! Trade: a completed round trip, from first entry fill to exit.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::position::Position;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    /// The strategy asked to exit.
    Signal,
    /// The engine closed the position at the end of the series.
    ForceClose,
}

impl ExitReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExitReason::Signal => "signal",
            ExitReason::ForceClose => "force_close",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    // ── Entry ──
    pub entry_bar: usize,
    pub entry_time: NaiveDateTime,
    pub entry_price: f64,

    // ── Exit ──
    pub exit_bar: usize,
    pub exit_time: NaiveDateTime,
    pub exit_price: f64,

    // ── Size ──
    /// Signed: positive for a long round trip.
    pub quantity: f64,

    // ── PnL ──
    /// Net of entry and exit commission.
    pub pnl: f64,
    pub return_pct: f64,
    pub commission: f64,

    // ── Duration ──
    pub bars_held: usize,
    pub duration_secs: i64,

    pub exit_reason: ExitReason,
}

impl Trade {
    /// Close `position` at `exit_price`, charging entry plus exit commission.
    pub fn close(
        position: &Position,
        exit_bar: usize,
        exit_time: NaiveDateTime,
        exit_price: f64,
        exit_commission: f64,
        exit_reason: ExitReason,
    ) -> Self {
        let qty = position.quantity;
        let entry_price = position.avg_entry_price;
        let commission = position.entry_commission + exit_commission;
        let pnl = (exit_price - entry_price) * qty.signum() * qty.abs() - commission;
        let cost_basis = entry_price * qty.abs();
        let return_pct = if cost_basis == 0.0 {
            0.0
        } else {
            pnl / cost_basis
        };

        Self {
            entry_bar: position.entry_bar,
            entry_time: position.entry_time,
            entry_price,
            exit_bar,
            exit_time,
            exit_price,
            quantity: qty,
            pnl,
            return_pct,
            commission,
            bars_held: exit_bar.saturating_sub(position.entry_bar),
            duration_secs: (exit_time - position.entry_time).num_seconds(),
            exit_reason,
        }
    }

    pub fn is_winner(&self) -> bool {
        self.pnl > 0.0
    }

    pub fn is_loser(&self) -> bool {
        self.pnl < 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn t(day: i64) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            + Duration::days(day)
    }

    #[test]
    fn long_trade_pnl_is_net_of_commission() {
        let pos = Position::open(50.0, 100.0, 4, t(4), 10.0);
        let trade = Trade::close(&pos, 8, t(8), 110.0, 11.0, ExitReason::Signal);

        assert_eq!(trade.commission, 21.0);
        assert!((trade.pnl - 479.0).abs() < 1e-10);
        assert!((trade.return_pct - 479.0 / 5000.0).abs() < 1e-12);
        assert_eq!(trade.bars_held, 4);
        assert_eq!(trade.duration_secs, 4 * 86_400);
        assert!(trade.is_winner());
    }

    #[test]
    fn losing_trade_has_negative_return() {
        let pos = Position::open(10.0, 100.0, 0, t(0), 0.0);
        let trade = Trade::close(&pos, 2, t(2), 90.0, 0.0, ExitReason::Signal);
        assert!(trade.is_loser());
        assert!(trade.return_pct < 0.0);
    }

    #[test]
    fn short_quantity_uses_sign() {
        let pos = Position::open(-10.0, 100.0, 0, t(0), 0.0);
        let trade = Trade::close(&pos, 1, t(1), 90.0, 0.0, ExitReason::Signal);
        assert!((trade.pnl - 100.0).abs() < 1e-12);
        assert!(trade.return_pct > 0.0);
    }

    #[test]
    fn same_bar_force_close() {
        let pos = Position::open(1.0, 50.0, 9, t(9), 0.0);
        let trade = Trade::close(&pos, 9, t(9), 50.0, 0.0, ExitReason::ForceClose);
        assert_eq!(trade.bars_held, 0);
        assert_eq!(trade.pnl, 0.0);
        assert_eq!(trade.exit_reason, ExitReason::ForceClose);
    }

    #[test]
    fn serializes_exit_reason_snake_case() {
        let json = serde_json::to_string(&ExitReason::ForceClose).unwrap();
        assert_eq!(json, "\"force_close\"");
    }
}
