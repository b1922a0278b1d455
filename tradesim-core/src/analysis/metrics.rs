//! Performance metrics: pure functions over the trade log and equity curve.
//!
//! Degenerate inputs never fail: with zero trades, win rate, profit factor
//! and expectancy are all 0. Profit factor with no losing trades but some
//! profit is `f64::INFINITY`; the report's sanitization pass caps it.

use serde::{Deserialize, Serialize};

use super::drawdown::{
    average_drawdown, average_drawdown_duration, drawdown_periods, drawdown_series,
    max_drawdown, max_drawdown_duration, DrawdownDuration,
};
use crate::domain::Trade;
use crate::engine::EquitySnapshot;

/// Summary statistics for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    // ── Trades ──
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub win_rate: f64,
    pub profit_factor: f64,
    /// Mean P&L per closed trade.
    pub expectancy: f64,
    /// Mean return per closed trade.
    pub expectancy_pct: f64,
    pub gross_profit: f64,
    pub gross_loss: f64,
    pub best_trade_pct: f64,
    pub worst_trade_pct: f64,
    pub avg_trade_pct: f64,
    pub max_trade_bars: usize,
    pub avg_trade_bars: f64,
    pub total_commission: f64,

    // ── Equity ──
    pub equity_final: f64,
    pub equity_peak: f64,
    pub total_return: f64,
    pub buy_and_hold_return: f64,
    /// Fraction of bars with a non-flat position.
    pub exposure: f64,

    // ── Drawdown ──
    pub max_drawdown: f64,
    pub avg_drawdown: f64,
    pub max_drawdown_duration: DrawdownDuration,
    pub avg_drawdown_duration_bars: f64,
}

impl Summary {
    pub fn with_buy_and_hold(mut self, first_close: f64, last_close: f64) -> Self {
        self.buy_and_hold_return = buy_and_hold_return(first_close, last_close);
        self
    }
}

/// Compute every summary statistic. `buy_and_hold_return` is left at 0; it
/// needs prices and is filled in by [`Summary::with_buy_and_hold`].
pub fn summarize(trades: &[Trade], equity_curve: &[EquitySnapshot], initial_cash: f64) -> Summary {
    let returns: Vec<f64> = trades.iter().map(|t| t.return_pct).collect();
    let periods = drawdown_periods(equity_curve);
    let points = drawdown_series(equity_curve);
    let equity_final = equity_curve.last().map_or(initial_cash, |s| s.equity);

    Summary {
        total_trades: trades.len(),
        winning_trades: trades.iter().filter(|t| t.is_winner()).count(),
        losing_trades: trades.iter().filter(|t| t.is_loser()).count(),
        win_rate: win_rate(trades),
        profit_factor: profit_factor(trades),
        expectancy: expectancy(trades),
        expectancy_pct: mean_f64(&returns),
        gross_profit: gross_profit(trades),
        gross_loss: gross_loss(trades),
        best_trade_pct: returns.iter().copied().reduce(f64::max).unwrap_or(0.0),
        worst_trade_pct: returns.iter().copied().reduce(f64::min).unwrap_or(0.0),
        avg_trade_pct: mean_f64(&returns),
        max_trade_bars: trades.iter().map(|t| t.bars_held).max().unwrap_or(0),
        avg_trade_bars: mean_f64(&trades.iter().map(|t| t.bars_held as f64).collect::<Vec<_>>()),
        total_commission: trades.iter().map(|t| t.commission).sum(),
        equity_final,
        equity_peak: equity_curve
            .iter()
            .map(|s| s.equity)
            .fold(initial_cash, f64::max),
        total_return: total_return(initial_cash, equity_final),
        buy_and_hold_return: 0.0,
        exposure: exposure(equity_curve),
        max_drawdown: max_drawdown(&points),
        avg_drawdown: average_drawdown(&periods),
        max_drawdown_duration: max_drawdown_duration(&periods),
        avg_drawdown_duration_bars: average_drawdown_duration(&periods),
    }
}

// ─── Individual metric functions ────────────────────────────────────

/// Fraction of closed trades with positive P&L.
pub fn win_rate(trades: &[Trade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let winners = trades.iter().filter(|t| t.is_winner()).count();
    winners as f64 / trades.len() as f64
}

pub fn gross_profit(trades: &[Trade]) -> f64 {
    trades.iter().filter(|t| t.pnl > 0.0).map(|t| t.pnl).sum()
}

/// Sum of losing P&L as a positive number.
pub fn gross_loss(trades: &[Trade]) -> f64 {
    trades.iter().filter(|t| t.pnl < 0.0).map(|t| -t.pnl).sum()
}

/// Gross profit / gross loss. 0 with no trades or no profit;
/// `INFINITY` with profit and zero loss.
pub fn profit_factor(trades: &[Trade]) -> f64 {
    let profit = gross_profit(trades);
    let loss = gross_loss(trades);
    if loss == 0.0 {
        return if profit > 0.0 { f64::INFINITY } else { 0.0 };
    }
    profit / loss
}

/// Mean P&L per closed trade.
pub fn expectancy(trades: &[Trade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    trades.iter().map(|t| t.pnl).sum::<f64>() / trades.len() as f64
}

pub fn total_return(initial: f64, final_equity: f64) -> f64 {
    if initial <= 0.0 {
        return 0.0;
    }
    (final_equity - initial) / initial
}

pub fn buy_and_hold_return(first_close: f64, last_close: f64) -> f64 {
    if first_close <= 0.0 {
        return 0.0;
    }
    (last_close - first_close) / first_close
}

/// Fraction of snapshots holding a non-flat position.
pub fn exposure(equity_curve: &[EquitySnapshot]) -> f64 {
    if equity_curve.is_empty() {
        return 0.0;
    }
    let exposed = equity_curve
        .iter()
        .filter(|s| s.position_quantity != 0.0)
        .count();
    exposed as f64 / equity_curve.len() as f64
}

// ─── Helpers ────────────────────────────────────────────────────────

pub(crate) fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::drawdown::curve;
    use crate::domain::{ExitReason, Position};
    use chrono::{Duration, NaiveDate};

    fn make_trade(pnl: f64) -> Trade {
        let t0 = NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let pos = Position::open(50.0, 100.0, 0, t0, 0.0);
        Trade::close(
            &pos,
            5,
            t0 + Duration::days(5),
            100.0 + pnl / 50.0,
            0.0,
            ExitReason::Signal,
        )
    }

    // ── Trade statistics ──

    #[test]
    fn win_rate_mixed() {
        let trades = vec![make_trade(100.0), make_trade(-50.0), make_trade(25.0), make_trade(-10.0)];
        assert!((win_rate(&trades) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn zero_trades_are_all_zero() {
        assert_eq!(win_rate(&[]), 0.0);
        assert_eq!(profit_factor(&[]), 0.0);
        assert_eq!(expectancy(&[]), 0.0);
    }

    #[test]
    fn profit_factor_basic() {
        let trades = vec![make_trade(300.0), make_trade(-100.0), make_trade(-50.0)];
        assert!((profit_factor(&trades) - 2.0).abs() < 1e-9);
    }

    #[test]
    fn profit_factor_no_losses_is_infinite() {
        let trades = vec![make_trade(100.0), make_trade(50.0)];
        assert_eq!(profit_factor(&trades), f64::INFINITY);
    }

    #[test]
    fn profit_factor_only_losses_is_zero() {
        let trades = vec![make_trade(-100.0)];
        assert_eq!(profit_factor(&trades), 0.0);
    }

    #[test]
    fn expectancy_is_mean_pnl() {
        let trades = vec![make_trade(100.0), make_trade(-40.0)];
        assert!((expectancy(&trades) - 30.0).abs() < 1e-9);
    }

    // ── Equity statistics ──

    #[test]
    fn exposure_counts_non_flat_bars() {
        let mut c = curve(&[100.0, 100.0, 100.0, 100.0]);
        c[1].position_quantity = 5.0;
        c[2].position_quantity = 5.0;
        assert!((exposure(&c) - 0.5).abs() < 1e-12);
        assert_eq!(exposure(&[]), 0.0);
    }

    #[test]
    fn returns() {
        assert!((total_return(1_000.0, 1_100.0) - 0.1).abs() < 1e-12);
        assert!((buy_and_hold_return(50.0, 40.0) + 0.2).abs() < 1e-12);
        assert_eq!(total_return(0.0, 5.0), 0.0);
    }

    #[test]
    fn summarize_populates_everything() {
        let trades = vec![make_trade(200.0), make_trade(-100.0)];
        let c = curve(&[1_000.0, 1_200.0, 1_100.0, 1_100.0]);
        let summary = summarize(&trades, &c, 1_000.0).with_buy_and_hold(10.0, 12.0);

        assert_eq!(summary.total_trades, 2);
        assert_eq!(summary.winning_trades, 1);
        assert_eq!(summary.losing_trades, 1);
        assert!((summary.profit_factor - 2.0).abs() < 1e-9);
        assert!((summary.expectancy - 50.0).abs() < 1e-9);
        assert!((summary.best_trade_pct - 0.04).abs() < 1e-9);
        assert!((summary.worst_trade_pct + 0.02).abs() < 1e-9);
        assert_eq!(summary.max_trade_bars, 5);
        assert_eq!(summary.equity_final, 1_100.0);
        assert_eq!(summary.equity_peak, 1_200.0);
        assert!((summary.total_return - 0.1).abs() < 1e-12);
        assert!((summary.buy_and_hold_return - 0.2).abs() < 1e-12);
        assert!((summary.max_drawdown - 100.0 / 1_200.0).abs() < 1e-12);
        assert_eq!(
            summary.max_drawdown_duration,
            DrawdownDuration {
                bars: 2,
                ongoing: true
            }
        );
    }

    #[test]
    fn summarize_empty_run() {
        let c = curve(&[500.0, 500.0]);
        let summary = summarize(&[], &c, 500.0);
        assert_eq!(summary.total_trades, 0);
        assert_eq!(summary.win_rate, 0.0);
        assert_eq!(summary.profit_factor, 0.0);
        assert_eq!(summary.expectancy, 0.0);
        assert_eq!(summary.best_trade_pct, 0.0);
        assert_eq!(summary.max_drawdown, 0.0);
        assert_eq!(summary.exposure, 0.0);
    }
}
