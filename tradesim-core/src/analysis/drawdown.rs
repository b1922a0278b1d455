//! Drawdown series and drawdown periods.
//!
//! Drawdown at a bar is `(peak - equity) / peak` against the running peak,
//! so it is never negative and is exactly zero at every new peak. A period
//! runs from the peak bar to the first bar whose equity is back at or above
//! that peak. A period still open at the last bar is reported as not recovered.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::engine::EquitySnapshot;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawdownPoint {
    pub bar_index: usize,
    pub timestamp: NaiveDateTime,
    pub peak: f64,
    pub drawdown: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawdownPeriod {
    /// Bar of the peak the decline started from.
    pub start_bar: usize,
    /// Bar of the deepest point.
    pub trough_bar: usize,
    /// Bar of recovery, or the last bar when still open.
    pub end_bar: usize,
    pub duration_bars: usize,
    pub max_drawdown: f64,
    pub recovered: bool,
}

/// Length of a drawdown in bars; `ongoing` when the series ended before recovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DrawdownDuration {
    pub bars: usize,
    pub ongoing: bool,
}

fn drawdown_from(peak: f64, equity: f64) -> f64 {
    if peak > 0.0 && equity < peak {
        (peak - equity) / peak
    } else {
        0.0
    }
}

pub fn drawdown_series(equity_curve: &[EquitySnapshot]) -> Vec<DrawdownPoint> {
    let mut peak = f64::NEG_INFINITY;
    equity_curve
        .iter()
        .map(|snap| {
            peak = peak.max(snap.equity);
            DrawdownPoint {
                bar_index: snap.bar_index,
                timestamp: snap.timestamp,
                peak,
                drawdown: drawdown_from(peak, snap.equity),
            }
        })
        .collect()
}

pub fn drawdown_periods(equity_curve: &[EquitySnapshot]) -> Vec<DrawdownPeriod> {
    let Some(first) = equity_curve.first() else {
        return Vec::new();
    };

    let mut periods = Vec::new();
    let mut peak = first.equity;
    let mut peak_bar = first.bar_index;
    let mut open: Option<DrawdownPeriod> = None;

    for snap in equity_curve {
        if snap.equity >= peak {
            if let Some(mut period) = open.take() {
                period.end_bar = snap.bar_index;
                period.duration_bars = snap.bar_index - period.start_bar;
                period.recovered = true;
                periods.push(period);
            }
            peak = snap.equity;
            peak_bar = snap.bar_index;
            continue;
        }

        let dd = drawdown_from(peak, snap.equity);
        let period = open.get_or_insert(DrawdownPeriod {
            start_bar: peak_bar,
            trough_bar: snap.bar_index,
            end_bar: snap.bar_index,
            duration_bars: 0,
            max_drawdown: 0.0,
            recovered: false,
        });
        if dd > period.max_drawdown {
            period.max_drawdown = dd;
            period.trough_bar = snap.bar_index;
        }
    }

    if let Some(mut period) = open {
        let last = equity_curve[equity_curve.len() - 1].bar_index;
        period.end_bar = last;
        period.duration_bars = last - period.start_bar;
        periods.push(period);
    }
    periods
}

pub fn max_drawdown(points: &[DrawdownPoint]) -> f64 {
    points.iter().map(|p| p.drawdown).fold(0.0, f64::max)
}

/// Mean of the per-period maximum drawdowns.
pub fn average_drawdown(periods: &[DrawdownPeriod]) -> f64 {
    if periods.is_empty() {
        return 0.0;
    }
    periods.iter().map(|p| p.max_drawdown).sum::<f64>() / periods.len() as f64
}

/// Longest period. Ties go to the earlier one.
pub fn max_drawdown_duration(periods: &[DrawdownPeriod]) -> DrawdownDuration {
    periods
        .iter()
        .fold(None::<&DrawdownPeriod>, |best, p| match best {
            Some(b) if b.duration_bars >= p.duration_bars => Some(b),
            _ => Some(p),
        })
        .map(|p| DrawdownDuration {
            bars: p.duration_bars,
            ongoing: !p.recovered,
        })
        .unwrap_or_default()
}

pub fn average_drawdown_duration(periods: &[DrawdownPeriod]) -> f64 {
    if periods.is_empty() {
        return 0.0;
    }
    periods.iter().map(|p| p.duration_bars as f64).sum::<f64>() / periods.len() as f64
}

#[cfg(test)]
pub(crate) fn curve(equity: &[f64]) -> Vec<EquitySnapshot> {
    let base = chrono::NaiveDate::from_ymd_opt(2024, 1, 2)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    equity
        .iter()
        .enumerate()
        .map(|(i, &e)| EquitySnapshot {
            bar_index: i,
            timestamp: base + chrono::Duration::days(i as i64),
            equity: e,
            cash: e,
            position_quantity: 0.0,
        })
        .collect()
}
