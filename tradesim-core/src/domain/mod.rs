//! Domain types for TradeSim

pub mod bar;
pub mod fill;
pub mod order;
pub mod position;
pub mod series;
pub mod trade;

pub use bar::Bar;
pub use fill::Fill;
pub use order::{Order, OrderIntent, OrderSide, Sizing};
pub use position::Position;
pub use series::BarSeries;
pub use trade::{ExitReason, Trade};

/// Create synthetic bars from close prices for testing.
///
/// Generates plausible OHLV: open = prev_close (or close for first bar),
/// high = max(open,close) + 1.0, low = min(open,close) - 1.0, volume = 1000.
/// Bars are one calendar day apart starting 2024-01-02.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<Bar> {
    let base = chrono::NaiveDate::from_ymd_opt(2024, 1, 2)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Bar {
                timestamp: base + chrono::Duration::days(i as i64),
                open,
                high: open.max(close) + 1.0,
                low: (open.min(close) - 1.0).max(0.01),
                close,
                volume: 1000,
            }
        })
        .collect()
}

/// Wrap `make_bars` output in a validated series.
#[cfg(test)]
pub fn make_series(closes: &[f64]) -> BarSeries {
    BarSeries::new("TEST", make_bars(closes)).unwrap()
}
