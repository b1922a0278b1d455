//! Periodic fixed-amount accumulation (dollar-cost averaging).
//!
//! Buys `investment / close` units on the first bar of every calendar month
//! and adds them to the open position. Never sells; the engine's force-close
//! realizes the whole stack as one trade.

use chrono::Datelike;

use super::{BarContext, Strategy};
use crate::domain::{OrderIntent, Sizing};
use crate::error::EngineError;

#[derive(Debug, Clone)]
pub struct MonthlyAccumulation {
    pub investment: f64,
    last_month: Option<(i32, u32)>,
}

impl MonthlyAccumulation {
    pub fn new(investment: f64) -> Result<Self, EngineError> {
        if !investment.is_finite() || investment <= 0.0 {
            return Err(EngineError::InvalidParameter(format!(
                "investment must be finite and > 0, got {investment}"
            )));
        }
        Ok(Self {
            investment,
            last_month: None,
        })
    }
}

impl Strategy for MonthlyAccumulation {
    fn name(&self) -> &str {
        "monthly_accumulation"
    }

    fn on_bar(&mut self, ctx: &BarContext<'_>) -> OrderIntent {
        let bar = ctx.bar();
        // Year is part of the key so January of the next year still triggers.
        let month = (bar.timestamp.year(), bar.timestamp.month());
        if self.last_month == Some(month) {
            return OrderIntent::Hold;
        }
        self.last_month = Some(month);
        OrderIntent::ScaleIn(Sizing::Units(self.investment / bar.close))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::AccountSnapshot;
    use crate::domain::{Bar, BarSeries};
    use crate::indicators::IndicatorEngine;
    use chrono::{Duration, NaiveDate};

    fn daily_series(start: NaiveDate, days: i64) -> BarSeries {
        let bars = (0..days)
            .map(|i| Bar {
                timestamp: (start + Duration::days(i)).and_hms_opt(0, 0, 0).unwrap(),
                open: 100.0,
                high: 101.0,
                low: 99.0,
                close: 100.0,
                volume: 1_000,
            })
            .collect();
        BarSeries::new("DCA", bars).unwrap()
    }

    fn buy_bars(strategy: &mut MonthlyAccumulation, series: &BarSeries) -> Vec<usize> {
        let engine = IndicatorEngine::new();
        let mut buys = Vec::new();
        for i in 0..series.len() {
            let ctx = BarContext {
                index: i,
                bars: &series.bars()[..=i],
                indicators: engine.view(),
                account: AccountSnapshot {
                    cash: 0.0,
                    position: None,
                    equity: 0.0,
                },
            };
            if let OrderIntent::ScaleIn(Sizing::Units(units)) = strategy.on_bar(&ctx) {
                assert_eq!(units, 10.0);
                buys.push(i);
            }
        }
        buys
    }

    #[test]
    fn buys_first_bar_of_each_month() {
        let series = daily_series(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), 90);
        let mut s = MonthlyAccumulation::new(1_000.0).unwrap();
        // Jan 1, Feb 1 (day 31), Mar 1 (day 60 in a leap year)
        assert_eq!(buy_bars(&mut s, &series), vec![0, 31, 60]);
    }

    #[test]
    fn same_month_next_year_still_buys() {
        // Jan 2023 through Jan 2024 inclusive: 13 month starts.
        let series = daily_series(NaiveDate::from_ymd_opt(2023, 1, 15).unwrap(), 366);
        let mut s = MonthlyAccumulation::new(1_000.0).unwrap();
        assert_eq!(buy_bars(&mut s, &series).len(), 13);
    }

    #[test]
    fn rejects_non_positive_investment() {
        assert!(MonthlyAccumulation::new(0.0).is_err());
        assert!(MonthlyAccumulation::new(f64::NAN).is_err());
    }
}
