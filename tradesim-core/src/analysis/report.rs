//! The immutable result of one run.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::drawdown::{drawdown_periods, drawdown_series, DrawdownPeriod, DrawdownPoint};
use super::metrics::{summarize, Summary};
use super::sanitize::Sanitize;
use crate::domain::{Fill, Trade};
use crate::engine::{Diagnostics, EquitySnapshot, FillPolicy, RunOutput};

/// What was run, on what, with which settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportMeta {
    pub symbol: String,
    pub strategy: String,
    pub fill_policy: FillPolicy,
    pub commission_rate: f64,
    pub lot_size: f64,
    pub close_at_end: bool,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub duration_secs: i64,
    pub initial_cash: f64,
    pub bar_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub meta: ReportMeta,
    pub summary: Summary,
    pub trades: Vec<Trade>,
    pub fills: Vec<Fill>,
    pub equity_curve: Vec<EquitySnapshot>,
    pub drawdown: Vec<DrawdownPoint>,
    pub drawdown_periods: Vec<DrawdownPeriod>,
    pub diagnostics: Diagnostics,
}

impl Report {
    pub fn from_run(output: RunOutput) -> Self {
        let initial_cash = output.config.initial_cash;
        let summary = summarize(&output.trades, &output.equity_curve, initial_cash)
            .with_buy_and_hold(output.first_close, output.last_close);

        Self {
            meta: ReportMeta {
                symbol: output.symbol,
                strategy: output.strategy,
                fill_policy: output.config.fill_policy,
                commission_rate: output.config.commission_rate,
                lot_size: output.config.lot_size,
                close_at_end: output.config.close_at_end,
                start: output.start,
                end: output.end,
                duration_secs: (output.end - output.start).num_seconds(),
                initial_cash,
                bar_count: output.bar_count,
            },
            summary,
            drawdown: drawdown_series(&output.equity_curve),
            drawdown_periods: drawdown_periods(&output.equity_curve),
            trades: output.trades,
            fills: output.fills,
            equity_curve: output.equity_curve,
            diagnostics: output.diagnostics,
        }
    }

    pub fn final_equity(&self) -> f64 {
        self.summary.equity_final
    }

    /// Final equity minus initial cash.
    pub fn profit(&self) -> f64 {
        self.summary.equity_final - self.meta.initial_cash
    }

    /// A copy with every non-finite float substituted.
    pub fn sanitized(&self) -> Report {
        let mut report = self.clone();
        report.sanitize();
        report
    }

    /// Compact JSON of the sanitized report.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.sanitized())
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.sanitized())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::FINITE_CAP;
    use crate::domain::make_series;
    use crate::engine::{EngineConfig, Simulation};
    use crate::strategy::StrategyConfig;

    fn rising_report() -> Report {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let series = make_series(&closes);
        let strategy = StrategyConfig::ma_cross(2, 5).build().unwrap();
        let output = Simulation::new(&series, strategy, EngineConfig::frictionless(10_000.0))
            .unwrap()
            .run()
            .unwrap();
        Report::from_run(output)
    }

    #[test]
    fn metadata_from_run() {
        let report = rising_report();
        assert_eq!(report.meta.symbol, "TEST");
        assert_eq!(report.meta.bar_count, 30);
        assert_eq!(report.meta.duration_secs, 29 * 86_400);
        assert_eq!(report.equity_curve.len(), 30);
        assert_eq!(report.drawdown.len(), 30);
        assert!((report.summary.buy_and_hold_return - 0.29).abs() < 1e-12);
    }

    #[test]
    fn infinite_profit_factor_is_capped_in_json() {
        let report = rising_report();
        assert_eq!(report.summary.profit_factor, f64::INFINITY);

        let sanitized = report.sanitized();
        assert_eq!(sanitized.summary.profit_factor, FINITE_CAP);

        let json = report.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["summary"]["profit_factor"], 1e9);
    }

    #[test]
    fn profit_matches_trade_pnl() {
        let report = rising_report();
        let pnl: f64 = report.trades.iter().map(|t| t.pnl).sum();
        assert!((report.profit() - pnl).abs() < 1e-9);
    }

    #[test]
    fn json_is_deterministic() {
        assert_eq!(
            rising_report().to_json().unwrap(),
            rising_report().to_json().unwrap()
        );
    }
}
