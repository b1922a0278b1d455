//! The bar-by-bar simulation state machine.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::config::EngineConfig;
use super::diagnostics::{DiagnosticKind, Diagnostics};
use crate::analysis::Report;
use crate::broker::{Broker, OrderOutcome, OrderRejection};
use crate::domain::{BarSeries, Fill, Order, Trade};
use crate::error::EngineError;
use crate::indicators::IndicatorEngine;
use crate::strategy::{BarContext, InitContext, Strategy, StrategyConfig};

/// Mark-to-market account state at one bar's close.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquitySnapshot {
    pub bar_index: usize,
    pub timestamp: NaiveDateTime,
    pub equity: f64,
    pub cash: f64,
    pub position_quantity: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    NotStarted,
    Running,
    Completed,
    Failed,
}

impl RunState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunState::NotStarted => "not_started",
            RunState::Running => "running",
            RunState::Completed => "completed",
            RunState::Failed => "failed",
        }
    }
}

/// Everything a completed run produced, before analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutput {
    pub symbol: String,
    pub strategy: String,
    pub config: EngineConfig,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub bar_count: usize,
    pub first_close: f64,
    pub last_close: f64,
    pub trades: Vec<Trade>,
    pub fills: Vec<Fill>,
    pub equity_curve: Vec<EquitySnapshot>,
    pub diagnostics: Diagnostics,
}

/// One strategy replayed over one bar series.
///
/// Drive it with [`Simulation::run`], or step by step with `start`, `step`
/// until it returns `false`, then `finish` and `into_output`. Any error moves
/// the run to `Failed`; a failed run cannot be resumed.
pub struct Simulation<'a> {
    series: &'a BarSeries,
    strategy: Box<dyn Strategy>,
    config: EngineConfig,
    broker: Broker,
    indicators: IndicatorEngine,
    state: RunState,
    next_index: usize,
    trades: Vec<Trade>,
    fills: Vec<Fill>,
    equity_curve: Vec<EquitySnapshot>,
    diagnostics: Diagnostics,
}

impl<'a> Simulation<'a> {
    pub fn new(
        series: &'a BarSeries,
        strategy: Box<dyn Strategy>,
        config: EngineConfig,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self {
            series,
            strategy,
            broker: Broker::new(&config),
            config,
            indicators: IndicatorEngine::new(),
            state: RunState::NotStarted,
            next_index: 0,
            trades: Vec::new(),
            fills: Vec::new(),
            equity_curve: Vec::with_capacity(series.len()),
            diagnostics: Diagnostics::new(),
        })
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Number of bars processed so far.
    pub fn bars_processed(&self) -> usize {
        self.next_index
    }

    pub fn is_exhausted(&self) -> bool {
        self.next_index >= self.series.len()
    }

    pub fn broker(&self) -> &Broker {
        &self.broker
    }

    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    pub fn equity_curve(&self) -> &[EquitySnapshot] {
        &self.equity_curve
    }

    /// `NotStarted -> Running`. Runs the strategy's `on_init`.
    pub fn start(&mut self) -> Result<(), EngineError> {
        self.require(RunState::NotStarted, "start")?;
        debug!(
            symbol = self.series.symbol(),
            strategy = self.strategy.name(),
            bars = self.series.len(),
            fill_policy = %self.config.fill_policy,
            "starting run"
        );

        let mut ctx = InitContext::new(self.series, &self.config, &mut self.indicators);
        if let Err(err) = self.strategy.on_init(&mut ctx) {
            return Err(self.fail(err));
        }
        self.state = RunState::Running;
        Ok(())
    }

    /// Process the next bar. Returns `false` once every bar has been processed.
    pub fn step(&mut self) -> Result<bool, EngineError> {
        self.require(RunState::Running, "step")?;
        if self.is_exhausted() {
            return Ok(false);
        }
        let index = self.next_index;
        if let Err(err) = self.process_bar(index) {
            return Err(self.fail(err));
        }
        self.next_index += 1;
        Ok(true)
    }

    /// `Running -> Completed`. Force-closes any open position at the last
    /// close when `close_at_end` is set, then runs `on_finish`.
    pub fn finish(&mut self) -> Result<(), EngineError> {
        self.require(RunState::Running, "finish")?;
        if !self.is_exhausted() {
            return Err(EngineError::InvalidState {
                state: "running",
                action: "finish before the last bar",
            });
        }
        if let Err(err) = self.close_out() {
            return Err(self.fail(err));
        }

        let last = self.series.len() - 1;
        let bar = self.series.last();
        let ctx = BarContext {
            index: last,
            bars: self.series.bars(),
            indicators: self.indicators.view(),
            account: self.broker.snapshot(bar.close),
        };
        self.strategy.on_finish(&ctx);
        self.state = RunState::Completed;
        Ok(())
    }

    /// Hand over the recorded output of a completed run.
    pub fn into_output(self) -> Result<RunOutput, EngineError> {
        if self.state != RunState::Completed {
            return Err(EngineError::InvalidState {
                state: self.state.as_str(),
                action: "produce output",
            });
        }
        Ok(RunOutput {
            symbol: self.series.symbol().to_string(),
            strategy: self.strategy.name().to_string(),
            config: self.config,
            start: self.series.start(),
            end: self.series.end(),
            bar_count: self.series.len(),
            first_close: self.series.first().close,
            last_close: self.series.last().close,
            trades: self.trades,
            fills: self.fills,
            equity_curve: self.equity_curve,
            diagnostics: self.diagnostics,
        })
    }

    /// Start, step through every bar, finish.
    pub fn run(mut self) -> Result<RunOutput, EngineError> {
        self.start()?;
        while self.step()? {}
        self.finish()?;

        let final_equity = self.equity_curve.last().map_or(0.0, |s| s.equity);
        info!(
            symbol = self.series.symbol(),
            strategy = self.strategy.name(),
            bars = self.series.len(),
            trades = self.trades.len(),
            final_equity,
            "run completed"
        );
        self.into_output()
    }

    // ─── Internals ──────────────────────────────────────────────────

    fn require(&self, expected: RunState, action: &'static str) -> Result<(), EngineError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(EngineError::InvalidState {
                state: self.state.as_str(),
                action,
            })
        }
    }

    fn fail(&mut self, err: EngineError) -> EngineError {
        warn!(
            symbol = self.series.symbol(),
            bar_index = self.next_index,
            code = err.code(),
            error = %err,
            "run failed"
        );
        self.state = RunState::Failed;
        err
    }

    fn process_bar(&mut self, index: usize) -> Result<(), EngineError> {
        let series = self.series;
        let bar = series.get(index)?;

        if let Some(outcome) = self.broker.execute_pending(index, series)? {
            self.apply_outcome(index, outcome);
        }

        self.indicators.advance(bar);

        let intent = {
            let ctx = BarContext {
                index,
                bars: &series.bars()[..=index],
                indicators: self.indicators.view(),
                account: self.broker.snapshot(bar.close),
            };
            self.strategy.on_bar(&ctx)
        };

        if let Some(order) = Order::from_intent(intent, index) {
            let outcome = self.broker.submit(order, index, series)?;
            self.apply_outcome(index, outcome);
        }

        self.equity_curve.push(EquitySnapshot {
            bar_index: index,
            timestamp: bar.timestamp,
            equity: self.broker.equity(bar.close),
            cash: self.broker.cash(),
            position_quantity: self.broker.position().map_or(0.0, |p| p.quantity),
        });
        Ok(())
    }

    fn apply_outcome(&mut self, index: usize, outcome: OrderOutcome) {
        match outcome {
            OrderOutcome::Filled { fill, trade } => {
                debug!(
                    bar_index = index,
                    side = ?fill.side,
                    quantity = fill.quantity,
                    price = fill.price,
                    "order filled"
                );
                self.fills.push(fill);
                if let Some(trade) = trade {
                    self.trades.push(trade);
                }
            }
            OrderOutcome::Deferred => {}
            OrderOutcome::Rejected(OrderRejection::NoBarToFill) => {
                self.diagnostics.record(
                    index,
                    DiagnosticKind::PendingOrderDropped,
                    "next-open order on the final bar was dropped",
                );
            }
            OrderOutcome::Rejected(reason) => {
                self.diagnostics
                    .record(index, DiagnosticKind::OrderRejected, reason.to_string());
            }
        }
    }

    /// Force-close at the last bar. The last snapshot's equity and cash are
    /// updated for the exit commission; its position quantity is kept so the
    /// bar still counts as exposed.
    fn close_out(&mut self) -> Result<(), EngineError> {
        if !self.config.close_at_end {
            return Ok(());
        }
        let last = self.series.len() - 1;
        let bar = self.series.last();
        let Some((fill, trade)) = self.broker.force_close(last, bar)? else {
            return Ok(());
        };

        self.diagnostics.record(
            last,
            DiagnosticKind::ForceClose,
            format!(
                "closed {} units at {} (pnl {:.2})",
                fill.quantity, fill.price, trade.pnl
            ),
        );
        if let Some(snapshot) = self.equity_curve.last_mut() {
            snapshot.equity = self.broker.equity(bar.close);
            snapshot.cash = self.broker.cash();
        }
        self.fills.push(fill);
        self.trades.push(trade);
        Ok(())
    }
}

/// Build the strategy from `strategy`, run it over `series`, and analyze.
pub fn run_backtest(
    series: &BarSeries,
    strategy: &StrategyConfig,
    config: &EngineConfig,
) -> Result<Report, EngineError> {
    let strategy = strategy.build()?;
    let output = Simulation::new(series, strategy, config.clone())?.run()?;
    Ok(Report::from_run(output))
}
