//! Broker: cash, the single open position, and market order execution.
//!
//! The broker turns orders into fills against one bar's price, charges
//! commission on both legs, and hands back a completed `Trade` whenever the
//! position goes flat. Problems a strategy can cause by itself are returned as
//! `OrderRejection`s and leave state untouched. A fill price outside the fill
//! bar's range is an engine bug and fails the run with `InvalidFill`.

use serde::Serialize;
use thiserror::Error;

use crate::domain::{Bar, BarSeries, ExitReason, Fill, Order, OrderSide, Position, Trade};
use crate::engine::{EngineConfig, FillPolicy};
use crate::error::EngineError;

/// Slack allowed when comparing a purchase cost against cash.
const CASH_EPSILON: f64 = 1e-9;

/// Why an order was turned into a no-op.
#[derive(Debug, Clone, PartialEq, Serialize, Error)]
#[serde(rename_all = "snake_case")]
pub enum OrderRejection {
    #[error("computed quantity rounds to zero")]
    ZeroQuantity,
    #[error("buy while already long")]
    AlreadyLong,
    #[error("sell while not long")]
    NotLong,
    #[error("insufficient cash: need {required:.2}, have {available:.2}")]
    InsufficientCash { required: f64, available: f64 },
    #[error("invalid order sizing")]
    InvalidSizing,
    #[error("no later bar to fill at")]
    NoBarToFill,
}

/// Result of handing an order to the broker.
#[derive(Debug, Clone, PartialEq)]
pub enum OrderOutcome {
    Filled { fill: Fill, trade: Option<Trade> },
    /// Parked until the next bar's open.
    Deferred,
    Rejected(OrderRejection),
}

/// Read-only account state handed to strategies.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountSnapshot {
    pub cash: f64,
    pub position: Option<Position>,
    pub equity: f64,
}

impl AccountSnapshot {
    pub fn is_flat(&self) -> bool {
        self.position.is_none()
    }

    pub fn is_long(&self) -> bool {
        self.position.as_ref().is_some_and(Position::is_long)
    }

    pub fn position_quantity(&self) -> f64 {
        self.position.as_ref().map_or(0.0, |p| p.quantity)
    }
}

#[derive(Debug, Clone)]
pub struct Broker {
    cash: f64,
    position: Option<Position>,
    commission_rate: f64,
    lot_size: f64,
    fill_policy: FillPolicy,
    pending: Option<Order>,
    commission_paid: f64,
}

impl Broker {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            cash: config.initial_cash,
            position: None,
            commission_rate: config.commission_rate,
            lot_size: config.lot_size,
            fill_policy: config.fill_policy,
            pending: None,
            commission_paid: 0.0,
        }
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn position(&self) -> Option<&Position> {
        self.position.as_ref()
    }

    pub fn pending(&self) -> Option<&Order> {
        self.pending.as_ref()
    }

    pub fn commission_paid(&self) -> f64 {
        self.commission_paid
    }

    pub fn fill_policy(&self) -> FillPolicy {
        self.fill_policy
    }

    /// Cash plus the position marked at `mark`.
    pub fn equity(&self, mark: f64) -> f64 {
        self.cash + self.position.as_ref().map_or(0.0, |p| p.market_value(mark))
    }

    pub fn snapshot(&self, mark: f64) -> AccountSnapshot {
        AccountSnapshot {
            cash: self.cash,
            position: self.position.clone(),
            equity: self.equity(mark),
        }
    }

    /// Submit an order generated at `bar_index`.
    ///
    /// At-close fills immediately at that bar's close. Next-open parks the
    /// order for [`Broker::execute_pending`]; on the final bar there is no
    /// next open and the order is rejected with `NoBarToFill`.
    pub fn submit(
        &mut self,
        order: Order,
        bar_index: usize,
        series: &BarSeries,
    ) -> Result<OrderOutcome, EngineError> {
        match self.fill_policy {
            FillPolicy::AtClose => {
                let bar = series.get(bar_index)?;
                self.execute(&order, bar_index, bar, bar.close)
            }
            FillPolicy::NextOpen => {
                if bar_index + 1 >= series.len() {
                    return Ok(OrderOutcome::Rejected(OrderRejection::NoBarToFill));
                }
                self.pending = Some(order);
                Ok(OrderOutcome::Deferred)
            }
        }
    }

    /// Fill a parked order at bar `bar_index`'s open. `None` if nothing is parked.
    pub fn execute_pending(
        &mut self,
        bar_index: usize,
        series: &BarSeries,
    ) -> Result<Option<OrderOutcome>, EngineError> {
        let Some(order) = self.pending.take() else {
            return Ok(None);
        };
        let bar = series.get(bar_index)?;
        self.execute(&order, bar_index, bar, bar.open).map(Some)
    }

    /// Drop a parked order without filling it.
    pub fn cancel_pending(&mut self) -> Option<Order> {
        self.pending.take()
    }

    /// Close any open position at `bar`'s close.
    pub fn force_close(
        &mut self,
        bar_index: usize,
        bar: &Bar,
    ) -> Result<Option<(Fill, Trade)>, EngineError> {
        if self.position.is_none() {
            return Ok(None);
        }
        let (fill, trade) = self.close_position(bar_index, bar, bar.close, ExitReason::ForceClose)?;
        Ok(Some((fill, trade)))
    }

    fn execute(
        &mut self,
        order: &Order,
        bar_index: usize,
        bar: &Bar,
        price: f64,
    ) -> Result<OrderOutcome, EngineError> {
        match order.side {
            OrderSide::Sell => {
                if !self.position.as_ref().is_some_and(Position::is_long) {
                    return Ok(OrderOutcome::Rejected(OrderRejection::NotLong));
                }
                let (fill, trade) =
                    self.close_position(bar_index, bar, price, ExitReason::Signal)?;
                Ok(OrderOutcome::Filled {
                    fill,
                    trade: Some(trade),
                })
            }
            OrderSide::Buy => self.buy(order, bar_index, bar, price),
        }
    }

    fn buy(
        &mut self,
        order: &Order,
        bar_index: usize,
        bar: &Bar,
        price: f64,
    ) -> Result<OrderOutcome, EngineError> {
        let Some(sizing) = order.sizing.filter(|s| s.is_valid()) else {
            return Ok(OrderOutcome::Rejected(OrderRejection::InvalidSizing));
        };
        if self.position.is_some() && !order.scale_in {
            return Ok(OrderOutcome::Rejected(OrderRejection::AlreadyLong));
        }

        let quantity = sizing.quantity(self.equity(price), price, self.lot_size);
        if quantity <= 0.0 {
            return Ok(OrderOutcome::Rejected(OrderRejection::ZeroQuantity));
        }

        let notional = quantity * price;
        let commission = notional * self.commission_rate;
        let required = notional + commission;
        if required > self.cash + CASH_EPSILON {
            return Ok(OrderOutcome::Rejected(OrderRejection::InsufficientCash {
                required,
                available: self.cash,
            }));
        }

        validate_fill_price(bar_index, bar, price)?;

        self.cash = (self.cash - required).max(0.0);
        self.commission_paid += commission;
        let scale_in = match self.position.as_mut() {
            Some(position) => {
                position.scale_in(quantity, price, commission);
                true
            }
            None => {
                self.position = Some(Position::open(
                    quantity,
                    price,
                    bar_index,
                    bar.timestamp,
                    commission,
                ));
                false
            }
        };

        Ok(OrderOutcome::Filled {
            fill: Fill {
                bar_index,
                timestamp: bar.timestamp,
                side: OrderSide::Buy,
                quantity,
                price,
                commission,
                scale_in,
            },
            trade: None,
        })
    }

    fn close_position(
        &mut self,
        bar_index: usize,
        bar: &Bar,
        price: f64,
        reason: ExitReason,
    ) -> Result<(Fill, Trade), EngineError> {
        validate_fill_price(bar_index, bar, price)?;
        let Some(position) = self.position.take() else {
            return Err(EngineError::InvalidState {
                state: "flat",
                action: "close a position",
            });
        };

        let quantity = position.quantity.abs();
        let notional = quantity * price;
        let commission = notional * self.commission_rate;
        self.cash += position.quantity.signum() * notional - commission;
        self.commission_paid += commission;

        let trade = Trade::close(&position, bar_index, bar.timestamp, price, commission, reason);
        let fill = Fill {
            bar_index,
            timestamp: bar.timestamp,
            side: OrderSide::Sell,
            quantity,
            price,
            commission,
            scale_in: false,
        };
        Ok((fill, trade))
    }
}

fn validate_fill_price(bar_index: usize, bar: &Bar, price: f64) -> Result<(), EngineError> {
    if price.is_finite() && bar.contains(price) {
        Ok(())
    } else {
        Err(EngineError::InvalidFill {
            bar_index,
            price,
            low: bar.low,
            high: bar.high,
        })
    }
}
