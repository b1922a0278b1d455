//! Single lump-sum investment on the first bar, then hold.

use super::{BarContext, Strategy};
use crate::domain::{OrderIntent, Sizing};
use crate::error::EngineError;

#[derive(Debug, Clone)]
pub struct LumpSum {
    pub investment: f64,
}

impl LumpSum {
    pub fn new(investment: f64) -> Result<Self, EngineError> {
        if !investment.is_finite() || investment <= 0.0 {
            return Err(EngineError::InvalidParameter(format!(
                "investment must be finite and > 0, got {investment}"
            )));
        }
        Ok(Self { investment })
    }
}

impl Strategy for LumpSum {
    fn name(&self) -> &str {
        "lump_sum"
    }

    fn on_bar(&mut self, ctx: &BarContext<'_>) -> OrderIntent {
        if ctx.is_first_bar() {
            OrderIntent::Buy(Sizing::Units(self.investment / ctx.bar().close))
        } else {
            OrderIntent::Hold
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::AccountSnapshot;
    use crate::domain::make_series;
    use crate::indicators::IndicatorEngine;

    #[test]
    fn buys_only_on_first_bar() {
        let series = make_series(&[100.0, 101.0, 102.0]);
        let engine = IndicatorEngine::new();
        let mut s = LumpSum::new(12_000.0).unwrap();

        let intents: Vec<OrderIntent> = (0..series.len())
            .map(|i| {
                s.on_bar(&BarContext {
                    index: i,
                    bars: &series.bars()[..=i],
                    indicators: engine.view(),
                    account: AccountSnapshot {
                        cash: 12_000.0,
                        position: None,
                        equity: 12_000.0,
                    },
                })
            })
            .collect();

        assert_eq!(intents[0], OrderIntent::Buy(Sizing::Units(120.0)));
        assert!(intents[1..].iter().all(OrderIntent::is_hold));
    }

    #[test]
    fn rejects_non_positive_investment() {
        assert!(LumpSum::new(-1.0).is_err());
        assert!(LumpSum::new(f64::INFINITY).is_err());
    }
}
