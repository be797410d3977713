pub mod config;
pub mod crossover;
pub mod fractal_ema;
pub mod history;
pub mod indicators;
pub mod registry;

pub use config::{StrategyConfig, StrategyFileConfig};
pub use crossover::{crossover_direction, CrossoverStrategy};
pub use fractal_ema::{FractalEmaParams, FractalEmaSeries, FractalEmaStrategy, Variant};
pub use history::{BarSignal, Carry, SignalHistory};
pub use registry::StrategyRegistry;

use common::{Bar, Direction, Error, Granularity, Result};

/// All strategy implementations must satisfy this trait.
pub trait Strategy: Send + Sync {
    /// Human-readable name of this strategy instance.
    fn name(&self) -> &str;

    /// The instrument this strategy trades (e.g. "EUR_USD").
    fn instrument(&self) -> &str;

    /// Candle granularity the strategy is evaluated on.
    fn granularity(&self) -> Granularity;

    /// Number of candles to fetch per evaluation.
    fn candles(&self) -> usize;

    /// Fewest bars for which `evaluate` can form an opinion.
    fn min_history(&self) -> usize;

    /// Evaluate the latest bar of `bars` (oldest first).
    ///
    /// Malformed bars are an error; too few bars is `Decision::InsufficientData`.
    fn evaluate(&self, bars: &[Bar]) -> Result<Decision>;
}

/// What the caller should do after an evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// Not enough history to evaluate; no opinion.
    InsufficientData { required: usize, available: usize },
    /// Nothing to do this cycle.
    Hold,
    /// Submit these orders, in order.
    Act(Vec<OrderIntent>),
}

/// Why an order is being placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntentPurpose {
    Entry(Direction),
    /// Close out a position held in the given direction.
    Exit(Direction),
}

/// An order the strategy wants placed.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderIntent {
    pub instrument: String,
    /// Signed unit count: positive buys, negative sells.
    pub units: i64,
    pub purpose: IntentPurpose,
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
}

impl OrderIntent {
    pub fn to_order(&self) -> common::Order {
        common::Order::market(self.instrument.clone(), self.units)
            .with_levels(self.stop_loss, self.take_profit)
    }
}

/// Reject bars that would put undefined values into a comparison.
///
/// Checks every price is finite, `low <= high`, and indices ascend strictly.
pub fn validate_bars(bars: &[Bar]) -> Result<()> {
    for (pos, bar) in bars.iter().enumerate() {
        let prices = [bar.open, bar.high, bar.low, bar.close];
        if prices.iter().any(|p| !p.is_finite()) {
            return Err(Error::InvalidCandle {
                index: bar.index,
                reason: "non-finite price".into(),
            });
        }
        if bar.low > bar.high {
            return Err(Error::InvalidCandle {
                index: bar.index,
                reason: format!("low {} above high {}", bar.low, bar.high),
            });
        }
        if pos > 0 && bar.index <= bars[pos - 1].index {
            return Err(Error::InvalidCandle {
                index: bar.index,
                reason: "bar indices are not strictly ascending".into(),
            });
        }
    }
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::test_support::bars_from_closes;
    use super::*;

    #[test]
    fn validate_accepts_well_formed_bars() {
        assert!(validate_bars(&bars_from_closes(&[1.0, 2.0, 3.0])).is_ok());
    }

    #[test]
    fn validate_rejects_nan_close() {
        let mut bars = bars_from_closes(&[1.0, 2.0, 3.0]);
        bars[1].close = f64::NAN;
        let err = validate_bars(&bars).unwrap_err();
        assert!(matches!(err, Error::InvalidCandle { index: 1, .. }));
    }

    #[test]
    fn validate_rejects_inverted_range() {
        let mut bars = bars_from_closes(&[1.0, 2.0]);
        bars[0].low = 5.0;
        assert!(validate_bars(&bars).is_err());
    }

    #[test]
    fn validate_rejects_duplicate_index() {
        let mut bars = bars_from_closes(&[1.0, 2.0]);
        bars[1].index = 0;
        assert!(validate_bars(&bars).is_err());
    }
}
