use common::{Bar, Direction, Error, Granularity, Result};
use tracing::debug;

use crate::config::StrategyConfig;
use crate::indicators::sma;
use crate::{validate_bars, Decision, IntentPurpose, OrderIntent, Strategy};

/// Moving-average crossover on closing prices.
///
/// Buys when the short SMA crosses above the long SMA between the previous
/// and the latest bar, sells on the opposite cross. Holds no position state.
#[derive(Debug, Clone)]
pub struct CrossoverStrategy {
    cfg: StrategyConfig,
    short_window: usize,
    long_window: usize,
}

impl CrossoverStrategy {
    pub const DEFAULT_SHORT: usize = 20;
    pub const DEFAULT_LONG: usize = 50;

    pub fn new(cfg: StrategyConfig, short_window: usize, long_window: usize) -> Result<Self> {
        if short_window == 0 {
            return Err(Error::Config(format!(
                "strategy '{}': short_window must be positive",
                cfg.name
            )));
        }
        if short_window >= long_window {
            return Err(Error::Config(format!(
                "strategy '{}': short_window ({short_window}) must be less than long_window ({long_window})",
                cfg.name
            )));
        }
        Ok(Self {
            cfg,
            short_window,
            long_window,
        })
    }

    pub fn short_window(&self) -> usize {
        self.short_window
    }

    pub fn long_window(&self) -> usize {
        self.long_window
    }
}

/// Classify a crossover between the previous and the current bar.
pub fn crossover_direction(
    prev_short: f64,
    prev_long: f64,
    curr_short: f64,
    curr_long: f64,
) -> Direction {
    if prev_short <= prev_long && curr_short > curr_long {
        Direction::Long
    } else if prev_short >= prev_long && curr_short < curr_long {
        Direction::Short
    } else {
        Direction::None
    }
}

impl Strategy for CrossoverStrategy {
    fn name(&self) -> &str {
        &self.cfg.name
    }

    fn instrument(&self) -> &str {
        &self.cfg.instrument
    }

    fn granularity(&self) -> Granularity {
        self.cfg.granularity
    }

    fn candles(&self) -> usize {
        self.cfg.candles
    }

    /// Both averages need a previous value.
    fn min_history(&self) -> usize {
        self.long_window + 1
    }

    fn evaluate(&self, bars: &[Bar]) -> Result<Decision> {
        validate_bars(bars)?;
        if bars.len() < self.min_history() {
            return Ok(Decision::InsufficientData {
                required: self.min_history(),
                available: bars.len(),
            });
        }

        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let short = sma(&closes, self.short_window);
        let long = sma(&closes, self.long_window);

        let n = closes.len();
        let (Some(prev_short), Some(prev_long), Some(curr_short), Some(curr_long)) =
            (short[n - 2], long[n - 2], short[n - 1], long[n - 1])
        else {
            return Ok(Decision::InsufficientData {
                required: self.min_history(),
                available: bars.len(),
            });
        };

        debug!(
            strategy = %self.cfg.name,
            short_ma = curr_short,
            long_ma = curr_long,
            "Latest moving averages"
        );

        let direction = crossover_direction(prev_short, prev_long, curr_short, curr_long);
        if direction == Direction::None {
            return Ok(Decision::Hold);
        }

        Ok(Decision::Act(vec![OrderIntent {
            instrument: self.cfg.instrument.clone(),
            units: direction.sign() * self.cfg.units,
            purpose: IntentPurpose::Entry(direction),
            stop_loss: None,
            take_profit: None,
        }]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::bars_from_closes;

    fn cfg() -> StrategyConfig {
        StrategyConfig::for_test("crossover", "EUR_USD", 100, 100)
    }

    #[test]
    fn rejects_short_window_not_below_long() {
        assert!(CrossoverStrategy::new(cfg(), 50, 50).is_err());
        assert!(CrossoverStrategy::new(cfg(), 60, 50).is_err());
        assert!(CrossoverStrategy::new(cfg(), 0, 50).is_err());
    }

    #[test]
    fn upward_cross_is_buy() {
        assert_eq!(crossover_direction(0.9, 1.0, 1.1, 1.0), Direction::Long);
    }

    #[test]
    fn touch_then_cross_is_buy() {
        assert_eq!(crossover_direction(1.0, 1.0, 1.1, 1.0), Direction::Long);
    }

    #[test]
    fn downward_cross_is_sell() {
        assert_eq!(crossover_direction(1.1, 1.0, 0.9, 1.0), Direction::Short);
    }

    #[test]
    fn no_cross_is_none() {
        assert_eq!(crossover_direction(1.1, 1.0, 1.2, 1.0), Direction::None);
        assert_eq!(crossover_direction(1.0, 1.0, 1.0, 1.0), Direction::None);
    }

    #[test]
    fn buy_on_latest_bar_emits_positive_units() {
        let strategy = CrossoverStrategy::new(cfg(), 2, 4).unwrap();
        // SMA2/SMA4 at bar 5: 2.0 / 2.5; at bar 6: 3.5 / 3.25.
        let bars = bars_from_closes(&[3.0, 3.0, 3.0, 3.0, 3.0, 1.0, 6.0]);
        let decision = strategy.evaluate(&bars).unwrap();
        let Decision::Act(intents) = decision else {
            panic!("expected an order, got {decision:?}");
        };
        assert_eq!(intents.len(), 1);
        assert_eq!(intents[0].units, 100);
        assert_eq!(intents[0].purpose, IntentPurpose::Entry(Direction::Long));
    }

    #[test]
    fn sell_on_latest_bar_emits_negative_units() {
        let strategy = CrossoverStrategy::new(cfg(), 2, 4).unwrap();
        let bars = bars_from_closes(&[3.0, 3.0, 3.0, 3.0, 3.0, 5.0, 0.0]);
        match strategy.evaluate(&bars).unwrap() {
            Decision::Act(intents) => assert_eq!(intents[0].units, -100),
            other => panic!("expected sell, got {other:?}"),
        }
    }

    #[test]
    fn flat_prices_hold() {
        let strategy = CrossoverStrategy::new(cfg(), 2, 4).unwrap();
        let bars = bars_from_closes(&[3.0; 10]);
        assert_eq!(strategy.evaluate(&bars).unwrap(), Decision::Hold);
    }

    #[test]
    fn too_few_bars_is_insufficient_data() {
        let strategy = CrossoverStrategy::new(cfg(), 2, 4).unwrap();
        let bars = bars_from_closes(&[3.0; 4]);
        assert_eq!(
            strategy.evaluate(&bars).unwrap(),
            Decision::InsufficientData {
                required: 5,
                available: 4
            }
        );
    }
}
