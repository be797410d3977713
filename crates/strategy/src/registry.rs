use std::sync::Arc;

use tracing::info;

use common::{Error, Result};

use crate::config::{StrategyConfig, StrategyFileConfig};
use crate::crossover::CrossoverStrategy;
use crate::fractal_ema::{FractalEmaParams, FractalEmaStrategy};
use crate::Strategy;

/// Holds every configured strategy instance.
pub struct StrategyRegistry {
    strategies: Vec<Arc<dyn Strategy>>,
}

impl StrategyRegistry {
    /// Build the registry from config. Any invalid entry fails the whole load.
    pub fn from_config(file_cfg: &StrategyFileConfig) -> Result<Self> {
        if file_cfg.strategies.is_empty() {
            return Err(Error::Config("strategy file defines no strategies".into()));
        }

        let mut strategies: Vec<Arc<dyn Strategy>> = Vec::new();
        for cfg in &file_cfg.strategies {
            let strategy = build_strategy(cfg)?;
            info!(
                name = %strategy.name(),
                instrument = %strategy.instrument(),
                granularity = %strategy.granularity(),
                min_history = strategy.min_history(),
                "Registered strategy"
            );
            strategies.push(strategy);
        }

        Ok(Self { strategies })
    }

    pub fn strategies(&self) -> &[Arc<dyn Strategy>] {
        &self.strategies
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}

// ─── Strategy builders ────────────────────────────────────────────────────────

fn build_strategy(cfg: &StrategyConfig) -> Result<Arc<dyn Strategy>> {
    if cfg.units <= 0 {
        return Err(Error::Config(format!(
            "strategy '{}': units must be positive, got {}",
            cfg.name, cfg.units
        )));
    }

    let strategy: Arc<dyn Strategy> = match cfg.strategy_type.as_str() {
        "crossover" => {
            let short = cfg.param_usize("short_window", CrossoverStrategy::DEFAULT_SHORT)?;
            let long = cfg.param_usize("long_window", CrossoverStrategy::DEFAULT_LONG)?;
            Arc::new(CrossoverStrategy::new(cfg.clone(), short, long)?)
        }
        "fractal_ema" => {
            let params = FractalEmaParams::from_config(cfg)?;
            Arc::new(FractalEmaStrategy::new(cfg.clone(), params)?)
        }
        other => {
            return Err(Error::Config(format!(
                "strategy '{}': unknown type '{other}'",
                cfg.name
            )))
        }
    };

    if cfg.candles < strategy.min_history() {
        return Err(Error::Config(format!(
            "strategy '{}': candles ({}) is below the minimum history of {} bars",
            cfg.name,
            cfg.candles,
            strategy.min_history()
        )));
    }

    Ok(strategy)
}
