use std::collections::HashMap;

use common::{Error, Granularity, Result};
use serde::{Deserialize, Serialize};

/// Top-level strategy config file (TOML).
///
/// Example `config/strategies.toml`:
/// ```toml
/// [[strategy]]
/// type = "crossover"
/// name = "EUR_USD MA 20/50"
/// instrument = "EUR_USD"
/// granularity = "M1"
/// units = 100
/// candles = 100
///
/// [strategy.params]
/// short_window = 20
/// long_window = 50
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StrategyFileConfig {
    #[serde(rename = "strategy")]
    pub strategies: Vec<StrategyConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StrategyConfig {
    /// Strategy type identifier: "crossover" or "fractal_ema".
    #[serde(rename = "type")]
    pub strategy_type: String,
    /// Human-readable name shown in logs.
    pub name: String,
    /// Broker instrument, e.g. "EUR_USD".
    pub instrument: String,
    /// Candle granularity to evaluate on.
    #[serde(default)]
    pub granularity: Granularity,
    /// Unsigned order size; the signal supplies the sign.
    #[serde(default = "default_units")]
    pub units: i64,
    /// Candles fetched per evaluation.
    #[serde(default = "default_candles")]
    pub candles: usize,
    /// Strategy-specific parameters.
    #[serde(default)]
    pub params: HashMap<String, toml::Value>,
}

fn default_units() -> i64 {
    100
}

fn default_candles() -> usize {
    100
}

impl StrategyFileConfig {
    /// Load from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read strategy config at '{path}': {e}")))?;
        Self::parse(&content)
            .map_err(|e| Error::Config(format!("failed to parse strategy config at '{path}': {e}")))
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(e.to_string()))
    }
}

impl StrategyConfig {
    pub fn param_f64(&self, key: &str, default: f64) -> Result<f64> {
        match self.params.get(key) {
            None => Ok(default),
            Some(v) => v
                .as_float()
                .or_else(|| v.as_integer().map(|i| i as f64))
                .ok_or_else(|| self.bad_param(key, "a number")),
        }
    }

    pub fn param_usize(&self, key: &str, default: usize) -> Result<usize> {
        match self.params.get(key) {
            None => Ok(default),
            Some(v) => v
                .as_integer()
                .and_then(|i| usize::try_from(i).ok())
                .ok_or_else(|| self.bad_param(key, "a non-negative integer")),
        }
    }

    pub fn param_bool(&self, key: &str, default: bool) -> Result<bool> {
        match self.params.get(key) {
            None => Ok(default),
            Some(v) => v.as_bool().ok_or_else(|| self.bad_param(key, "a boolean")),
        }
    }

    pub fn param_str(&self, key: &str) -> Result<Option<&str>> {
        match self.params.get(key) {
            None => Ok(None),
            Some(v) => v
                .as_str()
                .map(Some)
                .ok_or_else(|| self.bad_param(key, "a string")),
        }
    }

    fn bad_param(&self, key: &str, expected: &str) -> Error {
        Error::Config(format!(
            "strategy '{}': parameter '{key}' must be {expected}",
            self.name
        ))
    }

    #[cfg(test)]
    pub(crate) fn for_test(strategy_type: &str, instrument: &str, units: i64, candles: usize) -> Self {
        Self {
            strategy_type: strategy_type.to_string(),
            name: format!("test {strategy_type}"),
            instrument: instrument.to_string(),
            granularity: Granularity::M1,
            units,
            candles,
            params: HashMap::new(),
        }
    }
}
