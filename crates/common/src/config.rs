use std::time::Duration;

use tracing::debug;

use crate::{Error, Result, TradingMode};

/// All runtime configuration loaded from environment variables at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // Broker credentials
    pub oanda_access_token: String,
    pub oanda_account_id: String,

    // Trading
    pub trading_mode: TradingMode,
    pub paper_slippage_bps: f64,

    // Loop timing
    pub poll_interval: Duration,
    pub trade_cooldown: Duration,
    pub request_timeout: Duration,

    // Strategy config file path
    pub strategy_config_path: String,
}

impl Config {
    /// Load configuration from the process environment.
    /// Loads `.env` if present.
    pub fn from_env() -> Result<Self> {
        if let Err(e) = dotenvy::dotenv() {
            debug!("No .env file loaded: {e}");
        }
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    pub fn from_vars<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key).filter(|v| !v.trim().is_empty()).ok_or_else(|| {
                Error::Config(format!(
                    "Required environment variable '{key}' is not set. Check your .env file."
                ))
            })
        };

        let trading_mode: TradingMode = required("TRADING_MODE")?.parse()?;

        Ok(Config {
            oanda_access_token: required("OANDA_ACCESS_TOKEN")?,
            oanda_account_id: required("OANDA_ACCOUNT_ID")?,
            trading_mode,
            paper_slippage_bps: parse_or(&lookup, "PAPER_SLIPPAGE_BPS", 1.0)?,
            poll_interval: positive_secs(&lookup, "POLL_INTERVAL_SECS", 60)?,
            trade_cooldown: Duration::from_secs(parse_or(&lookup, "TRADE_COOLDOWN_SECS", 180)?),
            request_timeout: positive_secs(&lookup, "REQUEST_TIMEOUT_SECS", 10)?,
            strategy_config_path: lookup("STRATEGY_CONFIG_PATH")
                .unwrap_or_else(|| "config/strategies.toml".to_string()),
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| Error::Config(format!("{key} has an invalid value: '{raw}'"))),
    }
}

fn positive_secs<F>(lookup: &F, key: &str, default: u64) -> Result<Duration>
where
    F: Fn(&str) -> Option<String>,
{
    match parse_or(lookup, key, default)? {
        0 => Err(Error::Config(format!("{key} must be greater than zero"))),
        secs => Ok(Duration::from_secs(secs)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn loads_required_and_defaults() {
        let env = vars(&[
            ("TRADING_MODE", "practice"),
            ("OANDA_ACCESS_TOKEN", "token"),
            ("OANDA_ACCOUNT_ID", "101-001-1"),
        ]);
        let cfg = Config::from_vars(|k| env.get(k).cloned()).unwrap();
        assert_eq!(cfg.trading_mode, TradingMode::Practice);
        assert_eq!(cfg.poll_interval, Duration::from_secs(60));
        assert_eq!(cfg.trade_cooldown, Duration::from_secs(180));
        assert_eq!(cfg.strategy_config_path, "config/strategies.toml");
    }

    #[test]
    fn missing_token_is_a_config_error() {
        let env = vars(&[("TRADING_MODE", "live"), ("OANDA_ACCOUNT_ID", "1")]);
        let err = Config::from_vars(|k| env.get(k).cloned()).unwrap_err();
        assert!(matches!(err, Error::Config(msg) if msg.contains("OANDA_ACCESS_TOKEN")));
    }

    #[test]
    fn unknown_trading_mode_is_rejected() {
        let env = vars(&[
            ("TRADING_MODE", "demo"),
            ("OANDA_ACCESS_TOKEN", "t"),
            ("OANDA_ACCOUNT_ID", "1"),
        ]);
        assert!(Config::from_vars(|k| env.get(k).cloned()).is_err());
    }

    #[test]
    fn malformed_number_is_rejected() {
        let env = vars(&[
            ("TRADING_MODE", "paper"),
            ("OANDA_ACCESS_TOKEN", "t"),
            ("OANDA_ACCOUNT_ID", "1"),
            ("POLL_INTERVAL_SECS", "soon"),
        ]);
        let err = Config::from_vars(|k| env.get(k).cloned()).unwrap_err();
        assert!(err.to_string().contains("POLL_INTERVAL_SECS"));

        for key in ["POLL_INTERVAL_SECS", "REQUEST_TIMEOUT_SECS"] {
            let env = vars(&[
                ("TRADING_MODE", "paper"),
                ("OANDA_ACCESS_TOKEN", "t"),
                ("OANDA_ACCOUNT_ID", "1"),
                (key, "0"),
            ]);
            let err = Config::from_vars(|k| env.get(k).cloned()).unwrap_err();
            assert!(matches!(err, Error::Config(ref msg) if msg.contains(key)), "{key}: {err}");
        }
    }

    #[test]
    fn zero_cooldown_is_allowed() {
        let env = vars(&[
            ("TRADING_MODE", "paper"),
            ("OANDA_ACCESS_TOKEN", "t"),
            ("OANDA_ACCOUNT_ID", "1"),
            ("TRADE_COOLDOWN_SECS", "0"),
        ]);
        let cfg = Config::from_vars(|k| env.get(k).cloned()).unwrap();
        assert_eq!(cfg.trade_cooldown, Duration::ZERO);
    }
}
