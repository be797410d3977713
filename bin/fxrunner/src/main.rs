use std::sync::Arc;

use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::EnvFilter;

use common::{Config, TradingMode};
use engine::{OandaClient, Runner, RunnerSettings};
use paper::PaperBroker;
use strategy::{StrategyFileConfig, StrategyRegistry};

#[tokio::main]
async fn main() {
    // ── Logging ──────────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // ── Config ────────────────────────────────────────────────────────────────
    let cfg = Config::from_env().unwrap_or_else(|e| panic!("{e}"));
    info!(mode = %cfg.trading_mode, "FxRunner starting");

    // ── Strategies ────────────────────────────────────────────────────────────
    let strategy_file = StrategyFileConfig::load(&cfg.strategy_config_path)
        .unwrap_or_else(|e| panic!("{e}"));
    let registry = StrategyRegistry::from_config(&strategy_file)
        .unwrap_or_else(|e| panic!("Invalid strategy configuration: {e}"));
    info!(count = registry.len(), "Strategies loaded");

    // ── Broker (injected based on TRADING_MODE) ───────────────────────────────
    let settings = RunnerSettings::from_config(&cfg);
    let oanda = Arc::new(
        OandaClient::new(
            cfg.trading_mode,
            cfg.oanda_account_id.clone(),
            cfg.oanda_access_token.clone(),
            cfg.request_timeout,
        )
        .unwrap_or_else(|e| panic!("Failed to build OANDA client: {e}")),
    );

    let strategies = registry.strategies().to_vec();
    let runner = match cfg.trading_mode {
        TradingMode::Live | TradingMode::Practice => {
            info!(mode = %cfg.trading_mode, "Trading through OandaClient");
            Runner::with_broker(oanda, strategies, settings)
        }
        TradingMode::Paper => {
            info!(
                slippage_bps = cfg.paper_slippage_bps,
                "Paper trading mode: practice candles, simulated fills"
            );
            let broker = Arc::new(PaperBroker::new(oanda, cfg.paper_slippage_bps));
            Runner::with_broker(broker, strategies, settings)
        }
    };

    // ── Run until Ctrl-C ──────────────────────────────────────────────────────
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = tokio::spawn(runner.run(shutdown_rx));

    info!("Runner started. Waiting for shutdown signal.");
    tokio::signal::ctrl_c()
        .await
        .unwrap_or_else(|e| panic!("Failed to listen for Ctrl-C: {e}"));
    info!("Shutdown signal received. Stopping runner.");

    let _ = shutdown_tx.send(true);
    let _ = handle.await;
}
