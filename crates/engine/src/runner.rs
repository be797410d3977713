use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Mutex};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use common::{Broker, CandleSource, Config, Error, OrderSink};
use strategy::{Decision, IntentPurpose, Strategy};

use crate::executor::{ExecutionReport, OrderExecutor};

/// Timing knobs for the polling loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunnerSettings {
    pub poll_interval: Duration,
    /// Minimum time between a filled trade and the next entry of the same strategy.
    pub trade_cooldown: Duration,
    /// Applied to each candle fetch and each order submission.
    pub request_timeout: Duration,
}

impl RunnerSettings {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            poll_interval: cfg.poll_interval,
            trade_cooldown: cfg.trade_cooldown,
            request_timeout: cfg.request_timeout,
        }
    }
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(60),
            trade_cooldown: Duration::from_secs(180),
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// What one poll of one strategy did.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// The last fill is too recent to enter again and there was nothing to exit.
    CoolingDown { remaining: Duration },
    InsufficientData { required: usize, available: usize },
    NoSignal,
    Executed(Vec<ExecutionReport>),
    FetchFailed(String),
    /// The broker returned candles the strategy refused to evaluate.
    DataError(String),
}

struct Slot {
    strategy: Arc<dyn Strategy>,
    /// Held for the whole cycle so the cooldown check and its update are atomic.
    last_trade: Mutex<Option<Instant>>,
}

/// Polls every strategy on a fixed interval and executes what they decide.
pub struct Runner {
    candles: Arc<dyn CandleSource>,
    executor: OrderExecutor,
    slots: Vec<Slot>,
    settings: RunnerSettings,
}

impl Runner {
    pub fn new(
        candles: Arc<dyn CandleSource>,
        orders: Arc<dyn OrderSink>,
        strategies: Vec<Arc<dyn Strategy>>,
        settings: RunnerSettings,
    ) -> Self {
        let slots = strategies
            .into_iter()
            .map(|strategy| Slot {
                strategy,
                last_trade: Mutex::new(None),
            })
            .collect();
        Self {
            candles,
            executor: OrderExecutor::new(orders, settings.request_timeout),
            slots,
            settings,
        }
    }

    /// Runner whose candles and orders both go through `broker`.
    pub fn with_broker<B: Broker + 'static>(
        broker: Arc<B>,
        strategies: Vec<Arc<dyn Strategy>>,
        settings: RunnerSettings,
    ) -> Self {
        Self::new(broker.clone(), broker, strategies, settings)
    }

    pub fn settings(&self) -> RunnerSettings {
        self.settings
    }

    /// Run one cycle for every strategy, in registration order.
    pub async fn poll_all(&self) -> Vec<(String, CycleOutcome)> {
        let mut outcomes = Vec::with_capacity(self.slots.len());
        for slot in &self.slots {
            let outcome = self.run_cycle(slot).await;
            outcomes.push((slot.strategy.name().to_string(), outcome));
        }
        outcomes
    }

    /// Poll until `shutdown` turns true or its sender is dropped.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(
            strategies = self.slots.len(),
            poll_interval = ?self.settings.poll_interval,
            trade_cooldown = ?self.settings.trade_cooldown,
            "Runner started"
        );

        let mut ticker = tokio::time::interval(self.settings.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.poll_all().await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("Runner stopped");
    }

    async fn run_cycle(&self, slot: &Slot) -> CycleOutcome {
        let strategy = &slot.strategy;
        let mut last_trade = slot.last_trade.lock().await;

        let bars = match self.fetch(strategy.as_ref()).await {
            Ok(bars) => bars,
            Err(e @ Error::InvalidCandle { .. }) => {
                warn!(strategy = %strategy.name(), error = %e, "Broker returned malformed candles");
                return CycleOutcome::DataError(e.to_string());
            }
            Err(e) => {
                warn!(strategy = %strategy.name(), error = %e, "Candle fetch failed");
                return CycleOutcome::FetchFailed(e.to_string());
            }
        };

        let decision = match strategy.evaluate(&bars) {
            Ok(decision) => decision,
            Err(e) => {
                warn!(strategy = %strategy.name(), error = %e, "Evaluation rejected candles");
                return CycleOutcome::DataError(e.to_string());
            }
        };
        debug!(strategy = %strategy.name(), ?decision, "Evaluated");

        let intents = match decision {
            Decision::InsufficientData {
                required,
                available,
            } => {
                info!(strategy = %strategy.name(), required, available, "Not enough candles yet");
                return CycleOutcome::InsufficientData {
                    required,
                    available,
                };
            }
            Decision::Hold => {
                info!(strategy = %strategy.name(), "No trading signal");
                return CycleOutcome::NoSignal;
            }
            Decision::Act(intents) => intents,
        };

        // The cooldown gates entries only.
        let intents = match self.cooldown_remaining(*last_trade) {
            Some(remaining) => {
                let (exits, entries): (Vec<_>, Vec<_>) = intents
                    .into_iter()
                    .partition(|i| matches!(i.purpose, IntentPurpose::Exit(_)));
                if !entries.is_empty() {
                    info!(
                        strategy = %strategy.name(),
                        ?remaining,
                        skipped = entries.len(),
                        "Cooling down; entry skipped"
                    );
                }
                if exits.is_empty() {
                    return CycleOutcome::CoolingDown { remaining };
                }
                exits
            }
            None => intents,
        };

        let mut reports = Vec::with_capacity(intents.len());
        for intent in &intents {
            reports.push(self.executor.execute(intent).await);
        }

        if reports.iter().any(ExecutionReport::is_filled) {
            *last_trade = Some(Instant::now());
        }
        info!(
            strategy = %strategy.name(),
            orders = reports.len(),
            filled = reports.iter().filter(|r| r.is_filled()).count(),
            "Cycle executed"
        );
        CycleOutcome::Executed(reports)
    }

    /// Time left before another entry may be placed, if any.
    fn cooldown_remaining(&self, last_trade: Option<Instant>) -> Option<Duration> {
        let elapsed = last_trade?.elapsed();
        self.settings
            .trade_cooldown
            .checked_sub(elapsed)
            .filter(|remaining| !remaining.is_zero())
    }

    async fn fetch(&self, strategy: &dyn Strategy) -> common::Result<Vec<common::Bar>> {
        let timeout = self.settings.request_timeout;
        tokio::time::timeout(
            timeout,
            self.candles.fetch_candles(
                strategy.instrument(),
                strategy.granularity(),
                strategy.candles(),
            ),
        )
        .await
        .unwrap_or(Err(Error::Timeout {
            operation: "candle fetch",
            after: timeout,
        }))
    }
}
