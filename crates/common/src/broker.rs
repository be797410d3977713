use async_trait::async_trait;

use crate::{Bar, Granularity, Order, OrderOutcome, Result};

/// Source of historical price bars.
///
/// Implementations must return bars oldest-first with `index` set to each
/// bar's position in the returned sequence.
#[async_trait]
pub trait CandleSource: Send + Sync {
    async fn fetch_candles(
        &self,
        instrument: &str,
        granularity: Granularity,
        count: usize,
    ) -> Result<Vec<Bar>>;
}

/// Destination for market orders.
///
/// A broker that refuses or cancels the order answers `Ok(OrderOutcome::Rejected)`;
/// `Err` is reserved for failures to reach the broker at all.
#[async_trait]
pub trait OrderSink: Send + Sync {
    async fn submit_market_order(&self, order: &Order) -> Result<OrderOutcome>;
}

/// Anything that can both serve candles and take orders.
///
/// `OandaClient` implements this for live and practice accounts.
/// `PaperBroker` implements this for simulation.
pub trait Broker: CandleSource + OrderSink {}

impl<T: CandleSource + OrderSink> Broker for T {}
