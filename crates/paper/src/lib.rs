use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use common::{
    Bar, CandleSource, Fill, Granularity, Order, OrderOutcome, OrderSide, OrderSink,
    RejectionReason, Result,
};

/// Simulated broker for paper trading.
///
/// Candles come from a real source; fills are simulated at the latest fetched
/// close with configurable slippage. No order ever leaves the process.
pub struct PaperBroker {
    candles: Arc<dyn CandleSource>,
    /// Latest close per instrument, refreshed on every fetch.
    prices: RwLock<HashMap<String, f64>>,
    /// Net signed units held per instrument.
    positions: RwLock<HashMap<String, i64>>,
    /// Slippage in basis points applied to all fills.
    slippage_bps: f64,
}

impl PaperBroker {
    pub fn new(candles: Arc<dyn CandleSource>, slippage_bps: f64) -> Self {
        info!(slippage_bps, "PaperBroker initialized");
        Self {
            candles,
            prices: RwLock::new(HashMap::new()),
            positions: RwLock::new(HashMap::new()),
            slippage_bps,
        }
    }

    /// Override the price orders for `instrument` fill against.
    pub async fn update_price(&self, instrument: &str, price: f64) {
        self.prices.write().await.insert(instrument.to_string(), price);
    }

    /// Net units held in `instrument`: positive long, negative short.
    pub async fn net_units(&self, instrument: &str) -> i64 {
        self.positions.read().await.get(instrument).copied().unwrap_or(0)
    }

    fn slipped(&self, price: f64, side: OrderSide) -> f64 {
        // Buys pay more, sells receive less
        match side {
            OrderSide::Buy => price * (1.0 + self.slippage_bps / 10_000.0),
            OrderSide::Sell => price * (1.0 - self.slippage_bps / 10_000.0),
        }
    }
}

#[async_trait]
impl CandleSource for PaperBroker {
    async fn fetch_candles(
        &self,
        instrument: &str,
        granularity: Granularity,
        count: usize,
    ) -> Result<Vec<Bar>> {
        let bars = self.candles.fetch_candles(instrument, granularity, count).await?;
        if let Some(last) = bars.last() {
            self.update_price(instrument, last.close).await;
        }
        Ok(bars)
    }
}

#[async_trait]
impl OrderSink for PaperBroker {
    async fn submit_market_order(&self, order: &Order) -> Result<OrderOutcome> {
        let Some(mid) = self.prices.read().await.get(&order.instrument).copied() else {
            warn!(instrument = %order.instrument, "PaperBroker has no price; rejecting order");
            return Ok(OrderOutcome::Rejected(RejectionReason::NoPrice));
        };

        let fill_price = self.slipped(mid, order.side());

        let net = {
            let mut positions = self.positions.write().await;
            let net = positions.entry(order.instrument.clone()).or_insert(0);
            *net += order.units;
            *net
        };

        debug!(
            instrument = %order.instrument,
            side = %order.side(),
            mid,
            fill = fill_price,
            units = order.units,
            net_units = net,
            "Paper fill simulated"
        );

        Ok(OrderOutcome::Filled(Fill {
            order_id: order.id.clone(),
            trade_id: Some(format!("paper-{}", order.id)),
            instrument: order.instrument.clone(),
            units: order.units,
            fill_price: Some(fill_price),
            timestamp: Utc::now(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    struct FixedCandles(f64);

    #[async_trait]
    impl CandleSource for FixedCandles {
        async fn fetch_candles(
            &self,
            _instrument: &str,
            _granularity: Granularity,
            count: usize,
        ) -> Result<Vec<Bar>> {
            let t = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
            Ok((0..count)
                .map(|i| Bar::new(i, t + chrono::Duration::minutes(i as i64), self.0, self.0, self.0, self.0))
                .collect())
        }
    }

    fn broker(bps: f64) -> PaperBroker {
        PaperBroker::new(Arc::new(FixedCandles(1.2)), bps)
    }

    fn fill_price(outcome: OrderOutcome) -> f64 {
        match outcome {
            OrderOutcome::Filled(fill) => fill.fill_price.unwrap(),
            other => panic!("expected fill, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn paper_buy_fill_applies_positive_slippage() {
        let broker = broker(10.0);
        broker.update_price("EUR_USD", 1000.0).await;

        let price = fill_price(broker.submit_market_order(&Order::market("EUR_USD", 100)).await.unwrap());
        let expected = 1000.0 * (1.0 + 10.0 / 10_000.0);
        assert!((price - expected).abs() < 1e-6, "Buy fill price {price}, expected {expected}");
    }

    #[tokio::test]
    async fn paper_sell_fill_applies_negative_slippage() {
        let broker = broker(10.0);
        broker.update_price("EUR_USD", 1000.0).await;

        let price = fill_price(broker.submit_market_order(&Order::market("EUR_USD", -100)).await.unwrap());
        let expected = 1000.0 * (1.0 - 10.0 / 10_000.0);
        assert!((price - expected).abs() < 1e-6, "Sell fill price {price}, expected {expected}");
    }

    #[tokio::test]
    async fn fetch_sets_fill_price() {
        let broker = broker(0.0);
        broker.fetch_candles("EUR_USD", Granularity::M1, 5).await.unwrap();

        let price = fill_price(broker.submit_market_order(&Order::market("EUR_USD", 100)).await.unwrap());
        assert_eq!(price, 1.2);
    }

    #[tokio::test]
    async fn order_without_price_is_rejected() {
        let broker = broker(0.0);
        let outcome = broker.submit_market_order(&Order::market("GBP_USD", 100)).await.unwrap();
        assert_eq!(outcome, OrderOutcome::Rejected(RejectionReason::NoPrice));
        assert_eq!(broker.net_units("GBP_USD").await, 0);
    }

    #[tokio::test]
    async fn net_units_track_exit_and_reversal() {
        let broker = broker(0.0);
        broker.update_price("EUR_USD", 1.1).await;

        broker.submit_market_order(&Order::market("EUR_USD", 100)).await.unwrap();
        assert_eq!(broker.net_units("EUR_USD").await, 100);

        // Exit the long, then open a short on the same bar.
        broker.submit_market_order(&Order::market("EUR_USD", -100)).await.unwrap();
        broker.submit_market_order(&Order::market("EUR_USD", -100)).await.unwrap();
        assert_eq!(broker.net_units("EUR_USD").await, -100);
    }
}
