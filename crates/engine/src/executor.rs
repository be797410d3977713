use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use common::{Error, Fill, Order, OrderOutcome, OrderSink, RejectionReason};
use strategy::OrderIntent;

/// Result of submitting one order intent.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionReport {
    Filled(Fill),
    Rejected { order: Order, reason: RejectionReason },
    /// The broker could not be reached or did not answer in time.
    Failed { order: Order, error: String },
}

impl ExecutionReport {
    pub fn is_filled(&self) -> bool {
        matches!(self, ExecutionReport::Filled(_))
    }
}

/// Turns order intents into broker orders.
///
/// This is the ONLY component that calls `OrderSink::submit_market_order`.
pub struct OrderExecutor {
    sink: Arc<dyn OrderSink>,
    timeout: Duration,
}

impl OrderExecutor {
    pub fn new(sink: Arc<dyn OrderSink>, timeout: Duration) -> Self {
        Self { sink, timeout }
    }

    pub async fn execute(&self, intent: &OrderIntent) -> ExecutionReport {
        let order = intent.to_order();
        info!(
            instrument = %order.instrument,
            side = %order.side(),
            units = order.units,
            purpose = ?intent.purpose,
            stop_loss = ?order.stop_loss,
            take_profit = ?order.take_profit,
            "Executing order"
        );

        let submitted = tokio::time::timeout(self.timeout, self.sink.submit_market_order(&order))
            .await
            .unwrap_or(Err(Error::Timeout {
                operation: "order submission",
                after: self.timeout,
            }));

        match submitted {
            Ok(OrderOutcome::Filled(fill)) => {
                info!(
                    instrument = %fill.instrument,
                    units = fill.units,
                    price = ?fill.fill_price,
                    trade_id = ?fill.trade_id,
                    "Order filled"
                );
                ExecutionReport::Filled(fill)
            }
            Ok(OrderOutcome::Rejected(reason)) => {
                warn!(instrument = %order.instrument, %reason, "Order rejected");
                ExecutionReport::Rejected { order, reason }
            }
            Err(e) => {
                error!(instrument = %order.instrument, error = %e, "Order submission failed");
                ExecutionReport::Failed {
                    order,
                    error: e.to_string(),
                }
            }
        }
    }
}
