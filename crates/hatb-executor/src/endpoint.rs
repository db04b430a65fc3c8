//! Execution endpoint trait.
//!
//! The processor only knows this seam; whether an order is filled by a
//! simulator, a signed HTTP call or a test double is decided at wiring time.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use hatb_core::{Credentials, Fill, OrderId, OrderRequest};
use hatb_store::BoxFuture;
use parking_lot::Mutex;
use rust_decimal::Decimal;

use crate::error::{ExecutorError, ExecutorResult};

/// Something that turns an [`OrderRequest`] into a complete [`Fill`].
///
/// Implementations must not retry internally; the caller owns the timeout
/// and the single-attempt policy.
pub trait ExecutionEndpoint: Send + Sync {
    /// Submit one order using the run-configuration's credentials.
    fn execute<'a>(
        &'a self,
        order: OrderRequest,
        credentials: &'a Credentials,
    ) -> BoxFuture<'a, ExecutorResult<Fill>>;

    /// Short label for logs.
    fn name(&self) -> &'static str;
}

/// Arc wrapper for ExecutionEndpoint trait objects.
pub type DynEndpoint = Arc<dyn ExecutionEndpoint>;

/// Mock endpoint for testing.
///
/// Fills at the order's price hint with zero fee unless told otherwise.
#[derive(Debug, Default)]
pub struct MockEndpoint {
    /// Recorded orders for verification.
    orders: Mutex<Vec<OrderRequest>>,
    /// Orders for these symbols fail.
    failing_symbols: Mutex<HashSet<String>>,
    /// Sleep before answering.
    delay: Mutex<Option<Duration>>,
    /// Number of executions currently in flight.
    in_flight: AtomicUsize,
    /// Highest observed `in_flight`.
    max_in_flight: AtomicUsize,
}

impl MockEndpoint {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every order for `symbol` fail.
    pub fn fail_symbol(&self, symbol: &str) {
        self.failing_symbols.lock().insert(symbol.to_string());
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = Some(delay);
    }

    /// Get recorded orders.
    pub fn get_orders(&self) -> Vec<OrderRequest> {
        self.orders.lock().clone()
    }

    pub fn order_count(&self) -> usize {
        self.orders.lock().len()
    }

    /// Peak number of concurrent `execute` calls seen so far.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

impl ExecutionEndpoint for MockEndpoint {
    fn execute<'a>(
        &'a self,
        order: OrderRequest,
        _credentials: &'a Credentials,
    ) -> BoxFuture<'a, ExecutorResult<Fill>> {
        Box::pin(async move {
            self.orders.lock().push(order.clone());
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);

            let delay = *self.delay.lock();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.failing_symbols.lock().contains(&order.symbol) {
                return Err(ExecutorError::Execution(format!(
                    "mock failure for {}",
                    order.symbol
                )));
            }

            Ok(Fill {
                order_id: OrderId::generate(order.signal_id, Utc::now()),
                price: order.price_hint,
                quantity: order.quantity,
                fee: Decimal::ZERO,
            })
        })
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hatb_core::{OrderSide, Price, SignalId, Size};
    use rust_decimal_macros::dec;

    fn order(symbol: &str) -> OrderRequest {
        OrderRequest {
            signal_id: SignalId::new(1),
            symbol: symbol.to_string(),
            side: OrderSide::Buy,
            quantity: Size::new(dec!(0.5)),
            price_hint: Price::new(dec!(200)),
        }
    }

    #[tokio::test]
    async fn test_mock_fills_at_price_hint() {
        let mock = MockEndpoint::new();
        let creds = Credentials::new("k", "s");
        let fill = mock.execute(order("BTCUSD"), &creds).await.unwrap();
        assert_eq!(fill.price.inner(), dec!(200));
        assert_eq!(fill.quantity.inner(), dec!(0.5));
        assert_eq!(mock.order_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_failing_symbol() {
        let mock = MockEndpoint::new();
        mock.fail_symbol("BAD");
        let creds = Credentials::new("k", "s");
        assert!(mock.execute(order("BAD"), &creds).await.is_err());
        assert!(mock.execute(order("GOOD"), &creds).await.is_ok());
    }
}
