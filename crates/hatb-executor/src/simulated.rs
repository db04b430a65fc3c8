//! Simulated execution endpoint.

use chrono::Utc;
use hatb_core::{Credentials, Fill, OrderId, OrderRequest};
use hatb_store::BoxFuture;
use rust_decimal::Decimal;
use tracing::debug;

use crate::endpoint::ExecutionEndpoint;
use crate::error::{ExecutorError, ExecutorResult};

/// Fills every order immediately at its price hint, charging
/// `price × quantity × fee_rate`.
#[derive(Debug, Clone)]
pub struct SimulatedEndpoint {
    fee_rate: Decimal,
}

impl SimulatedEndpoint {
    pub fn new(fee_rate: Decimal) -> Self {
        Self { fee_rate }
    }
}

impl ExecutionEndpoint for SimulatedEndpoint {
    fn execute<'a>(
        &'a self,
        order: OrderRequest,
        _credentials: &'a Credentials,
    ) -> BoxFuture<'a, ExecutorResult<Fill>> {
        Box::pin(async move {
            if !order.quantity.is_positive() {
                return Err(ExecutorError::Rejected(format!(
                    "quantity {} is not positive",
                    order.quantity
                )));
            }
            let fee = order
                .quantity
                .notional(order.price_hint)
                .ok()
                .and_then(|notional| notional.checked_mul(self.fee_rate))
                .ok_or_else(|| {
                    ExecutorError::Rejected(format!(
                        "fee for {} @ {} overflows",
                        order.quantity, order.price_hint
                    ))
                })?;
            let fill = Fill {
                order_id: OrderId::generate(order.signal_id, Utc::now()),
                price: order.price_hint,
                quantity: order.quantity,
                fee,
            };
            debug!(
                signal_id = %order.signal_id,
                order_id = %fill.order_id,
                price = %fill.price,
                qty = %fill.quantity,
                "Simulated fill"
            );
            Ok(fill)
        })
    }

    fn name(&self) -> &'static str {
        "simulated"
    }
}
