//! Per-signal processing: claim, execute, record.
//!
//! ```text
//! NEW ──claim──▶ CLAIMED ──fill──────▶ PROCESSED (+ one ExecutionRecord)
//!                        └─error/timeout─▶ FAILED (no record)
//! ```
//!
//! A lost claim is not an error: another attempt owns the signal.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use hatb_core::{Configuration, ExecutionRecord, Fill, OrderRequest, Signal};
use hatb_store::DynStore;
use hatb_telemetry::Metrics;
use tracing::{debug, info, warn};

use crate::endpoint::DynEndpoint;
use crate::error::{ExecutorError, ExecutorResult};
use crate::sizing::OrderSizer;

/// What happened to one signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    Processed(ExecutionRecord),
    /// Execution failed; the reason was stored on the signal.
    Failed(String),
    ClaimLost,
}

impl ProcessOutcome {
    /// Metric label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Processed(_) => "processed",
            Self::Failed(_) => "failed",
            Self::ClaimLost => "claim_lost",
        }
    }
}

pub struct SignalProcessor {
    store: DynStore,
    endpoint: DynEndpoint,
    sizer: OrderSizer,
    timeout: Duration,
}

impl SignalProcessor {
    pub fn new(store: DynStore, endpoint: DynEndpoint, sizer: OrderSizer, timeout: Duration) -> Self {
        Self {
            store,
            endpoint,
            sizer,
            timeout,
        }
    }

    /// Process one signal against the configuration read at cycle start.
    ///
    /// Execution failures become [`ProcessOutcome::Failed`]. Only store
    /// failures are returned as errors; in that case the signal may remain
    /// `CLAIMED`.
    pub async fn process(
        &self,
        signal: Signal,
        config: &Configuration,
    ) -> ExecutorResult<ProcessOutcome> {
        if !self.store.claim(signal.id).await? {
            debug!(signal_id = %signal.id, "Claim lost, skipping");
            Metrics::signal_processed(ProcessOutcome::ClaimLost.label());
            return Ok(ProcessOutcome::ClaimLost);
        }

        // Sizing happens after the claim, so a rejected order still ends FAILED.
        let result = match self.sizer.order_for(&signal, config) {
            Ok(order) => self.execute(order, config).await,
            Err(e) => Err(e),
        };

        let outcome = match result {
            Ok(fill) => {
                let completed_at = Utc::now();
                let record = ExecutionRecord::from_fill(&signal, fill, completed_at);
                let record = self
                    .store
                    .commit_execution(signal.id, record, completed_at)
                    .await?;
                info!(
                    signal_id = %signal.id,
                    symbol = %record.symbol,
                    order_id = %record.order_id,
                    price = %record.executed_price,
                    qty = %record.executed_qty,
                    "Signal processed"
                );
                ProcessOutcome::Processed(record)
            }
            Err(e) => {
                let reason = e.to_string();
                warn!(signal_id = %signal.id, symbol = %signal.symbol, %reason, "Signal failed");
                self.store
                    .mark_failed(signal.id, reason.clone(), Utc::now())
                    .await?;
                ProcessOutcome::Failed(reason)
            }
        };

        Metrics::signal_processed(outcome.label());
        Ok(outcome)
    }

    /// One endpoint attempt bounded by the configured timeout.
    async fn execute(&self, order: OrderRequest, config: &Configuration) -> ExecutorResult<Fill> {
        debug!(
            signal_id = %order.signal_id,
            symbol = %order.symbol,
            side = %order.side,
            qty = %order.quantity,
            price_hint = %order.price_hint,
            endpoint = self.endpoint.name(),
            "Executing order"
        );

        let started = Instant::now();
        let result = match tokio::time::timeout(
            self.timeout,
            self.endpoint.execute(order, &config.credentials),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(ExecutorError::Timeout(self.timeout.as_millis() as u64)),
        };
        Metrics::execution_latency(started.elapsed().as_secs_f64() * 1000.0);
        result
    }
}

/// Shared processor handle for fan-out tasks.
pub type DynProcessor = Arc<SignalProcessor>;
