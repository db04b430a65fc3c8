//! Polling scheduler.
//!
//! Each cycle:
//! 1. Read the active configuration; none means idle
//! 2. Fetch up to `batch_size` `NEW` signals, oldest first
//! 3. Fan out one processing task per signal and join them all
//!
//! The loop never exits on a failed cycle. It only stops when the shutdown
//! token is cancelled, which is observed between cycles.

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::FutureExt;
use hatb_store::DynStore;
use parking_lot::RwLock;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::backoff::Backoff;
use crate::error::{ExecutorError, ExecutorResult};
use crate::processor::{DynProcessor, ProcessOutcome};

// ============================================================================
// Config / outcomes
// ============================================================================

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub batch_size: usize,
    pub poll_interval: Duration,
    pub idle_interval: Duration,
    pub error_backoff: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            batch_size: 5,
            poll_interval: Duration::from_secs(1),
            idle_interval: Duration::from_secs(5),
            error_backoff: Duration::from_secs(5),
        }
    }
}

/// Tally of one dispatched batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub dispatched: usize,
    pub processed: usize,
    pub failed: usize,
    pub claim_lost: usize,
}

impl CycleReport {
    fn record(&mut self, outcome: &ProcessOutcome) {
        match outcome {
            ProcessOutcome::Processed(_) => self.processed += 1,
            ProcessOutcome::Failed(_) => self.failed += 1,
            ProcessOutcome::ClaimLost => self.claim_lost += 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// No active configuration; nothing was read or touched.
    Inactive,
    /// Active, but no `NEW` signals.
    Idle,
    Dispatched(CycleReport),
}

// ============================================================================
// SchedulerStatus
// ============================================================================

/// Liveness counters shared with the status API.
#[derive(Debug, Default)]
pub struct SchedulerStatus {
    running: AtomicBool,
    cycles: AtomicU64,
    failures: AtomicU64,
    last_cycle_at: RwLock<Option<DateTime<Utc>>>,
}

impl SchedulerStatus {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn cycles(&self) -> u64 {
        self.cycles.load(Ordering::Relaxed)
    }

    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    pub fn last_cycle_at(&self) -> Option<DateTime<Utc>> {
        *self.last_cycle_at.read()
    }

    fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::SeqCst);
    }

    fn record_cycle(&self, failed: bool) {
        self.cycles.fetch_add(1, Ordering::Relaxed);
        if failed {
            self.failures.fetch_add(1, Ordering::Relaxed);
        }
        *self.last_cycle_at.write() = Some(Utc::now());
    }
}

// ============================================================================
// Scheduler
// ============================================================================

pub struct Scheduler {
    store: DynStore,
    processor: DynProcessor,
    config: SchedulerConfig,
    status: Arc<SchedulerStatus>,
}

impl Scheduler {
    pub fn new(store: DynStore, processor: DynProcessor, config: SchedulerConfig) -> Self {
        Self {
            store,
            processor,
            config,
            status: Arc::new(SchedulerStatus::new()),
        }
    }

    pub fn status(&self) -> Arc<SchedulerStatus> {
        self.status.clone()
    }

    /// Run one polling cycle.
    ///
    /// The configuration is read once here and shared by every task in the
    /// batch. Every task is joined before returning, even when some fail.
    pub async fn run_cycle(&self) -> ExecutorResult<CycleOutcome> {
        let Some(config) = self.store.active_configuration().await? else {
            return Ok(CycleOutcome::Inactive);
        };

        let batch = self.store.fetch_new(self.config.batch_size).await?;
        if batch.is_empty() {
            return Ok(CycleOutcome::Idle);
        }

        info!(
            batch_size = batch.len(),
            strategy = %config.strategy_name,
            "Dispatching batch"
        );

        let config = Arc::new(config);
        let mut report = CycleReport {
            dispatched: batch.len(),
            ..CycleReport::default()
        };
        let mut tasks = JoinSet::new();
        for signal in batch {
            let processor = self.processor.clone();
            let config = config.clone();
            tasks.spawn(async move { processor.process(signal, &config).await });
        }

        let mut first_error: Option<ExecutorError> = None;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(outcome)) => report.record(&outcome),
                Ok(Err(e)) => {
                    error!(error = %e, "Signal processing aborted");
                    first_error.get_or_insert(e);
                }
                Err(join_err) => {
                    error!(error = %join_err, "Processing task panicked");
                    first_error.get_or_insert(ExecutorError::TaskPanicked(join_err.to_string()));
                }
            }
        }

        debug!(
            dispatched = report.dispatched,
            processed = report.processed,
            failed = report.failed,
            claim_lost = report.claim_lost,
            "Batch joined"
        );

        match first_error {
            Some(e) => Err(e),
            None => Ok(CycleOutcome::Dispatched(report)),
        }
    }

    /// Poll until `shutdown` is cancelled.
    pub async fn run(&self, shutdown: CancellationToken) {
        self.status.set_running(true);
        info!(
            batch_size = self.config.batch_size,
            poll_ms = self.config.poll_interval.as_millis() as u64,
            "Scheduler started"
        );

        let mut backoff = Backoff::new(&self.config);
        while !shutdown.is_cancelled() {
            let result = AssertUnwindSafe(self.run_cycle())
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| Err(ExecutorError::TaskPanicked(panic_message(&*panic))));
            self.status.record_cycle(result.is_err());

            let delay = backoff.next_delay(&result);

            // Cancellation-aware sleep
            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                () = shutdown.cancelled() => break,
            }
        }

        self.status.set_running(false);
        info!(cycles = self.status.cycles(), "Scheduler stopped");
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
