//! Store traits consumed by the gateway, scheduler and processor.
//!
//! All methods return boxed futures so a networked database can stand in
//! for the bundled implementations without touching callers.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use hatb_core::{
    Configuration, ConfigurationUpdate, ExecutionRecord, NewSignal, Page, Signal, SignalId,
    SignalState,
};

use crate::error::StoreResult;
use crate::ledger::StateCounts;

/// Boxed future for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Durable record of every inbound signal and its processing state.
pub trait SignalStore: Send + Sync {
    /// Append a new signal in state `NEW` and return it with its identity.
    fn admit(
        &self,
        candidate: NewSignal,
        received_at: DateTime<Utc>,
    ) -> BoxFuture<'_, StoreResult<Signal>>;

    /// Up to `limit` signals in state `NEW`, oldest `received_at` first.
    fn fetch_new(&self, limit: usize) -> BoxFuture<'_, StoreResult<Vec<Signal>>>;

    /// Conditional `NEW → CLAIMED`. Returns `false` if another attempt owns it
    /// or it already reached a terminal state.
    fn claim(&self, id: SignalId) -> BoxFuture<'_, StoreResult<bool>>;

    /// `CLAIMED → FAILED`. No execution record is written.
    fn mark_failed(
        &self,
        id: SignalId,
        reason: String,
        at: DateTime<Utc>,
    ) -> BoxFuture<'_, StoreResult<()>>;

    fn get_signal(&self, id: SignalId) -> BoxFuture<'_, StoreResult<Option<Signal>>>;

    /// Newest first, optionally filtered by state.
    fn list_signals(
        &self,
        state: Option<SignalState>,
        page: Page,
    ) -> BoxFuture<'_, StoreResult<Vec<Signal>>>;

    fn state_counts(&self) -> BoxFuture<'_, StoreResult<StateCounts>>;
}

/// Durable record of the single run-configuration.
pub trait SettingsStore: Send + Sync {
    /// The configuration row, if one exists and `is_active` is set.
    fn active_configuration(&self) -> BoxFuture<'_, StoreResult<Option<Configuration>>>;

    /// The configuration row regardless of its active flag.
    fn configuration(&self) -> BoxFuture<'_, StoreResult<Option<Configuration>>>;

    /// Create the row on first call, update it afterwards.
    fn upsert_configuration(
        &self,
        update: ConfigurationUpdate,
        at: DateTime<Utc>,
    ) -> BoxFuture<'_, StoreResult<Configuration>>;
}

/// Append-only log of successful executions.
pub trait ExecutionLog: Send + Sync {
    /// Newest `completed_at` first.
    fn list_records(&self, page: Page) -> BoxFuture<'_, StoreResult<Vec<ExecutionRecord>>>;

    fn records_for_signal(&self, id: SignalId)
        -> BoxFuture<'_, StoreResult<Vec<ExecutionRecord>>>;
}

/// The three collections plus the one operation that spans two of them.
pub trait Store: SignalStore + SettingsStore + ExecutionLog {
    /// Append `record` and move signal `id` from `CLAIMED` to `PROCESSED`
    /// in a single commit. Either both happen or neither does.
    fn commit_execution(
        &self,
        id: SignalId,
        record: ExecutionRecord,
        processed_at: DateTime<Utc>,
    ) -> BoxFuture<'_, StoreResult<ExecutionRecord>>;
}

/// Arc wrapper for Store trait objects.
pub type DynStore = Arc<dyn Store>;
