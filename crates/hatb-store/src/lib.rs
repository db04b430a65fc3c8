//! Durable state for the HATB pipeline.
//!
//! Three collections live behind the store traits:
//! - Signal Store: every admitted signal and its lifecycle state
//! - Settings Store: the single run-configuration row
//! - Execution Log: append-only records of successful executions
//!
//! Two implementations share one in-memory state machine (`Ledger`):
//! - [`MemoryStore`]: process-lifetime only, used by tests and dry runs
//! - [`JournalStore`]: appends every mutation to a JSON Lines journal and
//!   replays it on open

pub mod error;
pub mod journal;
pub mod ledger;
pub mod memory;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use journal::JournalStore;
pub use ledger::{JournalEvent, Ledger, StateCounts};
pub use memory::MemoryStore;
pub use store::{BoxFuture, DynStore, ExecutionLog, SettingsStore, SignalStore, Store};
