//! Process-lifetime store.

use parking_lot::Mutex;

use crate::error::StoreResult;
use crate::ledger::{JournalEvent, Ledger, LedgerBackend};

/// Ledger behind a mutex, nothing persisted.
#[derive(Debug, Default)]
pub struct MemoryStore {
    ledger: Mutex<Ledger>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LedgerBackend for MemoryStore {
    fn read<R>(&self, f: impl FnOnce(&Ledger) -> R) -> R {
        f(&self.ledger.lock())
    }

    fn commit(
        &self,
        prepare: impl FnOnce(&Ledger) -> StoreResult<Option<JournalEvent>>,
    ) -> StoreResult<Option<JournalEvent>> {
        let mut ledger = self.ledger.lock();
        let event = prepare(&ledger)?;
        if let Some(event) = &event {
            ledger.apply(event)?;
        }
        Ok(event)
    }
}
