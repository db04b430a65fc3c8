//! In-memory state machine shared by every store implementation.
//!
//! Mutations are split in two steps so a backend can persist a change
//! before it becomes visible:
//! 1. `prepare_*` validates against the current state and yields a
//!    [`JournalEvent`] without mutating anything
//! 2. [`Ledger::apply`] performs the mutation described by the event
//!
//! Replaying a journal is just `apply` over the recorded events.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use hatb_core::{
    Configuration, ConfigurationUpdate, ExecutionRecord, NewSignal, Page, Signal, SignalId,
    SignalState,
};
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};
use crate::store::{BoxFuture, ExecutionLog, SettingsStore, SignalStore, Store};

// ============================================================================
// JournalEvent
// ============================================================================

/// One committed mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum JournalEvent {
    Admitted {
        signal: Signal,
    },
    Claimed {
        id: SignalId,
        at: DateTime<Utc>,
    },
    /// Record append and `PROCESSED` transition, committed together.
    Executed {
        record: ExecutionRecord,
        processed_at: DateTime<Utc>,
    },
    Failed {
        id: SignalId,
        reason: String,
        at: DateTime<Utc>,
    },
    ConfigurationSaved {
        configuration: Configuration,
    },
}

/// Number of signals per lifecycle state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateCounts {
    pub new: usize,
    pub claimed: usize,
    pub processed: usize,
    pub failed: usize,
}

impl StateCounts {
    pub fn total(&self) -> usize {
        self.new + self.claimed + self.processed + self.failed
    }
}

// ============================================================================
// Ledger
// ============================================================================

#[derive(Debug, Clone)]
pub struct Ledger {
    signals: BTreeMap<SignalId, Signal>,
    next_signal_id: SignalId,
    records: Vec<ExecutionRecord>,
    next_record_id: u64,
    configuration: Option<Configuration>,
}

impl Default for Ledger {
    fn default() -> Self {
        Self {
            signals: BTreeMap::new(),
            next_signal_id: SignalId::new(1),
            records: Vec::new(),
            next_record_id: 1,
            configuration: None,
        }
    }
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    // --- prepare ------------------------------------------------------------

    pub fn prepare_admit(&self, candidate: NewSignal, received_at: DateTime<Utc>) -> JournalEvent {
        JournalEvent::Admitted {
            signal: candidate.into_signal(self.next_signal_id, received_at),
        }
    }

    /// `None` means the claim was lost: the signal is no longer `NEW`.
    pub fn prepare_claim(
        &self,
        id: SignalId,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<JournalEvent>> {
        let signal = self.signal(id)?;
        if signal.state != SignalState::New {
            return Ok(None);
        }
        Ok(Some(JournalEvent::Claimed { id, at }))
    }

    pub fn prepare_execution(
        &self,
        id: SignalId,
        mut record: ExecutionRecord,
        processed_at: DateTime<Utc>,
    ) -> StoreResult<JournalEvent> {
        self.check_transition(id, SignalState::Processed)?;
        record.id = self.next_record_id;
        record.signal_id = Some(id);
        Ok(JournalEvent::Executed {
            record,
            processed_at,
        })
    }

    pub fn prepare_failure(
        &self,
        id: SignalId,
        reason: String,
        at: DateTime<Utc>,
    ) -> StoreResult<JournalEvent> {
        self.check_transition(id, SignalState::Failed)?;
        Ok(JournalEvent::Failed { id, reason, at })
    }

    pub fn prepare_configuration(
        &self,
        update: ConfigurationUpdate,
        at: DateTime<Utc>,
    ) -> StoreResult<JournalEvent> {
        let configuration = match &self.configuration {
            Some(current) => {
                let mut next = current.clone();
                next.apply(update, at)?;
                next
            }
            None => Configuration::create(update, at)?,
        };
        Ok(JournalEvent::ConfigurationSaved { configuration })
    }

    // --- apply --------------------------------------------------------------

    /// Perform the mutation described by `event`.
    pub fn apply(&mut self, event: &JournalEvent) -> StoreResult<()> {
        match event {
            JournalEvent::Admitted { signal } => {
                if signal.id >= self.next_signal_id {
                    self.next_signal_id = signal.id.next();
                }
                self.signals.insert(signal.id, signal.clone());
            }
            JournalEvent::Claimed { id, at } => {
                self.signal_mut(*id)?.transition(SignalState::Claimed, *at)?;
            }
            JournalEvent::Executed {
                record,
                processed_at,
            } => {
                let id = record.signal_id.ok_or_else(|| StoreError::Corrupt {
                    line: 0,
                    reason: format!("execution record {} has no signal id", record.id),
                })?;
                self.signal_mut(id)?
                    .transition(SignalState::Processed, *processed_at)?;
                self.next_record_id = self.next_record_id.max(record.id + 1);
                self.records.push(record.clone());
            }
            JournalEvent::Failed { id, reason, at } => {
                let signal = self.signal_mut(*id)?;
                signal.transition(SignalState::Failed, *at)?;
                signal.failure_reason = Some(reason.clone());
            }
            JournalEvent::ConfigurationSaved { configuration } => {
                self.configuration = Some(configuration.clone());
            }
        }
        Ok(())
    }

    // --- queries ------------------------------------------------------------

    pub fn get(&self, id: SignalId) -> Option<&Signal> {
        self.signals.get(&id)
    }

    pub fn fetch_new(&self, limit: usize) -> Vec<Signal> {
        let mut pending: Vec<&Signal> = self
            .signals
            .values()
            .filter(|s| s.state == SignalState::New)
            .collect();
        pending.sort_by_key(|s| (s.received_at, s.id));
        pending.into_iter().take(limit).cloned().collect()
    }

    pub fn list_signals(&self, state: Option<SignalState>, page: Page) -> Vec<Signal> {
        self.signals
            .values()
            .rev()
            .filter(|s| state.map_or(true, |st| s.state == st))
            .skip(page.offset)
            .take(page.limit)
            .cloned()
            .collect()
    }

    pub fn list_records(&self, page: Page) -> Vec<ExecutionRecord> {
        let mut records: Vec<&ExecutionRecord> = self.records.iter().collect();
        records.sort_by(|a, b| {
            b.completed_at
                .cmp(&a.completed_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        records
            .into_iter()
            .skip(page.offset)
            .take(page.limit)
            .cloned()
            .collect()
    }

    pub fn records_for_signal(&self, id: SignalId) -> Vec<ExecutionRecord> {
        self.records
            .iter()
            .filter(|r| r.signal_id == Some(id))
            .cloned()
            .collect()
    }

    pub fn configuration(&self) -> Option<&Configuration> {
        self.configuration.as_ref()
    }

    pub fn state_counts(&self) -> StateCounts {
        let mut counts = StateCounts::default();
        for signal in self.signals.values() {
            match signal.state {
                SignalState::New => counts.new += 1,
                SignalState::Claimed => counts.claimed += 1,
                SignalState::Processed => counts.processed += 1,
                SignalState::Failed => counts.failed += 1,
            }
        }
        counts
    }

    /// Signals left `CLAIMED`, i.e. owned by an attempt that never finished.
    pub fn claimed_ids(&self) -> Vec<SignalId> {
        self.signals
            .values()
            .filter(|s| s.state == SignalState::Claimed)
            .map(|s| s.id)
            .collect()
    }

    fn signal(&self, id: SignalId) -> StoreResult<&Signal> {
        self.signals.get(&id).ok_or(StoreError::SignalNotFound(id))
    }

    fn signal_mut(&mut self, id: SignalId) -> StoreResult<&mut Signal> {
        self.signals
            .get_mut(&id)
            .ok_or(StoreError::SignalNotFound(id))
    }

    fn check_transition(&self, id: SignalId, next: SignalState) -> StoreResult<()> {
        let signal = self.signal(id)?;
        if !signal.state.can_transition_to(next) {
            return Err(hatb_core::CoreError::IllegalTransition {
                id,
                from: signal.state,
                to: next,
            }
            .into());
        }
        Ok(())
    }
}

// ============================================================================
// LedgerBackend
// ============================================================================

/// A persistence strategy wrapped around a [`Ledger`].
///
/// Implementors get every store trait through the blanket impls below.
/// `commit` must hold exclusive access from `prepare` until the event is
/// applied, so validation and mutation see the same state.
pub trait LedgerBackend: Send + Sync {
    fn read<R>(&self, f: impl FnOnce(&Ledger) -> R) -> R;

    /// Run `prepare`; if it yields an event, make it durable and apply it.
    /// Returns the applied event.
    fn commit(
        &self,
        prepare: impl FnOnce(&Ledger) -> StoreResult<Option<JournalEvent>>,
    ) -> StoreResult<Option<JournalEvent>>;
}

impl<B: LedgerBackend> SignalStore for B {
    fn admit(
        &self,
        candidate: NewSignal,
        received_at: DateTime<Utc>,
    ) -> BoxFuture<'_, StoreResult<Signal>> {
        Box::pin(async move {
            match self.commit(|ledger| Ok(Some(ledger.prepare_admit(candidate, received_at))))? {
                Some(JournalEvent::Admitted { signal }) => Ok(signal),
                other => Err(unexpected("admit", other)),
            }
        })
    }

    fn fetch_new(&self, limit: usize) -> BoxFuture<'_, StoreResult<Vec<Signal>>> {
        Box::pin(async move { Ok(self.read(|ledger| ledger.fetch_new(limit))) })
    }

    fn claim(&self, id: SignalId) -> BoxFuture<'_, StoreResult<bool>> {
        Box::pin(async move {
            let applied = self.commit(|ledger| ledger.prepare_claim(id, Utc::now()))?;
            Ok(applied.is_some())
        })
    }

    fn mark_failed(
        &self,
        id: SignalId,
        reason: String,
        at: DateTime<Utc>,
    ) -> BoxFuture<'_, StoreResult<()>> {
        Box::pin(async move {
            self.commit(|ledger| ledger.prepare_failure(id, reason, at).map(Some))?;
            Ok(())
        })
    }

    fn get_signal(&self, id: SignalId) -> BoxFuture<'_, StoreResult<Option<Signal>>> {
        Box::pin(async move { Ok(self.read(|ledger| ledger.get(id).cloned())) })
    }

    fn list_signals(
        &self,
        state: Option<SignalState>,
        page: Page,
    ) -> BoxFuture<'_, StoreResult<Vec<Signal>>> {
        Box::pin(async move { Ok(self.read(|ledger| ledger.list_signals(state, page))) })
    }

    fn state_counts(&self) -> BoxFuture<'_, StoreResult<StateCounts>> {
        Box::pin(async move { Ok(self.read(Ledger::state_counts)) })
    }
}

impl<B: LedgerBackend> SettingsStore for B {
    fn active_configuration(&self) -> BoxFuture<'_, StoreResult<Option<Configuration>>> {
        Box::pin(async move {
            Ok(self.read(|ledger| ledger.configuration().filter(|c| c.is_active).cloned()))
        })
    }

    fn configuration(&self) -> BoxFuture<'_, StoreResult<Option<Configuration>>> {
        Box::pin(async move { Ok(self.read(|ledger| ledger.configuration().cloned())) })
    }

    fn upsert_configuration(
        &self,
        update: ConfigurationUpdate,
        at: DateTime<Utc>,
    ) -> BoxFuture<'_, StoreResult<Configuration>> {
        Box::pin(async move {
            match self.commit(|ledger| ledger.prepare_configuration(update, at).map(Some))? {
                Some(JournalEvent::ConfigurationSaved { configuration }) => Ok(configuration),
                other => Err(unexpected("upsert_configuration", other)),
            }
        })
    }
}

impl<B: LedgerBackend> ExecutionLog for B {
    fn list_records(&self, page: Page) -> BoxFuture<'_, StoreResult<Vec<ExecutionRecord>>> {
        Box::pin(async move { Ok(self.read(|ledger| ledger.list_records(page))) })
    }

    fn records_for_signal(
        &self,
        id: SignalId,
    ) -> BoxFuture<'_, StoreResult<Vec<ExecutionRecord>>> {
        Box::pin(async move { Ok(self.read(|ledger| ledger.records_for_signal(id))) })
    }
}

impl<B: LedgerBackend> Store for B {
    fn commit_execution(
        &self,
        id: SignalId,
        record: ExecutionRecord,
        processed_at: DateTime<Utc>,
    ) -> BoxFuture<'_, StoreResult<ExecutionRecord>> {
        Box::pin(async move {
            let applied = self.commit(|ledger| {
                ledger
                    .prepare_execution(id, record, processed_at)
                    .map(Some)
            })?;
            match applied {
                Some(JournalEvent::Executed { record, .. }) => Ok(record),
                other => Err(unexpected("commit_execution", other)),
            }
        })
    }
}

fn unexpected(op: &str, event: Option<JournalEvent>) -> StoreError {
    StoreError::Unavailable(format!("{op} committed unexpected event: {event:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hatb_core::{Fill, OrderId, OrderSide, Price, Size};
    use rust_decimal_macros::dec;

    fn admit(ledger: &mut Ledger, symbol: &str, at: DateTime<Utc>) -> SignalId {
        let candidate = NewSignal::new(symbol, OrderSide::Buy, None).unwrap();
        let event = ledger.prepare_admit(candidate, at);
        ledger.apply(&event).unwrap();
        match event {
            JournalEvent::Admitted { signal } => signal.id,
            _ => unreachable!(),
        }
    }

    fn record_for(ledger: &Ledger, id: SignalId) -> ExecutionRecord {
        let fill = Fill {
            order_id: OrderId::generate(id, Utc::now()),
            price: Price::new(dec!(100)),
            quantity: Size::new(dec!(1)),
            fee: dec!(0.05),
        };
        ExecutionRecord::from_fill(ledger.get(id).unwrap(), fill, Utc::now())
    }

    #[test]
    fn test_ids_strictly_increase() {
        let mut ledger = Ledger::new();
        let now = Utc::now();
        let a = admit(&mut ledger, "A", now);
        let b = admit(&mut ledger, "B", now);
        let c = admit(&mut ledger, "C", now);
        assert!(a < b && b < c);
    }

    #[test]
    fn test_prepare_does_not_mutate() {
        let mut ledger = Ledger::new();
        let id = admit(&mut ledger, "A", Utc::now());
        let _ = ledger.prepare_claim(id, Utc::now()).unwrap();
        assert_eq!(ledger.get(id).unwrap().state, SignalState::New);
    }

    #[test]
    fn test_second_claim_is_lost() {
        let mut ledger = Ledger::new();
        let id = admit(&mut ledger, "A", Utc::now());
        let event = ledger.prepare_claim(id, Utc::now()).unwrap().unwrap();
        ledger.apply(&event).unwrap();
        assert!(ledger.prepare_claim(id, Utc::now()).unwrap().is_none());
    }

    #[test]
    fn test_execution_requires_claim() {
        let mut ledger = Ledger::new();
        let id = admit(&mut ledger, "A", Utc::now());
        let record = record_for(&ledger, id);
        assert!(ledger.prepare_execution(id, record, Utc::now()).is_err());
    }

    #[test]
    fn test_execution_assigns_record_id_and_processes_signal() {
        let mut ledger = Ledger::new();
        let id = admit(&mut ledger, "A", Utc::now());
        let claim = ledger.prepare_claim(id, Utc::now()).unwrap().unwrap();
        ledger.apply(&claim).unwrap();

        let record = record_for(&ledger, id);
        let event = ledger.prepare_execution(id, record, Utc::now()).unwrap();
        ledger.apply(&event).unwrap();

        assert_eq!(ledger.get(id).unwrap().state, SignalState::Processed);
        let records = ledger.records_for_signal(id);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, 1);

        // Replaying the same completion is rejected by the state machine.
        let again = record_for(&ledger, id);
        assert!(ledger.prepare_execution(id, again, Utc::now()).is_err());
    }

    #[test]
    fn test_fetch_new_orders_by_received_at() {
        let mut ledger = Ledger::new();
        let base = Utc::now();
        let late = admit(&mut ledger, "LATE", base + chrono::Duration::seconds(10));
        let early = admit(&mut ledger, "EARLY", base);
        let batch = ledger.fetch_new(5);
        assert_eq!(batch[0].id, early);
        assert_eq!(batch[1].id, late);
    }

    #[test]
    fn test_configuration_upsert_updates_existing_row() {
        let mut ledger = Ledger::new();
        let create = ConfigurationUpdate {
            exchange_api_key: Some("k".to_string()),
            exchange_secret_key: Some("s".to_string()),
            ..Default::default()
        };
        let event = ledger.prepare_configuration(create, Utc::now()).unwrap();
        ledger.apply(&event).unwrap();

        let deactivate = ConfigurationUpdate {
            is_active: Some(false),
            ..Default::default()
        };
        let event = ledger.prepare_configuration(deactivate, Utc::now()).unwrap();
        ledger.apply(&event).unwrap();

        let cfg = ledger.configuration().unwrap();
        assert!(!cfg.is_active);
        assert_eq!(cfg.credentials.api_key, "k");
    }

    #[test]
    fn test_journal_event_serde_tag() {
        let event = JournalEvent::Claimed {
            id: SignalId::new(4),
            at: Utc::now(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"event\":\"claimed\""));
        let back: JournalEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }
}
