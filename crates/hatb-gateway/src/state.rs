//! Shared handler state.

use std::sync::Arc;

use hatb_executor::SchedulerStatus;
use hatb_store::DynStore;

use crate::config::GatewayConfig;
use crate::ingest::IngestionGate;

/// Shared application state for axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub(crate) gate: Arc<IngestionGate>,
    pub(crate) store: DynStore,
    pub(crate) scheduler: Arc<SchedulerStatus>,
    pub(crate) config: GatewayConfig,
}

impl AppState {
    pub fn new(store: DynStore, scheduler: Arc<SchedulerStatus>, config: GatewayConfig) -> Self {
        let gate = Arc::new(IngestionGate::new(store.clone(), config.webhook_secret.clone()));
        Self {
            gate,
            store,
            scheduler,
            config,
        }
    }
}
