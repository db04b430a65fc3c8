//! Main application orchestration.
//!
//! Owns the store and builds the two long-running tasks around it:
//! - the gateway (webhook ingestion + admin API)
//! - the scheduler (poll, dispatch, execute)
//!
//! Both share one `CancellationToken`; Ctrl-C cancels it and the run waits
//! for both tasks to wind down.

use std::sync::Arc;

use hatb_executor::{
    DynEndpoint, HttpEndpoint, Scheduler, SchedulerStatus, SignalProcessor, SimulatedEndpoint,
};
use hatb_gateway::{run_server, AppState};
use hatb_store::{DynStore, JournalStore, MemoryStore};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::{AppConfig, ExecutionMode, StoreKind};
use crate::error::{AppError, AppResult};

const DEFAULT_SECRET: &str = "DEFAULT_SECRET_KEY";

/// Main application.
pub struct Application {
    config: AppConfig,
    store: DynStore,
    scheduler: Arc<Scheduler>,
    shutdown: CancellationToken,
}

impl Application {
    /// Build the store, execution endpoint and scheduler from `config`.
    pub fn new(config: AppConfig) -> AppResult<Self> {
        let store = open_store(&config)?;
        Self::with_store(config, store)
    }

    /// Like [`Application::new`] but over an existing store.
    pub fn with_store(config: AppConfig, store: DynStore) -> AppResult<Self> {
        config.validate()?;

        let endpoint: DynEndpoint = match config.execution.mode {
            ExecutionMode::Simulated => {
                Arc::new(SimulatedEndpoint::new(config.execution.fee_rate))
            }
            ExecutionMode::Http => Arc::new(HttpEndpoint::new(&config.execution.endpoint_url)?),
        };
        info!(endpoint = endpoint.name(), "Execution endpoint ready");

        let processor = Arc::new(SignalProcessor::new(
            store.clone(),
            endpoint,
            config.execution.order_sizer(),
            config.execution.timeout(),
        ));
        let scheduler = Arc::new(Scheduler::new(
            store.clone(),
            processor,
            config.scheduler.scheduler_config(),
        ));

        Ok(Self {
            config,
            store,
            scheduler,
            shutdown: CancellationToken::new(),
        })
    }

    pub fn store(&self) -> DynStore {
        self.store.clone()
    }

    pub fn scheduler(&self) -> Arc<Scheduler> {
        self.scheduler.clone()
    }

    pub fn scheduler_status(&self) -> Arc<SchedulerStatus> {
        self.scheduler.status()
    }

    /// Token that stops [`Application::run`] when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Handler state for the HTTP gateway.
    pub fn gateway_state(&self) -> AppState {
        AppState::new(
            self.store.clone(),
            self.scheduler.status(),
            self.config.gateway.clone(),
        )
    }

    /// Run the gateway and scheduler until Ctrl-C or the shutdown token fires.
    pub async fn run(&self) -> AppResult<()> {
        if self.config.gateway.webhook_secret == DEFAULT_SECRET {
            warn!("Webhook secret is the built-in default; set HATB_WEBHOOK_SECRET");
        }
        if !self.config.gateway.auth_enabled() {
            warn!("Admin API has no basic auth configured");
        }

        let server = tokio::spawn(run_server(self.gateway_state(), self.shutdown.clone()));

        let scheduler = {
            let scheduler = self.scheduler.clone();
            let shutdown = self.shutdown.clone();
            tokio::spawn(async move { scheduler.run(shutdown).await })
        };

        info!("Entering main loop");
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    error!(?e, "Failed to listen for Ctrl-C");
                }
                info!("Shutdown signal received");
            }
            () = self.shutdown.cancelled() => {
                info!("Shutdown requested");
            }
        }
        self.shutdown.cancel();

        let scheduler_result = scheduler.await;
        let server_result = server.await;

        scheduler_result.map_err(|e| AppError::Task(format!("scheduler: {e}")))?;
        server_result.map_err(|e| AppError::Task(format!("gateway: {e}")))??;

        info!("Shutdown complete");
        Ok(())
    }
}

fn open_store(config: &AppConfig) -> AppResult<DynStore> {
    let store: DynStore = match config.store.kind {
        StoreKind::Memory => {
            warn!("Using in-memory store; signals are lost on exit");
            Arc::new(MemoryStore::new())
        }
        StoreKind::Journal => Arc::new(JournalStore::open(&config.store.data_dir)?),
    };
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.store.kind = StoreKind::Memory;
        config
    }

    #[test]
    fn test_new_with_memory_store() {
        let app = Application::new(memory_config()).unwrap();
        assert!(!app.scheduler_status().is_running());
    }

    #[test]
    fn test_http_mode_requires_url() {
        let mut config = memory_config();
        config.execution.mode = ExecutionMode::Http;
        assert!(Application::new(config).is_err());
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown_token() {
        let mut config = memory_config();
        // Ephemeral port so parallel test runs do not collide.
        config.gateway.port = 0;
        let app = Arc::new(Application::new(config).unwrap());

        let token = app.shutdown_token();
        let handle = {
            let app = app.clone();
            tokio::spawn(async move { app.run().await })
        };
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        token.cancel();

        handle.await.unwrap().unwrap();
        assert!(!app.scheduler_status().is_running());
    }
}
