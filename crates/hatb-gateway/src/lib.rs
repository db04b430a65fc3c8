//! hatb-gateway - HTTP surface of the signal pipeline.
//!
//! - Ingestion gate behind `POST /webhook/tradingview`: authenticates the
//!   shared secret, validates the payload and admits the signal as `NEW`
//! - Admin JSON API for the run-configuration, execution log, signal
//!   listing and scheduler status
//! - `/metrics` for Prometheus scraping
//!
//! # Usage
//!
//! ```ignore
//! use hatb_gateway::{run_server, AppState, GatewayConfig};
//!
//! let state = AppState::new(store.clone(), scheduler.status(), GatewayConfig::default());
//! tokio::spawn(run_server(state, shutdown.clone()));
//! ```

mod config;
mod error;
mod ingest;
mod server;
mod state;
mod types;

pub use config::GatewayConfig;
pub use error::{GatewayError, GatewayResult};
pub use ingest::{constant_time_eq, IngestionGate, WebhookPayload};
pub use server::{create_router, run_server};
pub use state::AppState;
pub use types::{
    MessageResponse, PageQuery, SettingsSaved, SettingsView, SignalQuery, StatusResponse,
    TradeLogView, WebhookResponse,
};
