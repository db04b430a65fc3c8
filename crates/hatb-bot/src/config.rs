//! Application configuration.
//!
//! Loaded from TOML. Every section and field has a default, so a partial
//! file (or no file at all) yields a runnable configuration.
//!
//! The trading run-configuration (credentials, strategy, risk, active flag)
//! is not here: it lives in the settings store and is edited at runtime.

use std::path::Path;
use std::time::Duration;

use hatb_core::{Price, Size};
use hatb_executor::{OrderSizer, SchedulerConfig};
use hatb_gateway::GatewayConfig;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{AppError, AppResult};

/// Environment variable that overrides `gateway.webhook_secret`.
pub const WEBHOOK_SECRET_ENV: &str = "HATB_WEBHOOK_SECRET";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub scheduler: SchedulerSection,
    #[serde(default)]
    pub execution: ExecutionConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

// ============================================================================
// [scheduler]
// ============================================================================

/// Polling cadence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerSection {
    /// Maximum signals dispatched per cycle.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Sleep after a normal cycle.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Sleep while no configuration is active.
    #[serde(default = "default_idle_interval_ms")]
    pub idle_interval_ms: u64,
    /// Sleep after a failed cycle.
    #[serde(default = "default_error_backoff_ms")]
    pub error_backoff_ms: u64,
}

fn default_batch_size() -> usize {
    5
}

fn default_poll_interval_ms() -> u64 {
    1_000
}

fn default_idle_interval_ms() -> u64 {
    5_000
}

fn default_error_backoff_ms() -> u64 {
    5_000
}

impl Default for SchedulerSection {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            poll_interval_ms: default_poll_interval_ms(),
            idle_interval_ms: default_idle_interval_ms(),
            error_backoff_ms: default_error_backoff_ms(),
        }
    }
}

impl SchedulerSection {
    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            batch_size: self.batch_size,
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            idle_interval: Duration::from_millis(self.idle_interval_ms),
            error_backoff: Duration::from_millis(self.error_backoff_ms),
        }
    }
}

// ============================================================================
// [execution]
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// Fill locally at the price hint.
    #[default]
    Simulated,
    /// Signed HTTP calls to `endpoint_url`.
    Http,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionConfig {
    #[serde(default)]
    pub mode: ExecutionMode,
    /// Base URL of the order API (http mode only).
    #[serde(default)]
    pub endpoint_url: String,
    /// Bound on a single execution call.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_account_equity")]
    pub account_equity: Decimal,
    #[serde(default = "default_lot_step")]
    pub lot_step: Decimal,
    #[serde(default = "default_min_quantity")]
    pub min_quantity: Decimal,
    /// Price hint for signals that arrive without a price.
    #[serde(default = "default_fallback_price")]
    pub fallback_price: Decimal,
    /// Simulated fee as a fraction of notional.
    #[serde(default = "default_fee_rate")]
    pub fee_rate: Decimal,
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_account_equity() -> Decimal {
    Decimal::from(10_000)
}

fn default_lot_step() -> Decimal {
    Decimal::new(1, 4)
}

fn default_min_quantity() -> Decimal {
    Decimal::new(1, 2)
}

fn default_fallback_price() -> Decimal {
    Decimal::from(100)
}

fn default_fee_rate() -> Decimal {
    Decimal::new(5, 4)
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            mode: ExecutionMode::default(),
            endpoint_url: String::new(),
            timeout_ms: default_timeout_ms(),
            account_equity: default_account_equity(),
            lot_step: default_lot_step(),
            min_quantity: default_min_quantity(),
            fallback_price: default_fallback_price(),
            fee_rate: default_fee_rate(),
        }
    }
}

impl ExecutionConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn order_sizer(&self) -> OrderSizer {
        OrderSizer::new(
            self.account_equity,
            Size::new(self.lot_step),
            Size::new(self.min_quantity),
            Price::new(self.fallback_price),
        )
    }
}

// ============================================================================
// [store]
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    /// Process-lifetime only.
    Memory,
    /// JSON Lines journal under `data_dir`.
    #[default]
    Journal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub kind: StoreKind,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

fn default_data_dir() -> String {
    "./data".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            kind: StoreKind::default(),
            data_dir: default_data_dir(),
        }
    }
}

// ============================================================================
// Loading
// ============================================================================

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read config: {e}")))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> AppResult<Self> {
        toml::from_str(content).map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))
    }

    /// Load `path` if it exists (defaults otherwise), apply environment
    /// overrides and validate.
    pub fn load(path: &str) -> AppResult<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            warn!(path, "Config file not found, using defaults");
            Self::default()
        };
        if let Ok(secret) = std::env::var(WEBHOOK_SECRET_ENV) {
            config.apply_webhook_secret(secret);
        }
        config.validate()?;
        Ok(config)
    }

    /// Replace the webhook secret unless `secret` is blank.
    pub fn apply_webhook_secret(&mut self, secret: String) {
        if !secret.trim().is_empty() {
            self.gateway.webhook_secret = secret;
        }
    }

    pub fn validate(&self) -> AppResult<()> {
        let s = &self.scheduler;
        if s.batch_size == 0 {
            return Err(AppError::Config("scheduler.batch_size must be > 0".to_string()));
        }
        if s.poll_interval_ms == 0 || s.idle_interval_ms == 0 || s.error_backoff_ms == 0 {
            return Err(AppError::Config(
                "scheduler intervals must be > 0".to_string(),
            ));
        }

        let e = &self.execution;
        if e.timeout_ms == 0 {
            return Err(AppError::Config("execution.timeout_ms must be > 0".to_string()));
        }
        if e.account_equity <= Decimal::ZERO {
            return Err(AppError::Config(
                "execution.account_equity must be positive".to_string(),
            ));
        }
        if e.fallback_price <= Decimal::ZERO {
            return Err(AppError::Config(
                "execution.fallback_price must be positive".to_string(),
            ));
        }
        if e.lot_step < Decimal::ZERO || e.min_quantity < Decimal::ZERO || e.fee_rate < Decimal::ZERO {
            return Err(AppError::Config(
                "execution.lot_step, min_quantity and fee_rate must not be negative".to_string(),
            ));
        }
        if e.mode == ExecutionMode::Http && e.endpoint_url.trim().is_empty() {
            return Err(AppError::Config(
                "execution.endpoint_url is required in http mode".to_string(),
            ));
        }

        if self.gateway.webhook_secret.is_empty() {
            return Err(AppError::Config(
                "gateway.webhook_secret must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
