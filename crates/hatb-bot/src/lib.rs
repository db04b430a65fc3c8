//! HATB signal-driven auto trading bot.
//!
//! Wires the pipeline together:
//! - Gateway: webhook ingestion and admin API
//! - Store: signals, configuration and execution log
//! - Scheduler: polls `NEW` signals and executes them in batches

pub mod app;
pub mod config;
pub mod error;

pub use app::Application;
pub use config::{AppConfig, ExecutionConfig, ExecutionMode, SchedulerSection, StoreConfig, StoreKind};
pub use error::{AppError, AppResult};
