//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Store error: {0}")]
    Store(#[from] hatb_store::StoreError),

    #[error("Executor error: {0}")]
    Executor(#[from] hatb_executor::ExecutorError),

    #[error("Gateway error: {0}")]
    Gateway(#[from] hatb_gateway::GatewayError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] hatb_telemetry::TelemetryError),

    #[error("Task failed: {0}")]
    Task(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AppResult<T> = Result<T, AppError>;
