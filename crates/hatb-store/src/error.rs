//! Store error types.

use hatb_core::{CoreError, SignalId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Signal not found: {0}")]
    SignalNotFound(SignalId),

    #[error("No configuration row exists")]
    NoConfiguration,

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Journal corrupt at line {line}: {reason}")]
    Corrupt { line: usize, reason: String },

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;
