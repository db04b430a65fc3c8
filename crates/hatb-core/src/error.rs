//! Error types for hatb-core.

use thiserror::Error;

use crate::signal::{SignalId, SignalState};

/// Core error types.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid symbol: {0}")]
    InvalidSymbol(String),

    #[error("Invalid action: {0}")]
    InvalidAction(String),

    #[error("Invalid price: {0}")]
    InvalidPrice(String),

    #[error("Invalid risk fraction: {0}")]
    InvalidRisk(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid signal state: {0}")]
    InvalidState(String),

    #[error("Arithmetic overflow: {0}")]
    Overflow(String),

    #[error("Signal {id}: illegal transition {from} -> {to}")]
    IllegalTransition {
        id: SignalId,
        from: SignalState,
        to: SignalState,
    },

    #[error("Decimal parse error: {0}")]
    DecimalParse(#[from] rust_decimal::Error),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
