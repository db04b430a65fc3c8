//! Executor error types.

use hatb_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExecutorError {
    /// The endpoint could not fill the order.
    #[error("Execution failed: {0}")]
    Execution(String),

    #[error("Execution timed out after {0}ms")]
    Timeout(u64),

    #[error("Order rejected: {0}")]
    Rejected(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Invalid executor configuration: {0}")]
    Config(String),

    #[error("Processing task panicked: {0}")]
    TaskPanicked(String),
}

impl ExecutorError {
    /// Whether this error belongs to a single order attempt rather than the
    /// cycle as a whole.
    #[must_use]
    pub fn is_execution_failure(&self) -> bool {
        matches!(
            self,
            Self::Execution(_) | Self::Timeout(_) | Self::Rejected(_) | Self::Http(_)
        )
    }
}

pub type ExecutorResult<T> = Result<T, ExecutorError>;
