//! Core domain types for the HATB signal pipeline.
//!
//! This crate provides the types shared by every stage of the
//! ingestion → queue → dispatch → execute → record pipeline:
//! - `Signal`, `SignalId`, `SignalState`: inbound instructions and their lifecycle
//! - `Configuration`, `Credentials`: the externally managed run-configuration
//! - `ExecutionRecord`, `Fill`, `OrderRequest`: execution inputs and results
//! - `Price`, `Size`: precision-safe numeric types

pub mod decimal;
pub mod error;
pub mod execution;
pub mod order;
pub mod settings;
pub mod signal;

pub use decimal::{Price, Size};
pub use error::{CoreError, Result};
pub use execution::{ExecutionRecord, Fill, OrderRequest, Page};
pub use order::{OrderId, OrderSide};
pub use settings::{Configuration, ConfigurationUpdate, Credentials, RiskFraction};
pub use signal::{NewSignal, Signal, SignalId, SignalState};
