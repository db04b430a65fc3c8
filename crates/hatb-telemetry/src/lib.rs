//! Prometheus metrics and structured logging for HATB.
//!
//! - Structured logging with tracing (JSON in production, pretty otherwise)
//! - Prometheus counters for admission, processing outcomes and cycle health
//! - Text exposition for the gateway's `/metrics` route

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::init_logging;
pub use metrics::Metrics;
