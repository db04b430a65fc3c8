//! Dispatch and execution for the HATB signal pipeline.
//!
//! - [`Scheduler`]: polling loop that pulls `NEW` signals in batches and
//!   fans them out to the processor
//! - [`SignalProcessor`]: claim, execute with a timeout, record the outcome
//! - [`ExecutionEndpoint`]: the seam to whatever fills orders
//!   ([`SimulatedEndpoint`], [`HttpEndpoint`], [`MockEndpoint`])

pub mod backoff;
pub mod endpoint;
pub mod error;
pub mod http;
pub mod processor;
pub mod scheduler;
pub mod simulated;
pub mod sizing;

pub use backoff::Backoff;
pub use endpoint::{DynEndpoint, ExecutionEndpoint, MockEndpoint};
pub use error::{ExecutorError, ExecutorResult};
pub use http::HttpEndpoint;
pub use processor::{DynProcessor, ProcessOutcome, SignalProcessor};
pub use scheduler::{CycleOutcome, CycleReport, Scheduler, SchedulerConfig, SchedulerStatus};
pub use simulated::SimulatedEndpoint;
pub use sizing::OrderSizer;
