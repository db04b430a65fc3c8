//! Prometheus metrics for the signal pipeline.
//!
//! # Panics
//!
//! Metric registration uses `unwrap()`. A failure means a duplicate metric
//! name, which is a build defect and surfaces on first access at startup.

use once_cell::sync::Lazy;
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    Encoder, Histogram, IntCounter, IntCounterVec, IntGauge, TextEncoder,
};

use crate::error::TelemetryResult;

/// Signals that passed the ingestion gate.
pub static SIGNALS_ADMITTED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "hatb_signals_admitted_total",
        "Total signals admitted by the ingestion gate"
    )
    .unwrap()
});

/// Signals refused at the gate.
/// Labels: reason (unauthorized/validation/store)
pub static SIGNALS_REJECTED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "hatb_signals_rejected_total",
        "Total signals rejected by the ingestion gate",
        &["reason"]
    )
    .unwrap()
});

/// Processing attempts by outcome.
/// Labels: outcome (processed/failed/claim_lost)
pub static SIGNALS_PROCESSED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "hatb_signals_processed_total",
        "Total signal processing attempts by outcome",
        &["outcome"]
    )
    .unwrap()
});

pub static CYCLE_FAILURES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "hatb_cycle_failures_total",
        "Total polling cycles that failed and triggered backoff"
    )
    .unwrap()
});

/// 1 while the scheduler idles for lack of an active configuration.
pub static SCHEDULER_IDLE: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "hatb_scheduler_idle",
        "Scheduler idle because no configuration is active (1=idle)"
    )
    .unwrap()
});

pub static EXECUTION_LATENCY_MS: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "hatb_execution_latency_ms",
        "Execution endpoint round-trip latency in milliseconds",
        vec![1.0, 5.0, 10.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0, 10000.0]
    )
    .unwrap()
});

/// Metrics facade for easy access.
pub struct Metrics;

impl Metrics {
    pub fn signal_admitted() {
        SIGNALS_ADMITTED_TOTAL.inc();
    }

    pub fn signal_rejected(reason: &str) {
        SIGNALS_REJECTED_TOTAL.with_label_values(&[reason]).inc();
    }

    /// Record one processing outcome.
    pub fn signal_processed(outcome: &str) {
        SIGNALS_PROCESSED_TOTAL.with_label_values(&[outcome]).inc();
    }

    pub fn cycle_failed() {
        CYCLE_FAILURES_TOTAL.inc();
    }

    pub fn scheduler_idle(idle: bool) {
        SCHEDULER_IDLE.set(i64::from(idle));
    }

    pub fn execution_latency(latency_ms: f64) {
        EXECUTION_LATENCY_MS.observe(latency_ms);
    }

    /// Render every registered metric in the Prometheus text format.
    pub fn render() -> TelemetryResult<String> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&prometheus::gather(), &mut buf)?;
        Ok(String::from_utf8(buf)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_contains_touched_metrics() {
        Metrics::signal_admitted();
        Metrics::signal_rejected("unauthorized");
        Metrics::signal_processed("processed");
        Metrics::scheduler_idle(true);

        let text = Metrics::render().unwrap();
        assert!(text.contains("hatb_signals_admitted_total"));
        assert!(text.contains("reason=\"unauthorized\""));
        assert!(text.contains("outcome=\"processed\""));
        assert!(text.contains("hatb_scheduler_idle 1"));
    }

    #[test]
    fn test_rejected_counter_increments() {
        let before = SIGNALS_REJECTED_TOTAL
            .with_label_values(&["validation"])
            .get();
        Metrics::signal_rejected("validation");
        let after = SIGNALS_REJECTED_TOTAL
            .with_label_values(&["validation"])
            .get();
        assert_eq!(after, before + 1);
    }
}
