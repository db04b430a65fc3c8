//! Inter-cycle delay selection.

use std::time::Duration;

use hatb_telemetry::Metrics;
use tracing::{error, info};

use crate::error::ExecutorResult;
use crate::scheduler::{CycleOutcome, SchedulerConfig};

/// Chooses how long the scheduler sleeps after each cycle.
///
/// | last cycle            | delay            |
/// |-----------------------|------------------|
/// | dispatched or empty   | `poll_interval`  |
/// | no active config      | `idle_interval`  |
/// | failed                | `error_backoff`  |
///
/// Also owns the "idle" log line so it is emitted once per inactive streak.
#[derive(Debug)]
pub struct Backoff {
    poll_interval: Duration,
    idle_interval: Duration,
    error_backoff: Duration,
    inactive: bool,
}

impl Backoff {
    pub fn new(config: &SchedulerConfig) -> Self {
        Self {
            poll_interval: config.poll_interval,
            idle_interval: config.idle_interval,
            error_backoff: config.error_backoff,
            inactive: false,
        }
    }

    /// Whether the last cycle found no active configuration.
    pub fn is_inactive(&self) -> bool {
        self.inactive
    }

    pub fn next_delay(&mut self, result: &ExecutorResult<CycleOutcome>) -> Duration {
        match result {
            Ok(CycleOutcome::Inactive) => {
                if !self.inactive {
                    info!(
                        idle_ms = self.idle_interval.as_millis() as u64,
                        "No active configuration, scheduler idle"
                    );
                    Metrics::scheduler_idle(true);
                }
                self.inactive = true;
                self.idle_interval
            }
            Ok(_) => {
                self.leave_inactive();
                self.poll_interval
            }
            Err(e) => {
                Metrics::cycle_failed();
                error!(
                    error = %e,
                    backoff_ms = self.error_backoff.as_millis() as u64,
                    "Polling cycle failed, backing off"
                );
                self.error_backoff
            }
        }
    }

    fn leave_inactive(&mut self) {
        if self.inactive {
            info!("Configuration active, scheduler resuming");
            Metrics::scheduler_idle(false);
        }
        self.inactive = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExecutorError;
    use crate::scheduler::CycleReport;

    fn backoff() -> Backoff {
        Backoff::new(&SchedulerConfig::default())
    }

    #[test]
    fn test_delay_per_outcome() {
        let mut b = backoff();
        assert_eq!(b.next_delay(&Ok(CycleOutcome::Idle)), Duration::from_secs(1));
        assert_eq!(
            b.next_delay(&Ok(CycleOutcome::Dispatched(CycleReport::default()))),
            Duration::from_secs(1)
        );
        assert_eq!(b.next_delay(&Ok(CycleOutcome::Inactive)), Duration::from_secs(5));
        assert_eq!(
            b.next_delay(&Err(ExecutorError::TaskPanicked("boom".to_string()))),
            Duration::from_secs(5)
        );
    }

    #[test]
    fn test_inactive_streak_tracking() {
        let mut b = backoff();
        b.next_delay(&Ok(CycleOutcome::Inactive));
        b.next_delay(&Ok(CycleOutcome::Inactive));
        assert!(b.is_inactive());
        b.next_delay(&Ok(CycleOutcome::Idle));
        assert!(!b.is_inactive());
    }

    #[test]
    fn test_failure_keeps_inactive_flag() {
        let mut b = backoff();
        b.next_delay(&Ok(CycleOutcome::Inactive));
        b.next_delay(&Err(ExecutorError::Config("x".to_string())));
        assert!(b.is_inactive());
    }
}
