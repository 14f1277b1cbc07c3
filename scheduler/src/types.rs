//! Shared configuration for the scheduler loop.

use std::time::Duration;

/// Timing knobs for the scheduler.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Pause between ticks.
    pub check_interval: Duration,

    /// Reload job files from disk once the active set is older than this.
    pub reload_interval: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            check_interval: Duration::from_secs(60),
            reload_interval: Duration::from_secs(300),
        }
    }
}
