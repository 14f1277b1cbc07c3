//! Execution outcome and configuration types.

use std::time::Duration;

/// What happened when a command ran.
///
/// Spawn failures and timeouts are folded in rather than raised:
/// `exit_code` becomes -1 and the error text lands in `stderr`, so the
/// scheduler loop never has to unwind past a broken job.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub job_name: String,
    /// Epoch seconds.
    pub start_time: f64,
    pub end_time: f64,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    /// Wall-clock seconds spent on this attempt.
    pub execution_time: f64,
    pub success: bool,
    pub timed_out: bool,
}

/// Configuration knobs for the executor.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Pause between attempts when a job has `retry_on_fail` set.
    pub retry_delay: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            retry_delay: Duration::from_secs(60),
        }
    }
}
