//! Append-only event sink for execution records and metric snapshots.
//!
//! The scheduler writes through the `EventSink` trait; the shipped
//! implementation persists to SQLite and mirrors each execution into a
//! per-job text log.

pub mod sqlite;

use async_trait::async_trait;

use executor::types::ExecutionResult;
use telemetry::types::Metrics;

#[async_trait]
pub trait EventSink: Send + Sync {
    /// Record one finished execution together with the host state it ran
    /// under and, for AI-aware jobs, the reason the engine gave.
    async fn log_execution(
        &self,
        result: &ExecutionResult,
        metrics: &Metrics,
        ai_decision_reason: Option<&str>,
    ) -> anyhow::Result<()>;

    /// Record a per-tick host snapshot.
    async fn log_metrics(&self, metrics: &Metrics) -> anyhow::Result<()>;
}
