use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use executor::types::ExecutionResult;
use sink::EventSink;
use telemetry::probe::Probe;
use telemetry::types::Metrics;

/// In-memory sink recording everything the scheduler reports.
#[derive(Default)]
pub struct MemorySink {
    pub executions: Arc<Mutex<Vec<(ExecutionResult, Option<String>)>>>,
    pub snapshots: Arc<Mutex<Vec<Metrics>>>,
}

#[async_trait]
impl EventSink for MemorySink {
    async fn log_execution(
        &self,
        result: &ExecutionResult,
        _metrics: &Metrics,
        ai_decision_reason: Option<&str>,
    ) -> anyhow::Result<()> {
        self.executions
            .lock()
            .await
            .push((result.clone(), ai_decision_reason.map(str::to_string)));
        Ok(())
    }

    async fn log_metrics(&self, metrics: &Metrics) -> anyhow::Result<()> {
        self.snapshots.lock().await.push(metrics.clone());
        Ok(())
    }
}

/// Probe that hands back the same snapshot every tick.
pub struct StaticProbe(pub Metrics);

#[async_trait]
impl Probe for StaticProbe {
    async fn sample(&mut self) -> Metrics {
        self.0.clone()
    }
}
