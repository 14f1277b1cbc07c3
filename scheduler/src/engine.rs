//! The scheduler loop.
//!
//! Each tick:
//!   1. Reload job files if the active set has gone stale.
//!   2. Release due deferrals; jobs still waiting sit the tick out.
//!   3. Sample host telemetry once, record the snapshot.
//!   4. Decide per candidate, order by score.
//!   5. Dispatch runnable jobs in order, park deferrals.
//!
//! The loop is meant to be unkillable: every per-job and per-probe
//! failure is logged and absorbed. Only SIGINT/SIGTERM end it, after the
//! current tick's dispatches finish.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Local, Utc};
use tokio::signal::unix::{SignalKind, signal};
use tracing::{debug, info, warn};

use executor::runner::JobExecutor;
use executor::types::ExecutionResult;
use jobs::config::JobLoader;
use jobs::model::{Job, JobState};
use sink::EventSink;
use telemetry::probe::Probe;
use telemetry::types::Metrics;

use crate::decision::DecisionEngine;
use crate::deferral::DeferralStore;
use crate::types::SchedulerConfig;

/// Deferral applied when a failed run is queued for another attempt.
const RETRY_DEFER_SEC: f64 = 300.0;

pub struct Scheduler<S: EventSink> {
    cfg: SchedulerConfig,
    loader: JobLoader,
    probe: Box<dyn Probe>,
    engine: DecisionEngine,
    executor: JobExecutor,
    sink: Arc<S>,
    jobs: Vec<Job>,
    deferred: DeferralStore,
    last_reload: f64,
    running: bool,
}

impl<S: EventSink> Scheduler<S> {
    pub fn new(
        cfg: SchedulerConfig,
        loader: JobLoader,
        probe: Box<dyn Probe>,
        engine: DecisionEngine,
        executor: JobExecutor,
        sink: Arc<S>,
    ) -> Self {
        Self {
            cfg,
            loader,
            probe,
            engine,
            executor,
            sink,
            jobs: Vec::new(),
            deferred: DeferralStore::new(),
            last_reload: 0.0,
            running: false,
        }
    }

    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    pub fn deferred(&self) -> &DeferralStore {
        &self.deferred
    }

    /// Replace the active set from disk. Runtime state carries over for
    /// surviving job names; new jobs start fresh, removed jobs are
    /// dropped along with any pending deferral.
    pub fn load_jobs(&mut self) {
        let mut previous: HashMap<String, JobState> = self
            .jobs
            .drain(..)
            .map(|job| (job.spec.job_name.clone(), job.state))
            .collect();

        let mut seen = std::collections::HashSet::new();
        for mut job in self.loader.load_all() {
            if !seen.insert(job.spec.job_name.clone()) {
                warn!(job = %job.name(), "duplicate job name, keeping the first definition");
                continue;
            }
            if let Some(state) = previous.remove(job.name()) {
                job.state = state;
            }
            self.jobs.push(job);
        }

        for dropped in previous.keys() {
            self.deferred.clear(dropped);
        }

        self.last_reload = epoch_now();
        info!(count = self.jobs.len(), "loaded job configurations");
        for job in &self.jobs {
            debug!(job = %job.name(), enabled = job.spec.enabled, "job loaded");
        }
    }

    fn reload_jobs_if_needed(&mut self, now_epoch: f64) {
        if now_epoch - self.last_reload > self.cfg.reload_interval.as_secs_f64() {
            debug!("reloading job configurations");
            self.load_jobs();
        }
    }

    /// One pass of the loop body. Never fails; see the module notes.
    pub async fn process_tick(&mut self) {
        let now = Local::now();
        let now_epoch = now.timestamp_millis() as f64 / 1000.0;

        self.reload_jobs_if_needed(now_epoch);

        for name in self.deferred.release_due(now_epoch) {
            debug!(job = %name, "deferral released");
        }

        // Disabled jobs are loaded (the operator CLI still sees them) but
        // never evaluated.
        let candidate_count = self
            .jobs
            .iter()
            .filter(|job| job.spec.enabled && !self.deferred.contains(job.name()))
            .count();
        if candidate_count == 0 {
            return;
        }

        let metrics = self.probe.sample().await;
        if let Err(e) = self.sink.log_metrics(&metrics).await {
            warn!(error = %e, "failed to record metrics snapshot");
        }

        let scored = {
            let candidates: Vec<&Job> = self
                .jobs
                .iter()
                .filter(|job| job.spec.enabled && !self.deferred.contains(job.name()))
                .collect();
            self.engine.prioritize(&candidates, &metrics, now)
        };

        for entry in scored {
            if entry.decision.should_run {
                self.dispatch(&entry.job_name, &entry.decision.reason, entry.decision.score, &metrics)
                    .await;
            } else if let Some(deadline) = entry.decision.defer_until {
                debug!(job = %entry.job_name, reason = %entry.decision.reason, "deferring job");
                self.deferred.add(&entry.job_name, deadline);
            }
        }
    }

    async fn dispatch(&mut self, job_name: &str, reason: &str, score: f64, metrics: &Metrics) {
        let Some(idx) = self.jobs.iter().position(|job| job.name() == job_name) else {
            return;
        };

        info!(job = %job_name, score, reason = %reason, "running job");

        let result = self.executor.execute_with_retry(&mut self.jobs[idx]).await;

        let ai_reason = self.jobs[idx].spec.ai_aware.then(|| reason.to_string());
        if let Err(e) = self
            .sink
            .log_execution(&result, metrics, ai_reason.as_deref())
            .await
        {
            warn!(job = %job_name, error = %e, "failed to record execution");
        }

        let job = &mut self.jobs[idx];
        if !result.success && job.spec.retry_on_fail && job.state.retry_count < job.spec.max_retries
        {
            job.state.retry_count += 1;
            info!(
                job = %job_name,
                attempt = job.state.retry_count,
                max_retries = job.spec.max_retries,
                "job failed, scheduling retry"
            );
            self.deferred.add(job_name, epoch_now() + RETRY_DEFER_SEC);
        } else {
            job.state.retry_count = 0;
            self.deferred.clear(job_name);
        }
    }

    /// Drive ticks until a shutdown signal arrives. Signals are honored
    /// between ticks so in-flight dispatches always complete.
    pub async fn run(&mut self) -> anyhow::Result<()> {
        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;

        info!("scheduler started");
        self.load_jobs();
        self.running = true;

        while self.running {
            self.process_tick().await;

            tokio::select! {
                _ = tokio::time::sleep(self.cfg.check_interval) => {}
                _ = sigint.recv() => {
                    info!("received SIGINT, shutting down gracefully");
                    self.running = false;
                }
                _ = sigterm.recv() => {
                    info!("received SIGTERM, shutting down gracefully");
                    self.running = false;
                }
            }
        }

        info!("scheduler stopped");
        Ok(())
    }

    /// Operator entry point: bypasses the decision engine entirely but
    /// still samples and records like a normal run.
    pub async fn run_job_now(&mut self, job_name: &str) -> anyhow::Result<ExecutionResult> {
        let Some(idx) = self.jobs.iter().position(|job| job.name() == job_name) else {
            anyhow::bail!("job not found: {job_name}");
        };

        info!(job = %job_name, "force running job");
        let metrics = self.probe.sample().await;
        if let Err(e) = self.sink.log_metrics(&metrics).await {
            warn!(error = %e, "failed to record metrics snapshot");
        }

        let result = self.executor.execute_with_retry(&mut self.jobs[idx]).await;
        if let Err(e) = self.sink.log_execution(&result, &metrics, None).await {
            warn!(job = %job_name, error = %e, "failed to record execution");
        }

        Ok(result)
    }
}

fn epoch_now() -> f64 {
    Utc::now().timestamp_millis() as f64 / 1000.0
}
