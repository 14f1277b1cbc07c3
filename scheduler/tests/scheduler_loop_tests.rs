mod mock_sink;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use executor::runner::JobExecutor;
use executor::types::ExecutorConfig;
use jobs::config::JobLoader;
use predictor::Predictor;
use predictor::heuristic::HeuristicPredictor;
use scheduler::decision::DecisionEngine;
use scheduler::engine::Scheduler;
use scheduler::types::SchedulerConfig;
use telemetry::types::Metrics;

use mock_sink::{MemorySink, StaticProbe};

fn quiet_metrics() -> Metrics {
    let mut m = Metrics::default();
    m.timestamp = Utc::now().timestamp_millis() as f64 / 1000.0;
    m.cpu.cpu_percent = 10.0;
    m.memory.percent = 30.0;
    m.disk.free_gb = 100.0;
    m.idle_time_sec = Some(600);
    m
}

fn busy_metrics() -> Metrics {
    let mut m = quiet_metrics();
    m.cpu.cpu_percent = 75.0;
    m
}

fn write_job(dir: &Path, file: &str, contents: &str) {
    std::fs::write(dir.join(file), contents).unwrap();
}

fn build(
    dir: &Path,
    metrics: Metrics,
    predictor: Option<Arc<dyn Predictor>>,
    sink: Arc<MemorySink>,
) -> Scheduler<MemorySink> {
    Scheduler::new(
        SchedulerConfig::default(),
        JobLoader::new(dir),
        Box::new(StaticProbe(metrics)),
        DecisionEngine::new(predictor),
        JobExecutor::new(ExecutorConfig {
            retry_delay: Duration::from_millis(10),
        }),
        sink,
    )
}

#[tokio::test]
async fn tick_runs_an_unconstrained_job() {
    let dir = tempfile::tempdir().unwrap();
    write_job(dir.path(), "backup.yaml", "job_name: backup\ncommand: echo done\n");

    let sink = Arc::new(MemorySink::default());
    let mut sched = build(dir.path(), quiet_metrics(), None, Arc::clone(&sink));
    sched.load_jobs();
    sched.process_tick().await;

    assert_eq!(sink.snapshots.lock().await.len(), 1);

    let executions = sink.executions.lock().await;
    assert_eq!(executions.len(), 1);
    let (result, ai_reason) = &executions[0];
    assert_eq!(result.job_name, "backup");
    assert!(result.success);
    assert_eq!(result.stdout, "done\n");
    assert!(ai_reason.is_none());

    assert!(sched.deferred().is_empty());
    assert_eq!(sched.jobs()[0].state.last_run_success, Some(true));
    assert_eq!(sched.jobs()[0].state.retry_count, 0);
}

#[tokio::test]
async fn constrained_job_defers_and_sits_out_the_next_tick() {
    let dir = tempfile::tempdir().unwrap();
    write_job(
        dir.path(),
        "compile.yaml",
        "job_name: compile\ncommand: echo hi\nmax_cpu_percent: 50\n",
    );

    let sink = Arc::new(MemorySink::default());
    let mut sched = build(dir.path(), busy_metrics(), None, Arc::clone(&sink));
    sched.load_jobs();

    let before = Utc::now().timestamp_millis() as f64 / 1000.0;
    sched.process_tick().await;

    assert!(sink.executions.lock().await.is_empty());
    assert_eq!(sink.snapshots.lock().await.len(), 1);

    let deadline = sched.deferred().deadline("compile").expect("deferred");
    assert!(
        deadline >= before + 299.0 && deadline <= before + 302.0,
        "deadline {deadline} not ~300s out"
    );

    // While the deferral is pending there are no candidates, so the next
    // tick does not even sample.
    sched.process_tick().await;
    assert_eq!(sink.snapshots.lock().await.len(), 1);
    assert_eq!(sched.deferred().len(), 1);
}

#[tokio::test]
async fn failed_job_with_retry_opt_in_is_queued_again() {
    let dir = tempfile::tempdir().unwrap();
    write_job(
        dir.path(),
        "flaky.yaml",
        "job_name: flaky\ncommand: exit 1\nretry_on_fail: true\nmax_retries: 1\n",
    );

    let sink = Arc::new(MemorySink::default());
    let mut sched = build(dir.path(), quiet_metrics(), None, Arc::clone(&sink));
    sched.load_jobs();
    sched.process_tick().await;

    // Only the final attempt of execute_with_retry is recorded.
    let executions = sink.executions.lock().await;
    assert_eq!(executions.len(), 1);
    assert!(!executions[0].0.success);

    assert_eq!(sched.jobs()[0].state.retry_count, 1);
    assert!(sched.deferred().contains("flaky"));
}

#[tokio::test]
async fn success_resets_retry_bookkeeping() {
    let dir = tempfile::tempdir().unwrap();
    write_job(
        dir.path(),
        "steady.yaml",
        "job_name: steady\ncommand: echo ok\nretry_on_fail: true\nmax_retries: 2\n",
    );

    let sink = Arc::new(MemorySink::default());
    let mut sched = build(dir.path(), quiet_metrics(), None, Arc::clone(&sink));
    sched.load_jobs();
    sched.process_tick().await;

    assert_eq!(sched.jobs()[0].state.retry_count, 0);
    assert!(sched.deferred().is_empty());
    assert_eq!(sched.jobs()[0].state.last_run_success, Some(true));
}

#[tokio::test]
async fn disabled_jobs_are_never_evaluated() {
    let dir = tempfile::tempdir().unwrap();
    write_job(
        dir.path(),
        "paused.yaml",
        "job_name: paused\ncommand: echo hi\nenabled: false\n",
    );

    let sink = Arc::new(MemorySink::default());
    let mut sched = build(dir.path(), quiet_metrics(), None, Arc::clone(&sink));
    sched.load_jobs();
    sched.process_tick().await;

    // No candidates at all: no sample, no execution, no deferral.
    assert!(sink.snapshots.lock().await.is_empty());
    assert!(sink.executions.lock().await.is_empty());
    assert!(sched.deferred().is_empty());
    // The job is still visible to operators.
    assert_eq!(sched.jobs().len(), 1);
}

#[tokio::test]
async fn ai_aware_execution_records_the_decision_reason() {
    let dir = tempfile::tempdir().unwrap();
    write_job(
        dir.path(),
        "train.yaml",
        "job_name: train\ncommand: echo trained\nai_aware: true\n",
    );

    let sink = Arc::new(MemorySink::default());
    let mut sched = build(
        dir.path(),
        quiet_metrics(),
        Some(Arc::new(HeuristicPredictor::new())),
        Arc::clone(&sink),
    );
    sched.load_jobs();
    sched.process_tick().await;

    let executions = sink.executions.lock().await;
    assert_eq!(executions.len(), 1);
    let (result, ai_reason) = &executions[0];
    assert!(result.success);
    assert!(
        ai_reason.as_deref().is_some_and(|r| r.contains("heuristic")),
        "ai reason was {ai_reason:?}"
    );
}

#[tokio::test]
async fn run_job_now_bypasses_the_decision_engine() {
    let dir = tempfile::tempdir().unwrap();
    write_job(
        dir.path(),
        "blocked.yaml",
        "job_name: blocked\ncommand: echo forced\nmax_cpu_percent: 50\n",
    );

    let sink = Arc::new(MemorySink::default());
    // Busy host: a normal tick would defer this job.
    let mut sched = build(dir.path(), busy_metrics(), None, Arc::clone(&sink));
    sched.load_jobs();

    let result = sched.run_job_now("blocked").await.unwrap();
    assert!(result.success);
    assert_eq!(result.stdout, "forced\n");

    assert_eq!(sink.snapshots.lock().await.len(), 1);
    assert_eq!(sink.executions.lock().await.len(), 1);

    assert!(sched.run_job_now("ghost").await.is_err());
}

#[tokio::test]
async fn reload_carries_runtime_state_for_surviving_jobs() {
    let dir = tempfile::tempdir().unwrap();
    write_job(dir.path(), "a.yaml", "job_name: a\ncommand: echo a\n");

    let sink = Arc::new(MemorySink::default());
    let mut sched = build(dir.path(), quiet_metrics(), None, Arc::clone(&sink));
    sched.load_jobs();
    sched.process_tick().await;

    let last_run = sched.jobs()[0].state.last_run_time;
    assert!(last_run.is_some());

    // A new job appears on disk; the old one keeps its state.
    write_job(dir.path(), "b.yaml", "job_name: b\ncommand: echo b\n");
    sched.load_jobs();

    assert_eq!(sched.jobs().len(), 2);
    let a = sched.jobs().iter().find(|j| j.name() == "a").unwrap();
    let b = sched.jobs().iter().find(|j| j.name() == "b").unwrap();
    assert_eq!(a.state.last_run_time, last_run);
    assert_eq!(b.state.last_run_time, None);

    // Removing the file drops the job on the next reload.
    std::fs::remove_file(dir.path().join("a.yaml")).unwrap();
    sched.load_jobs();
    assert_eq!(sched.jobs().len(), 1);
    assert_eq!(sched.jobs()[0].name(), "b");
}
