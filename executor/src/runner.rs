//! Shell command execution with timeout, full I/O capture, and retry.
//!
//! Commands are handed to `sh -c` so pipes and expansions behave the way
//! the job file author expects. Every failure mode ends up inside the
//! returned `ExecutionResult`; nothing here panics or propagates.

use std::process::Stdio;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

use jobs::model::Job;

use crate::types::{ExecutionResult, ExecutorConfig};

pub struct JobExecutor {
    cfg: ExecutorConfig,
}

impl JobExecutor {
    pub fn new(cfg: ExecutorConfig) -> Self {
        Self { cfg }
    }

    /// Run the job's command once and record the outcome on its state.
    pub async fn execute(&self, job: &mut Job) -> ExecutionResult {
        info!(job = %job.spec.job_name, "starting job");
        debug!(command = %job.spec.command, "command line");

        let result =
            run_command(&job.spec.job_name, &job.spec.command, job.spec.timeout_sec).await;

        job.state.last_run_time = Some(result.end_time);
        job.state.last_run_success = Some(result.success);

        info!(
            job = %result.job_name,
            exit_code = result.exit_code,
            duration_sec = result.execution_time,
            "job completed: {}",
            if result.success { "SUCCESS" } else { "FAILED" }
        );

        result
    }

    /// Up to `max_retries + 1` attempts with a pause in between; stops on
    /// the first success. The returned result is the final attempt's.
    pub async fn execute_with_retry(&self, job: &mut Job) -> ExecutionResult {
        let mut result = self.execute(job).await;
        if result.success || !job.spec.retry_on_fail {
            return result;
        }

        let max_retries = job.spec.max_retries;
        for attempt in 1..=max_retries {
            sleep(self.cfg.retry_delay).await;
            info!(
                job = %job.spec.job_name,
                attempt = attempt + 1,
                total = max_retries + 1,
                "retrying job"
            );

            result = self.execute(job).await;
            if result.success {
                break;
            }
        }

        result
    }

    /// Run inside a transient systemd scope, restoring the original
    /// command line afterwards.
    pub async fn execute_sandboxed(&self, job: &mut Job, use_systemd: bool) -> ExecutionResult {
        if !use_systemd {
            return self.execute_with_retry(job).await;
        }

        let original = job.spec.command.clone();
        job.spec.command = format!("systemd-run --user --scope --quiet {original}");

        let result = self.execute_with_retry(job).await;

        job.spec.command = original;
        result
    }
}

async fn run_command(job_name: &str, command: &str, timeout_sec: Option<u64>) -> ExecutionResult {
    let start_time = Utc::now().timestamp_millis() as f64 / 1000.0;
    let started = Instant::now();

    let spawned = Command::new("sh")
        .arg("-c")
        .arg(command)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn();

    let mut child = match spawned {
        Ok(child) => child,
        Err(e) => {
            warn!(job = %job_name, error = %e, "failed to spawn command");
            let execution_time = started.elapsed().as_secs_f64();
            return ExecutionResult {
                job_name: job_name.to_string(),
                start_time,
                end_time: start_time + execution_time,
                exit_code: -1,
                stdout: String::new(),
                stderr: e.to_string(),
                execution_time,
                success: false,
                timed_out: false,
            };
        }
    };

    let stdout_task = child.stdout.take().map(|pipe| tokio::spawn(read_stream(pipe)));
    let stderr_task = child.stderr.take().map(|pipe| tokio::spawn(read_stream(pipe)));

    let status = match timeout_sec {
        Some(secs) => match timeout(Duration::from_secs(secs), child.wait()).await {
            Ok(waited) => Some(waited),
            Err(_) => {
                // Deadline passed: kill the shell and reap it so the
                // capture pipes reach EOF.
                let _ = child.start_kill();
                let _ = child.wait().await;
                None
            }
        },
        None => Some(child.wait().await),
    };

    let stdout = collect(stdout_task).await;
    let captured_stderr = collect(stderr_task).await;

    let (exit_code, success, timed_out, stderr) = match status {
        None => {
            warn!(job = %job_name, timeout_sec, "job timed out");
            let stderr = if captured_stderr.is_empty() {
                "Job timed out".to_string()
            } else {
                format!("Job timed out\n{captured_stderr}")
            };
            (-1, false, true, stderr)
        }
        Some(Ok(status)) => {
            // A signal death has no code; report it like a launch failure.
            (status.code().unwrap_or(-1), status.success(), false, captured_stderr)
        }
        Some(Err(e)) => {
            warn!(job = %job_name, error = %e, "failed waiting on command");
            let stderr = if captured_stderr.is_empty() {
                e.to_string()
            } else {
                format!("{captured_stderr}\n{e}")
            };
            (-1, false, false, stderr)
        }
    };

    let execution_time = started.elapsed().as_secs_f64();
    ExecutionResult {
        job_name: job_name.to_string(),
        start_time,
        end_time: start_time + execution_time,
        exit_code,
        stdout,
        stderr,
        execution_time,
        success,
        timed_out,
    }
}

async fn read_stream<R>(mut reader: R) -> String
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    let _ = reader.read_to_end(&mut buf).await;
    String::from_utf8_lossy(&buf).into_owned()
}

async fn collect(task: Option<JoinHandle<String>>) -> String {
    match task {
        Some(task) => task.await.unwrap_or_default(),
        None => String::new(),
    }
}
