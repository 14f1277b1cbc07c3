//! SqliteSink
//! ----------
//! SQLite-backed implementation of the `EventSink` trait. It is
//! responsible for the durable record of scheduler activity:
//!
//!  - every command execution with its captured output and host state
//!  - per-tick host snapshots for later model training
//!  - history queries backing the operator CLI
//!
//! Optionally mirrors each execution into `<log_dir>/<job>.log` so an
//! operator can tail a single job without SQL.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{Local, TimeZone};
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{Row, SqlitePool};
use tokio::io::AsyncWriteExt;
use tracing::warn;

use executor::types::ExecutionResult;
use telemetry::types::Metrics;

use super::EventSink;

pub struct SqliteSink {
    pool: SqlitePool,
    log_dir: Option<PathBuf>,
}

/// One row of the `job_executions` table.
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub job_name: String,
    pub start_time: f64,
    pub end_time: Option<f64>,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub execution_time: f64,
    pub success: bool,
    pub ai_decision_reason: Option<String>,
}

impl SqliteSink {
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self {
            pool,
            log_dir: None,
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Open (or create) the database file and ensure the schema exists.
    pub async fn new(db_path: &Path, log_dir: Option<PathBuf>) -> anyhow::Result<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        if let Some(dir) = &log_dir {
            std::fs::create_dir_all(dir)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true);
        let pool = SqlitePool::connect_with(options).await?;

        let sink = Self { pool, log_dir };
        sink.init_schema().await?;
        Ok(sink)
    }

    pub async fn init_schema(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS job_executions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                job_name TEXT NOT NULL,
                start_time REAL NOT NULL,
                end_time REAL,
                exit_code INTEGER,
                stdout TEXT,
                stderr TEXT,
                execution_time_sec REAL,
                system_state TEXT,
                ai_decision_reason TEXT,
                success BOOLEAN,
                timestamp TEXT
            );
        "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS system_snapshots (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp REAL NOT NULL,
                cpu_load REAL,
                memory_percent REAL,
                battery_percent REAL,
                is_charging BOOLEAN,
                idle_time_sec INTEGER,
                metrics_json TEXT
            );
        "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Most recent executions of one job, newest first.
    pub async fn job_history(
        &self,
        job_name: &str,
        limit: u32,
    ) -> anyhow::Result<Vec<HistoryEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT job_name, start_time, end_time, exit_code, stdout, stderr,
                   execution_time_sec, success, ai_decision_reason
            FROM job_executions
            WHERE job_name = ?
            ORDER BY start_time DESC
            LIMIT ?
        "#,
        )
        .bind(job_name)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            entries.push(HistoryEntry {
                job_name: row.get("job_name"),
                start_time: row.get("start_time"),
                end_time: row.get("end_time"),
                exit_code: row.get::<Option<i64>, _>("exit_code").unwrap_or(-1) as i32,
                stdout: row.get::<Option<String>, _>("stdout").unwrap_or_default(),
                stderr: row.get::<Option<String>, _>("stderr").unwrap_or_default(),
                execution_time: row
                    .get::<Option<f64>, _>("execution_time_sec")
                    .unwrap_or(0.0),
                success: row.get::<Option<bool>, _>("success").unwrap_or(false),
                ai_decision_reason: row.get("ai_decision_reason"),
            });
        }

        Ok(entries)
    }

    /// Share of successful runs over the last `last_n`; an empty history
    /// is optimistically 1.0.
    pub async fn success_rate(&self, job_name: &str, last_n: u32) -> anyhow::Result<f64> {
        let history = self.job_history(job_name, last_n).await?;
        if history.is_empty() {
            return Ok(1.0);
        }

        let successes = history.iter().filter(|h| h.success).count();
        Ok(successes as f64 / history.len() as f64)
    }

    pub async fn average_execution_time(
        &self,
        job_name: &str,
        last_n: u32,
    ) -> anyhow::Result<f64> {
        let history = self.job_history(job_name, last_n).await?;
        let times: Vec<f64> = history
            .iter()
            .map(|h| h.execution_time)
            .filter(|t| *t > 0.0)
            .collect();

        if times.is_empty() {
            return Ok(0.0);
        }
        Ok(times.iter().sum::<f64>() / times.len() as f64)
    }

    async fn append_job_log(&self, result: &ExecutionResult, ai_reason: Option<&str>) {
        let Some(dir) = &self.log_dir else { return };
        let path = dir.join(format!("{}.log", result.job_name));

        let banner = "=".repeat(80);
        let mut block = format!(
            "\n{banner}\nExecution at {}\nStatus: {}\nExit Code: {}\nDuration: {:.2}s\n",
            format_epoch(result.start_time),
            if result.success { "SUCCESS" } else { "FAILED" },
            result.exit_code,
            result.execution_time,
        );
        if let Some(reason) = ai_reason {
            block.push_str(&format!("AI Decision: {reason}\n"));
        }
        block.push_str(&format!("\nSTDOUT:\n{}\n", result.stdout));
        if !result.stderr.is_empty() {
            block.push_str(&format!("\nSTDERR:\n{}\n", result.stderr));
        }
        block.push_str(&format!("{banner}\n"));

        if let Err(e) = append_to_file(&path, &block).await {
            warn!(file = %path.display(), error = %e, "failed to append job log");
        }
    }
}

#[async_trait]
impl EventSink for SqliteSink {
    async fn log_execution(
        &self,
        result: &ExecutionResult,
        metrics: &Metrics,
        ai_decision_reason: Option<&str>,
    ) -> anyhow::Result<()> {
        let system_state = serde_json::to_string(metrics)?;

        sqlx::query(
            r#"
            INSERT INTO job_executions
            (job_name, start_time, end_time, exit_code, stdout, stderr,
             execution_time_sec, system_state, ai_decision_reason, success, timestamp)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
        )
        .bind(&result.job_name)
        .bind(result.start_time)
        .bind(result.end_time)
        .bind(result.exit_code)
        .bind(&result.stdout)
        .bind(&result.stderr)
        .bind(result.execution_time)
        .bind(system_state)
        .bind(ai_decision_reason)
        .bind(result.success)
        .bind(Local::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        self.append_job_log(result, ai_decision_reason).await;

        Ok(())
    }

    async fn log_metrics(&self, metrics: &Metrics) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO system_snapshots
            (timestamp, cpu_load, memory_percent, battery_percent,
             is_charging, idle_time_sec, metrics_json)
            VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
        )
        .bind(metrics.timestamp)
        .bind(metrics.cpu.cpu_percent)
        .bind(metrics.memory.percent)
        .bind(metrics.battery.as_ref().map(|b| b.percent))
        .bind(metrics.battery.as_ref().map(|b| b.is_charging))
        .bind(metrics.idle_time_sec.map(|v| v as i64))
        .bind(serde_json::to_string(metrics)?)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

async fn append_to_file(path: &Path, contents: &str) -> std::io::Result<()> {
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(contents.as_bytes()).await
}

fn format_epoch(epoch: f64) -> String {
    Local
        .timestamp_opt(epoch as i64, 0)
        .single()
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%S").to_string())
        .unwrap_or_else(|| epoch.to_string())
}
