//! Job data model.
//!
//! `JobSpec` is the immutable record read from a config file; `JobState`
//! is the runtime bookkeeping owned by the scheduler loop. They are paired
//! in `Job`, keyed by the unique `job_name`.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

fn default_true() -> bool {
    true
}

fn default_max_retries() -> u32 {
    3
}

/// One job as configured on disk.
///
/// Unknown keys are rejected at deserialization time so a typoed
/// constraint cannot silently disable itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobSpec {
    pub job_name: String,
    /// Shell-evaluated command line; pipes and expansions are allowed.
    pub command: String,

    #[serde(default = "default_true")]
    pub enabled: bool,

    /// "HH:MM" hints; within one hour of any entry counts as near enough.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub preferred_time: Vec<String>,

    // Resource constraints; absent means unconstrained.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_cpu_percent: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_memory_percent: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_battery_percent: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_disk_free_gb: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_idle_time_sec: Option<u64>,

    #[serde(default)]
    pub ai_aware: bool,

    #[serde(default)]
    pub retry_on_fail: bool,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Unset means the command may run indefinitely.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_sec: Option<u64>,

    /// Daily window bounds, "HH:MM"; a start later than the end wraps
    /// past midnight.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule_window_start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule_window_end: Option<String>,
}

impl JobSpec {
    pub fn constraints(&self) -> Constraints {
        Constraints {
            max_cpu_percent: self.max_cpu_percent,
            max_memory_percent: self.max_memory_percent,
            min_battery_percent: self.min_battery_percent,
            min_disk_free_gb: self.min_disk_free_gb,
            min_idle_time_sec: self.min_idle_time_sec,
        }
    }

    /// Whether `now` falls inside the daily schedule window, bounds
    /// inclusive. Jobs without both bounds, or with malformed bounds, are
    /// never locked out.
    pub fn in_schedule_window(&self, now: NaiveTime) -> bool {
        let (Some(start), Some(end)) = (&self.schedule_window_start, &self.schedule_window_end)
        else {
            return true;
        };

        let (Ok(start), Ok(end)) = (parse_hhmm(start), parse_hhmm(end)) else {
            return true;
        };

        if start <= end {
            start <= now && now <= end
        } else {
            // Window wraps midnight, e.g. 22:00 -> 06:00.
            now >= start || now <= end
        }
    }

    /// Within one hour of any listed preferred hour; minutes are ignored.
    /// No hints means any hour is fine. Malformed entries never match.
    pub fn near_preferred_hour(&self, current_hour: u32) -> bool {
        if self.preferred_time.is_empty() {
            return true;
        }

        self.preferred_time.iter().any(|t| {
            t.split(':')
                .next()
                .and_then(|h| h.parse::<i64>().ok())
                .is_some_and(|pref| (i64::from(current_hour) - pref).abs() <= 1)
        })
    }
}

fn parse_hhmm(s: &str) -> chrono::ParseResult<NaiveTime> {
    NaiveTime::parse_from_str(s, "%H:%M")
}

/// The optional resource preconditions extracted from a spec.
#[derive(Debug, Clone, Default)]
pub struct Constraints {
    pub max_cpu_percent: Option<f64>,
    pub max_memory_percent: Option<f64>,
    pub min_battery_percent: Option<f64>,
    pub min_disk_free_gb: Option<f64>,
    pub min_idle_time_sec: Option<u64>,
}

impl Constraints {
    pub fn is_empty(&self) -> bool {
        self.max_cpu_percent.is_none()
            && self.max_memory_percent.is_none()
            && self.min_battery_percent.is_none()
            && self.min_disk_free_gb.is_none()
            && self.min_idle_time_sec.is_none()
    }
}

/// Runtime bookkeeping for one job; survives config reloads, lost on
/// restart.
#[derive(Debug, Clone, Default)]
pub struct JobState {
    pub retry_count: u32,
    /// Epoch seconds of the last completed run.
    pub last_run_time: Option<f64>,
    pub last_run_success: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct Job {
    pub spec: JobSpec,
    pub state: JobState,
}

impl Job {
    pub fn new(spec: JobSpec) -> Self {
        Self {
            spec,
            state: JobState::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.spec.job_name
    }
}
