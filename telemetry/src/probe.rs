//! Host telemetry probe.
//!
//! Produces one `Metrics` snapshot per call:
//!   • load average + CPU busy share via `sysinfo`, `/proc/stat` as backup
//!   • memory via `sysinfo`, `/proc/meminfo` as backup
//!   • battery via `/sys/class/power_supply`
//!   • disk usage of `/`
//!   • user idle time via `xprintidle`, then logged-in-session heuristics
//!
//! A signal that cannot be read degrades to its documented default; the
//! snapshot as a whole never fails.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use sysinfo::{Disks, System};
use tokio::process::Command;
use tokio::time::timeout;
use tracing::warn;

use crate::fallback;
use crate::types::{CpuMetrics, DiskMetrics, MemoryMetrics, Metrics};

const MIB: f64 = 1024.0 * 1024.0;
const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Helper binaries get a short leash so a hung X server cannot stall the
/// scheduler tick.
const HELPER_TIMEOUT: Duration = Duration::from_secs(2);

/// Capability seam for host sampling; the scheduler calls this once per
/// tick and tests substitute a fixed snapshot.
#[async_trait]
pub trait Probe: Send {
    async fn sample(&mut self) -> Metrics;
}

pub struct SystemProbe {
    sys: System,
}

impl SystemProbe {
    pub fn new() -> Self {
        let mut sys = System::new();
        // Prime the CPU counters so the first sample already has a window
        // to measure against.
        sys.refresh_cpu_usage();
        std::thread::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);
        sys.refresh_cpu_usage();

        Self { sys }
    }

    fn cpu(&mut self) -> CpuMetrics {
        let load = System::load_average();

        self.sys.refresh_cpu_usage();
        let mut cpu_percent = f64::from(self.sys.global_cpu_info().cpu_usage());
        if !cpu_percent.is_finite() {
            cpu_percent = fallback::proc_stat_cpu_percent().unwrap_or_else(|| {
                warn!("cpu usage unavailable from every source, reporting 0");
                0.0
            });
        }

        CpuMetrics {
            load_1m: load.one,
            load_5m: load.five,
            load_15m: load.fifteen,
            cpu_percent,
        }
    }

    fn memory(&mut self) -> MemoryMetrics {
        self.sys.refresh_memory();

        let total = self.sys.total_memory();
        if total == 0 {
            return fallback::meminfo_memory().unwrap_or_else(|| {
                warn!("memory metrics unavailable, reporting zeros");
                MemoryMetrics::default()
            });
        }

        let used = self.sys.used_memory();
        MemoryMetrics {
            total_mb: total as f64 / MIB,
            used_mb: used as f64 / MIB,
            available_mb: self.sys.available_memory() as f64 / MIB,
            percent: 100.0 * used as f64 / total as f64,
        }
    }

    fn disk(&self) -> DiskMetrics {
        let disks = Disks::new_with_refreshed_list();
        let Some(root) = disks.list().iter().find(|d| d.mount_point() == Path::new("/")) else {
            warn!("no disk mounted at /, reporting zero disk metrics");
            return DiskMetrics::default();
        };

        let total = root.total_space();
        let free = root.available_space();
        let used = total.saturating_sub(free);

        DiskMetrics {
            total_gb: total as f64 / GIB,
            used_gb: used as f64 / GIB,
            free_gb: free as f64 / GIB,
            percent: if total > 0 {
                100.0 * used as f64 / total as f64
            } else {
                0.0
            },
        }
    }
}

impl Default for SystemProbe {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Probe for SystemProbe {
    async fn sample(&mut self) -> Metrics {
        Metrics {
            timestamp: Utc::now().timestamp_millis() as f64 / 1000.0,
            cpu: self.cpu(),
            memory: self.memory(),
            battery: fallback::read_battery(),
            disk: self.disk(),
            idle_time_sec: user_idle_time().await,
        }
    }
}

async fn user_idle_time() -> Option<u64> {
    if let Some(idle) = xprintidle().await {
        return Some(idle);
    }
    active_session_fallback().await
}

/// The X helper reports idle milliseconds on stdout.
async fn xprintidle() -> Option<u64> {
    let out = timeout(HELPER_TIMEOUT, Command::new("xprintidle").output())
        .await
        .ok()?
        .ok()?;
    if !out.status.success() {
        return None;
    }

    let ms: u64 = String::from_utf8_lossy(&out.stdout).trim().parse().ok()?;
    Some(ms / 1000)
}

/// Without an X session, consult logged-in sessions: any session means the
/// user may be active right now; none means the host has been idle since
/// boot, so report uptime.
async fn active_session_fallback() -> Option<u64> {
    let out = timeout(HELPER_TIMEOUT, Command::new("who").arg("-s").output())
        .await
        .ok()?
        .ok()?;
    if !out.status.success() {
        return None;
    }

    if out.stdout.iter().any(|b| !b.is_ascii_whitespace()) {
        Some(0)
    } else {
        Some(System::uptime())
    }
}
