//! Typed host-state snapshot shared by the decision engine, the event
//! sink, and the predictor feature builder.

use serde::{Deserialize, Serialize};

/// One atomically-captured view of the host, taken once per scheduler tick.
///
/// `battery` is `None` on hosts without a battery; `idle_time_sec` is
/// `None` when no idle source could be read.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Metrics {
    /// Epoch seconds at capture time.
    pub timestamp: f64,
    pub cpu: CpuMetrics,
    pub memory: MemoryMetrics,
    pub battery: Option<BatteryMetrics>,
    pub disk: DiskMetrics,
    pub idle_time_sec: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CpuMetrics {
    pub load_1m: f64,
    pub load_5m: f64,
    pub load_15m: f64,
    /// Busy share over the sampling window, 0–100.
    pub cpu_percent: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryMetrics {
    pub total_mb: f64,
    pub used_mb: f64,
    pub available_mb: f64,
    pub percent: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatteryMetrics {
    pub percent: f64,
    /// True when on mains power ("Charging" or "Full").
    pub is_charging: bool,
    /// Estimated seconds of charge remaining, when the source reports one.
    pub seconds_left: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiskMetrics {
    pub total_gb: f64,
    pub used_gb: f64,
    pub free_gb: f64,
    pub percent: f64,
}
