//! Fixed feature layout consumed by predictors. The element order is part
//! of the external model contract and must not change.

use telemetry::types::Metrics;

pub const FEATURE_COUNT: usize = 8;

/// `[avg_cpu_load_5m, cpu_percent, ram_percent_used, battery_level,
/// is_charging, idle_time_sec, last_job_success, time_of_day]`
///
/// Absent signals substitute fixed values: no battery reads as 100% on
/// mains, unknown idle time as 0, unknown last-run outcome as success.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector([f64; FEATURE_COUNT]);

impl FeatureVector {
    pub fn build(metrics: &Metrics, last_job_success: Option<bool>, hour_of_day: u32) -> Self {
        let (battery_level, is_charging) = match &metrics.battery {
            Some(b) => (b.percent, f64::from(u8::from(b.is_charging))),
            None => (100.0, 1.0),
        };

        Self([
            metrics.cpu.load_5m,
            metrics.cpu.cpu_percent,
            metrics.memory.percent,
            battery_level,
            is_charging,
            metrics.idle_time_sec.unwrap_or(0) as f64,
            f64::from(u8::from(last_job_success.unwrap_or(true))),
            f64::from(hour_of_day),
        ])
    }

    pub fn as_array(&self) -> &[f64; FEATURE_COUNT] {
        &self.0
    }

    pub fn cpu_percent(&self) -> f64 {
        self.0[1]
    }

    pub fn ram_percent(&self) -> f64 {
        self.0[2]
    }

    pub fn battery_level(&self) -> f64 {
        self.0[3]
    }

    pub fn is_charging(&self) -> bool {
        self.0[4] != 0.0
    }

    pub fn idle_time_sec(&self) -> f64 {
        self.0[5]
    }

    pub fn last_job_success(&self) -> bool {
        self.0[6] != 0.0
    }
}
