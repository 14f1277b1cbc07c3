//! Evaluates a host snapshot against one job's resource preconditions.
//
//  This module is deliberately pure: no async, no IO.

use jobs::model::Constraints;
use telemetry::types::Metrics;

/// Outcome of a constraint check, with one human-readable string per
/// violated constraint (observed value vs limit).
#[derive(Debug, Clone)]
pub struct ConstraintReport {
    pub ok: bool,
    pub failures: Vec<String>,
}

/// Check every present constraint against the snapshot.
///
/// An unknown metric fails its constraint conservatively, with one
/// exception: a host without a battery passes any battery floor, and a
/// charging battery passes regardless of level.
pub fn check(metrics: &Metrics, constraints: &Constraints) -> ConstraintReport {
    let mut failures = Vec::new();

    if let Some(limit) = constraints.max_cpu_percent {
        let cpu = metrics.cpu.cpu_percent;
        if cpu > limit {
            failures.push(format!("CPU {cpu:.1}% > {limit}%"));
        }
    }

    if let Some(limit) = constraints.max_memory_percent {
        let ram = metrics.memory.percent;
        if ram > limit {
            failures.push(format!("RAM {ram:.1}% > {limit}%"));
        }
    }

    if let Some(limit) = constraints.min_battery_percent {
        if let Some(battery) = &metrics.battery {
            if !battery.is_charging && battery.percent < limit {
                failures.push(format!("Battery {:.1}% < {limit}%", battery.percent));
            }
        }
    }

    if let Some(limit) = constraints.min_disk_free_gb {
        let free = metrics.disk.free_gb;
        if free < limit {
            failures.push(format!("Disk free {free:.1}GB < {limit}GB"));
        }
    }

    if let Some(limit) = constraints.min_idle_time_sec {
        match metrics.idle_time_sec {
            Some(idle) if idle >= limit => {}
            Some(idle) => failures.push(format!("Idle {idle}s < {limit}s")),
            None => failures.push(format!("Idle time unknown (need {limit}s)")),
        }
    }

    ConstraintReport {
        ok: failures.is_empty(),
        failures,
    }
}
