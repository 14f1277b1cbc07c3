//! `/proc` and `/sys` readers used where the rich metrics library has no
//! signal (battery) or comes up empty (containers, exotic kernels).
//
//  Parsing is split from file access so the formats are testable.

use std::path::Path;

use crate::types::{BatteryMetrics, MemoryMetrics};

pub(crate) fn proc_stat_cpu_percent() -> Option<f64> {
    let stat = std::fs::read_to_string("/proc/stat").ok()?;
    parse_proc_stat(&stat)
}

/// Busy share from the aggregate `cpu` line: `100 * (1 - idle/total)`.
pub fn parse_proc_stat(stat: &str) -> Option<f64> {
    let line = stat.lines().next()?;
    let mut fields = line.split_whitespace();
    if fields.next()? != "cpu" {
        return None;
    }

    let values: Vec<u64> = fields.filter_map(|f| f.parse().ok()).collect();
    if values.len() < 4 {
        return None;
    }

    let total: u64 = values.iter().sum();
    if total == 0 {
        return None;
    }
    let idle = values[3];

    Some(100.0 * (1.0 - idle as f64 / total as f64))
}

pub(crate) fn meminfo_memory() -> Option<MemoryMetrics> {
    let raw = std::fs::read_to_string("/proc/meminfo").ok()?;
    parse_meminfo(&raw)
}

/// `used = MemTotal - MemAvailable`; kernels without MemAvailable fall
/// back to MemFree. Values in /proc/meminfo are kB.
pub fn parse_meminfo(raw: &str) -> Option<MemoryMetrics> {
    let mut total_kb = None;
    let mut available_kb = None;
    let mut free_kb = None;

    for line in raw.lines() {
        let mut parts = line.split_whitespace();
        let (Some(key), Some(value)) = (parts.next(), parts.next()) else {
            continue;
        };
        let Ok(v) = value.parse::<u64>() else { continue };

        match key {
            "MemTotal:" => total_kb = Some(v),
            "MemAvailable:" => available_kb = Some(v),
            "MemFree:" => free_kb = Some(v),
            _ => {}
        }
    }

    let total_kb = total_kb?;
    let available_kb = available_kb.or(free_kb).unwrap_or(0);
    let used_kb = total_kb.saturating_sub(available_kb);

    Some(MemoryMetrics {
        total_mb: total_kb as f64 / 1024.0,
        available_mb: available_kb as f64 / 1024.0,
        used_mb: used_kb as f64 / 1024.0,
        percent: if total_kb > 0 {
            100.0 * used_kb as f64 / total_kb as f64
        } else {
            0.0
        },
    })
}

/// Scan BAT0 then BAT1; a host with neither has no battery.
pub(crate) fn read_battery() -> Option<BatteryMetrics> {
    for slot in ["BAT0", "BAT1"] {
        let base = Path::new("/sys/class/power_supply").join(slot);
        let capacity = std::fs::read_to_string(base.join("capacity"));
        let status = std::fs::read_to_string(base.join("status"));

        if let (Ok(capacity), Ok(status)) = (capacity, status) {
            if let Some(battery) = parse_battery(&capacity, &status) {
                return Some(battery);
            }
        }
    }

    None
}

/// "Charging" and "Full" both mean the host is on mains power. The sysfs
/// source has no time-remaining estimate.
pub fn parse_battery(capacity: &str, status: &str) -> Option<BatteryMetrics> {
    let percent: f64 = capacity.trim().parse().ok()?;

    Some(BatteryMetrics {
        percent,
        is_charging: matches!(status.trim(), "Charging" | "Full"),
        seconds_left: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn proc_stat_busy_share() {
        // total = 100, idle = 60 -> 40% busy
        let stat = "cpu  10 5 25 60\ncpu0 10 5 25 60\n";
        let pct = parse_proc_stat(stat).unwrap();
        assert!((pct - 40.0).abs() < 1e-9);
    }

    #[test]
    fn proc_stat_rejects_garbage() {
        assert_eq!(parse_proc_stat("intr 12345"), None);
        assert_eq!(parse_proc_stat(""), None);
        assert_eq!(parse_proc_stat("cpu  0 0 0 0"), None);
    }

    #[test]
    fn meminfo_prefers_mem_available() {
        let raw = "MemTotal:       8000000 kB\n\
                   MemFree:         500000 kB\n\
                   MemAvailable:   2000000 kB\n\
                   Buffers:         100000 kB\n";
        let mem = parse_meminfo(raw).unwrap();
        assert!((mem.total_mb - 8000000.0 / 1024.0).abs() < 1e-6);
        assert!((mem.used_mb - 6000000.0 / 1024.0).abs() < 1e-6);
        assert!((mem.percent - 75.0).abs() < 1e-6);
    }

    #[test]
    fn meminfo_falls_back_to_mem_free() {
        let raw = "MemTotal:       1000 kB\nMemFree:         250 kB\n";
        let mem = parse_meminfo(raw).unwrap();
        assert!((mem.available_mb - 250.0 / 1024.0).abs() < 1e-9);
        assert!((mem.percent - 75.0).abs() < 1e-6);
    }

    #[test]
    fn meminfo_without_total_is_unusable() {
        assert!(parse_meminfo("MemFree: 250 kB\n").is_none());
    }

    #[test]
    fn battery_charging_states() {
        let b = parse_battery("85\n", "Charging\n").unwrap();
        assert!((b.percent - 85.0).abs() < 1e-9);
        assert!(b.is_charging);

        let b = parse_battery("100", "Full").unwrap();
        assert!(b.is_charging);

        let b = parse_battery("42", "Discharging").unwrap();
        assert!(!b.is_charging);
        assert_eq!(b.seconds_left, None);
    }

    #[test]
    fn battery_bad_capacity() {
        assert!(parse_battery("n/a", "Charging").is_none());
    }
}
