//! Deferred-job bookkeeping: job name -> earliest next attempt.
//!
//! Process-memory only. A restart loses the map and every job is simply
//! re-evaluated from fresh metrics on the next tick.

use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct DeferralStore {
    inner: HashMap<String, f64>,
}

impl DeferralStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a deadline for a job. The most patient deadline wins: a
    /// later one replaces the entry, an earlier one is ignored, so a job
    /// cannot flap back in early.
    pub fn add(&mut self, job_name: &str, deadline: f64) {
        let entry = self.inner.entry(job_name.to_string()).or_insert(deadline);
        if deadline > *entry {
            *entry = deadline;
        }
    }

    /// Remove and return every job whose deadline has passed.
    pub fn release_due(&mut self, now: f64) -> Vec<String> {
        let mut due: Vec<String> = self
            .inner
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(name, _)| name.clone())
            .collect();
        due.sort();

        for name in &due {
            self.inner.remove(name);
        }

        due
    }

    /// Drop a job's deferral regardless of its deadline.
    pub fn clear(&mut self, job_name: &str) {
        self.inner.remove(job_name);
    }

    pub fn contains(&self, job_name: &str) -> bool {
        self.inner.contains_key(job_name)
    }

    pub fn deadline(&self, job_name: &str) -> Option<f64> {
        self.inner.get(job_name).copied()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
