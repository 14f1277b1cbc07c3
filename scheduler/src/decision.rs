//! The decision engine.
//!
//! For each (job, tick) it produces one `Decision`: run now, defer with a
//! deadline, or skip. Rules apply in order, first match wins:
//!
//!   1. Disabled jobs are skipped outright, no deferral.
//!   2. An operator force overrides everything.
//!   3. Outside the schedule window -> defer an hour.
//!   4. Violated resource constraints -> defer five minutes.
//!   5. AI-aware jobs with a predictor map the predicted success
//!      probability onto run / defer 10 min / defer 30 min.
//!   6. Otherwise the static path tentatively runs with score 1.0.
//!   7. Off preferred hours the static path defers 30 min; a predictor
//!      that said run stands, it already weighed time-of-day.

use std::sync::Arc;

use chrono::{DateTime, Local, Timelike};
use tracing::debug;

use jobs::model::Job;
use predictor::features::FeatureVector;
use predictor::{Predictor, ScoredPrediction, Verdict};
use telemetry::types::Metrics;

use crate::constraints;

// Re-evaluation horizons, seconds.
const DEFER_OUTSIDE_WINDOW: f64 = 3600.0;
const DEFER_CONSTRAINTS: f64 = 300.0;
const DEFER_PREDICTOR: f64 = 600.0;
const DEFER_PREDICTOR_SKIP: f64 = 1800.0;
const DEFER_OFF_PREFERRED: f64 = 1800.0;

/// Outcome for one (job, tick) pair.
#[derive(Debug, Clone)]
pub struct Decision {
    pub should_run: bool,
    /// Names the deciding factor; never empty.
    pub reason: String,
    /// Predicted success probability, or 1.0 on the static path.
    pub score: f64,
    /// Earliest epoch at which a re-evaluation may run the job.
    pub defer_until: Option<f64>,
}

/// A candidate that survived evaluation, ready for dispatch ordering.
#[derive(Debug, Clone)]
pub struct ScoredJob {
    pub job_name: String,
    pub decision: Decision,
}

pub struct DecisionEngine {
    predictor: Option<Arc<dyn Predictor>>,
}

impl DecisionEngine {
    /// A `None` predictor selects the static path for every job.
    pub fn new(predictor: Option<Arc<dyn Predictor>>) -> Self {
        Self { predictor }
    }

    pub fn decide(
        &self,
        job: &Job,
        metrics: &Metrics,
        now: DateTime<Local>,
        force: bool,
    ) -> Decision {
        let now_epoch = now.timestamp_millis() as f64 / 1000.0;

        if !job.spec.enabled {
            return Decision {
                should_run: false,
                reason: "Job is disabled".into(),
                score: 0.0,
                defer_until: None,
            };
        }

        if force {
            return Decision {
                should_run: true,
                reason: "Force run requested".into(),
                score: 1.0,
                defer_until: None,
            };
        }

        if !job.spec.in_schedule_window(now.time()) {
            return Decision {
                should_run: false,
                reason: "Outside of schedule window".into(),
                score: 0.0,
                defer_until: Some(now_epoch + DEFER_OUTSIDE_WINDOW),
            };
        }

        let report = constraints::check(metrics, &job.spec.constraints());
        if !report.ok {
            return Decision {
                should_run: false,
                reason: format!("Constraints not met: {}", report.failures.join(", ")),
                score: 0.0,
                defer_until: Some(now_epoch + DEFER_CONSTRAINTS),
            };
        }

        let predicted = self.predict(job, metrics, now.hour());
        let used_predictor = predicted.is_some();

        let mut decision = match predicted {
            Some(scored) => {
                let defer_until = match scored.verdict {
                    Verdict::RunNow => None,
                    Verdict::Defer => Some(now_epoch + DEFER_PREDICTOR),
                    Verdict::Skip => Some(now_epoch + DEFER_PREDICTOR_SKIP),
                };

                Decision {
                    should_run: scored.verdict == Verdict::RunNow,
                    reason: scored.reason,
                    score: scored.probability,
                    defer_until,
                }
            }
            None => Decision {
                should_run: true,
                reason: "Static scheduling: constraints met".into(),
                score: 1.0,
                defer_until: None,
            },
        };

        // Last-mile calendar hint. A confident predictor is not vetoed by
        // it; the static path is.
        if decision.should_run && !used_predictor && !job.spec.near_preferred_hour(now.hour()) {
            decision = Decision {
                should_run: false,
                reason: "Not at preferred time".into(),
                score: decision.score,
                defer_until: Some(now_epoch + DEFER_OFF_PREFERRED),
            };
        }

        decision
    }

    /// Evaluate every candidate once and order runnable or deferrable
    /// entries by score, best first; ties break on job name so dispatch
    /// order is deterministic. Entries with neither a run nor a deadline
    /// (disabled jobs) are dropped.
    pub fn prioritize(
        &self,
        jobs: &[&Job],
        metrics: &Metrics,
        now: DateTime<Local>,
    ) -> Vec<ScoredJob> {
        let mut scored: Vec<ScoredJob> = jobs
            .iter()
            .filter_map(|job| {
                let decision = self.decide(job, metrics, now, false);
                (decision.should_run || decision.defer_until.is_some()).then(|| ScoredJob {
                    job_name: job.spec.job_name.clone(),
                    decision,
                })
            })
            .collect();

        scored.sort_by(|a, b| {
            b.decision
                .score
                .partial_cmp(&a.decision.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.job_name.cmp(&b.job_name))
        });

        scored
    }

    /// Consult the predictor for an AI-aware job. Any predictor failure
    /// degrades to the static path, per the unkillable-loop rule.
    fn predict(&self, job: &Job, metrics: &Metrics, hour: u32) -> Option<ScoredPrediction> {
        if !job.spec.ai_aware {
            return None;
        }
        let predictor = self.predictor.as_ref()?;

        let features = FeatureVector::build(metrics, job.state.last_run_success, hour);
        match predictor.score(&features) {
            Ok(scored) => Some(scored),
            Err(e) => {
                debug!(job = %job.spec.job_name, error = %e, "predictor unavailable, falling back to static path");
                None
            }
        }
    }
}
