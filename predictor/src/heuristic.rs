//! Hand-tuned fallback scorer used when no trained classifier is wired
//! in. Starts from certainty and subtracts for each unfavorable signal.

use crate::features::FeatureVector;
use crate::{PredictError, Prediction, Predictor};

pub struct HeuristicPredictor;

impl HeuristicPredictor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for HeuristicPredictor {
    fn default() -> Self {
        Self::new()
    }
}

impl Predictor for HeuristicPredictor {
    fn predict(&self, features: &FeatureVector) -> Result<Prediction, PredictError> {
        let mut score: f64 = 1.0;
        let mut reasons: Vec<&str> = Vec::new();

        let cpu = features.cpu_percent();
        if cpu > 80.0 {
            score -= 0.3;
            reasons.push("high CPU load");
        } else if cpu > 60.0 {
            score -= 0.1;
            reasons.push("moderate CPU load");
        }

        let ram = features.ram_percent();
        if ram > 90.0 {
            score -= 0.2;
            reasons.push("high RAM usage");
        } else if ram > 80.0 {
            score -= 0.1;
            reasons.push("moderate RAM usage");
        }

        if !features.is_charging() {
            if features.battery_level() < 30.0 {
                score -= 0.4;
                reasons.push("low battery");
            } else if features.battery_level() < 50.0 {
                score -= 0.1;
                reasons.push("moderate battery");
            }
        }

        if features.idle_time_sec() > 300.0 {
            score += 0.1;
            reasons.push("user idle");
        }

        if !features.last_job_success() {
            score -= 0.2;
            reasons.push("previous run failed");
        }

        let probability = score.clamp(0.0, 1.0);
        let detail = if reasons.is_empty() {
            "conditions are good".to_string()
        } else {
            reasons.join(", ")
        };

        Ok(Prediction {
            probability,
            reason: format!(
                "heuristic predicts {:.2}% success probability: {detail}",
                probability * 100.0
            ),
        })
    }
}
