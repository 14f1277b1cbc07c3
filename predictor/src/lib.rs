//! Success-probability prediction for AI-aware jobs.
//!
//! The scheduler consumes predictors through the `Predictor` trait only;
//! absence of a predictor is the static scheduling path. A trained
//! classifier is an external collaborator that plugs in at this seam —
//! the crate ships the feature layout and the heuristic fallback scorer.

pub mod features;
pub mod heuristic;

use thiserror::Error;

use crate::features::FeatureVector;

#[derive(Debug, Error)]
pub enum PredictError {
    #[error("no model loaded")]
    Unavailable,

    #[error("inference failed: {0}")]
    Inference(String),
}

/// Raw predictor output: probability in [0, 1] plus a human-readable
/// reason naming what drove it.
#[derive(Debug, Clone)]
pub struct Prediction {
    pub probability: f64,
    pub reason: String,
}

/// Probability band the decision engine acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    RunNow,
    Defer,
    Skip,
}

impl Verdict {
    /// `p >= 0.8` run now, `0.5 <= p < 0.8` defer, below that skip.
    pub fn from_probability(p: f64) -> Self {
        if p >= 0.8 {
            Verdict::RunNow
        } else if p >= 0.5 {
            Verdict::Defer
        } else {
            Verdict::Skip
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScoredPrediction {
    pub probability: f64,
    pub verdict: Verdict,
    pub reason: String,
}

pub trait Predictor: Send + Sync {
    fn predict(&self, features: &FeatureVector) -> Result<Prediction, PredictError>;

    /// Probability mapped onto its run/defer/skip band.
    fn score(&self, features: &FeatureVector) -> Result<ScoredPrediction, PredictError> {
        let Prediction {
            probability,
            reason,
        } = self.predict(features)?;

        Ok(ScoredPrediction {
            probability,
            verdict: Verdict::from_probability(probability),
            reason,
        })
    }
}
