//! Prediction pipeline

mod confidence;
mod features;
mod inference;
mod service;

pub use confidence::ConfidenceEstimator;
pub use features::FeaturePipeline;
pub use inference::{EnsemblePredictions, OnnxScorer};
pub use service::PredictionService;

use crate::error::PredictionError;
use crate::models::FeatureMatrix;

/// Capability interface for a trained scorer.
///
/// `predict_ensemble` exposes per-member predictions when the underlying
/// model has sub-estimators; a single-estimator model reports one member and
/// a zero ensemble spread.
pub trait Scorer: Send + Sync {
    /// Point predictions, one per matrix row.
    fn predict(&self, features: &FeatureMatrix) -> Result<Vec<f64>, PredictionError>;

    /// Per-member predictions plus the derived point predictions.
    fn predict_ensemble(
        &self,
        features: &FeatureMatrix,
    ) -> Result<EnsemblePredictions, PredictionError>;

    /// Number of ensemble members (1 for a single estimator).
    fn num_members(&self) -> usize;
}
