//! Error taxonomy for the prediction pipeline
//!
//! Validation failures (bad request shape, unparseable timestamps) are
//! caller-correctable; everything else is a server-side defect.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PredictionError {
    #[error("feature '{feature}' has length {actual}, expected {expected}")]
    ShapeMismatch {
        feature: String,
        expected: usize,
        actual: usize,
    },

    #[error("invalid timestamp '{value}': {reason}")]
    InvalidTimestamp { value: String, reason: String },

    #[error("feature '{0}' required by the model is missing from the derived set")]
    MissingFeature(String),

    #[error("failed to load model artifact: {0}")]
    ModelLoad(String),

    #[error("inference failed: {0}")]
    Inference(String),
}

impl PredictionError {
    /// True for errors the caller can correct by fixing the request.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            PredictionError::ShapeMismatch { .. } | PredictionError::InvalidTimestamp { .. }
        )
    }
}
