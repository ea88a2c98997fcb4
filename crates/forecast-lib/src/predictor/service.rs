//! Request orchestration
//!
//! Validates the request shape, runs the feature pipeline, scores the
//! ensemble, derives intervals, and assembles the response. Either the full
//! response is produced or the call fails with a single typed error; a shape
//! violation never reaches the scorer.

use super::{ConfidenceEstimator, FeaturePipeline, Scorer};
use crate::config::ServiceConfig;
use crate::error::PredictionError;
use crate::models::{PredictionRequest, PredictionResponse};
use std::sync::Arc;
use tracing::debug;

#[derive(Clone)]
pub struct PredictionService {
    config: Arc<ServiceConfig>,
    pipeline: FeaturePipeline,
    confidence: ConfidenceEstimator,
    scorer: Arc<dyn Scorer>,
}

impl PredictionService {
    pub fn new(config: Arc<ServiceConfig>, scorer: Arc<dyn Scorer>) -> Self {
        let pipeline = FeaturePipeline::new(config.pipeline.clone());
        let confidence = ConfidenceEstimator::new(config.confidence.multiplier);
        Self {
            config,
            pipeline,
            confidence,
            scorer,
        }
    }

    pub fn handle(
        &self,
        request: &PredictionRequest,
    ) -> Result<PredictionResponse, PredictionError> {
        request.validate()?;

        let matrix = self.pipeline.transform(request)?;
        let ensemble = self.scorer.predict_ensemble(&matrix)?;
        let spread = ensemble.spread();
        let intervals = self.confidence.bounds(ensemble.point(), &spread);

        debug!(
            rows = matrix.rows(),
            members = ensemble.num_members(),
            "Prediction batch scored"
        );

        Ok(PredictionResponse {
            predictions: ensemble.into_point(),
            confidence_intervals: intervals,
            model_version: self.config.model.version.clone(),
        })
    }
}
