//! Library for energy-consumption forecast serving
//!
//! This crate provides the core functionality for:
//! - Feature engineering from prediction requests
//! - ONNX-based ensemble scoring
//! - Confidence interval derivation
//! - Health checks and observability

pub mod config;
pub mod error;
pub mod health;
pub mod models;
pub mod observability;
pub mod predictor;

pub use config::{ConfidenceConfig, FeatureStats, ModelConfig, PipelineConfig, ServiceConfig};
pub use error::PredictionError;
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::{ContextValue, FeatureMatrix, PredictionRequest, PredictionResponse};
pub use observability::{ServiceMetrics, StructuredLogger};
pub use predictor::{
    ConfidenceEstimator, EnsemblePredictions, FeaturePipeline, OnnxScorer, PredictionService,
    Scorer,
};
