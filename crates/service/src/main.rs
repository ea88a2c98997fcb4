//! Forecast service - energy-consumption prediction server
//!
//! Loads the service configuration and the trained model artifact once at
//! startup, then serves batch predictions over HTTP.

use anyhow::Result;
use forecast_lib::{
    health::{components, HealthRegistry},
    observability::{ServiceMetrics, StructuredLogger},
    OnnxScorer, PredictionService, Scorer, ServiceConfig,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod api;
mod config;
mod error;

const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting forecast-service");

    // Load configuration
    let server_config = config::ServerConfig::load()?;
    let service_config = Arc::new(ServiceConfig::load(&server_config.config_path)?);
    info!(
        model = %service_config.model.name,
        model_version = %service_config.model.version,
        "Service configured"
    );

    // Initialize health registry
    let health_registry = HealthRegistry::new(SERVICE_VERSION);
    health_registry.register(components::MODEL).await;
    health_registry.register(components::API).await;

    // Initialize metrics
    let metrics = ServiceMetrics::new();
    metrics.set_model_version(&service_config.model.version, &service_config.model.name);

    // Initialize structured logger
    let logger = StructuredLogger::new("forecast-service");

    // Load the model artifact; failure here is fatal, the process must not
    // serve without a working scorer
    let num_features = service_config.pipeline.feature_columns.len();
    let scorer: Arc<dyn Scorer> = Arc::new(OnnxScorer::load(&service_config.model, num_features)?);
    logger.log_model_loaded(&service_config.model.version, scorer.num_members());

    // Create shared application state
    let service = PredictionService::new(service_config.clone(), scorer);
    let state = Arc::new(api::AppState::new(
        service,
        health_registry.clone(),
        metrics.clone(),
        logger.clone(),
    ));

    logger.log_startup(SERVICE_VERSION, &service_config.model.version);

    // Mark service as ready after initialization
    health_registry.set_ready(true).await;

    // Start the HTTP server
    let _api = tokio::spawn(api::serve(server_config.listen_port, state));

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    logger.log_shutdown("SIGINT received");
    info!("Shutting down");

    Ok(())
}
