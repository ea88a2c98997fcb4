//! Server configuration

use anyhow::Result;
use serde::Deserialize;

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// HTTP listen port for predictions, health and metrics
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,

    /// Path of the service configuration file (without extension)
    #[serde(default = "default_config_path")]
    pub config_path: String,
}

fn default_listen_port() -> u16 {
    8080
}

fn default_config_path() -> String {
    "config/forecast".to_string()
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("FORECAST"))
            .build()?;

        Ok(config.try_deserialize().unwrap_or_else(|_| ServerConfig {
            listen_port: default_listen_port(),
            config_path: default_config_path(),
        }))
    }
}
