//! Static service configuration
//!
//! Loaded once at startup from a config file with `FORECAST__*` environment
//! overrides, validated, and shared read-only for the life of the process.
//! Nothing on the request path mutates it.

use anyhow::{bail, Result};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

/// Top-level configuration for the prediction service.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub model: ModelConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub confidence: ConfidenceConfig,
}

/// Model identity and artifact location.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    pub name: String,
    pub version: String,
    /// Directory holding one ONNX file per ensemble member.
    pub artifact_dir: PathBuf,
}

/// Feature-engineering configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Ordered columns of the matrix handed to the model.
    #[serde(default = "default_feature_columns")]
    pub feature_columns: Vec<String>,

    #[serde(default = "default_normalize")]
    pub normalize: bool,

    /// Per-feature statistics frozen at training time. Columns without an
    /// entry fall back to batch statistics.
    #[serde(default)]
    pub normalization: HashMap<String, FeatureStats>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            feature_columns: default_feature_columns(),
            normalize: default_normalize(),
            normalization: HashMap::new(),
        }
    }
}

/// Normalization statistics for a single feature column.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct FeatureStats {
    pub mean: f64,
    pub std: f64,
}

/// Confidence interval configuration.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ConfidenceConfig {
    /// Two-sided interval multiplier (1.96 for a ~95% interval).
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
}

impl Default for ConfidenceConfig {
    fn default() -> Self {
        Self {
            multiplier: default_multiplier(),
        }
    }
}

fn default_feature_columns() -> Vec<String> {
    [
        "hour_sin",
        "hour_cos",
        "day_sin",
        "day_cos",
        "month_sin",
        "month_cos",
        "is_weekend",
    ]
    .iter()
    .map(|name| name.to_string())
    .collect()
}

fn default_normalize() -> bool {
    true
}

fn default_multiplier() -> f64 {
    1.96
}

impl ServiceConfig {
    /// Load configuration from a file plus environment overrides.
    pub fn load(path: &str) -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("FORECAST").separator("__"))
            .build()?;

        let service: ServiceConfig = config.try_deserialize()?;
        service.validate()?;
        Ok(service)
    }

    /// Validate the schema once at load time, not per request.
    pub fn validate(&self) -> Result<()> {
        if self.model.name.is_empty() || self.model.version.is_empty() {
            bail!("model name and version must be set");
        }

        if self.pipeline.feature_columns.is_empty() {
            bail!("feature_columns must list at least one column");
        }
        let mut seen = HashSet::new();
        for column in &self.pipeline.feature_columns {
            if !seen.insert(column.as_str()) {
                bail!("duplicate feature column '{column}'");
            }
        }

        for (name, stats) in &self.pipeline.normalization {
            if !stats.mean.is_finite() {
                bail!("normalization mean for '{name}' must be finite");
            }
            if !stats.std.is_finite() || stats.std < 0.0 {
                bail!("normalization std for '{name}' must be finite and non-negative");
            }
        }

        if !self.confidence.multiplier.is_finite() || self.confidence.multiplier <= 0.0 {
            bail!("confidence multiplier must be a positive finite number");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn valid_config() -> ServiceConfig {
        ServiceConfig {
            model: ModelConfig {
                name: "energy-gbdt".to_string(),
                version: "0.3.1".to_string(),
                artifact_dir: PathBuf::from("models/energy-gbdt"),
            },
            pipeline: PipelineConfig::default(),
            confidence: ConfidenceConfig::default(),
        }
    }

    #[test]
    fn test_defaults() {
        let pipeline = PipelineConfig::default();
        assert!(pipeline.normalize);
        assert_eq!(pipeline.feature_columns.len(), 7);
        assert_eq!(pipeline.feature_columns[0], "hour_sin");
        assert_eq!(pipeline.feature_columns[6], "is_weekend");

        let confidence = ConfidenceConfig::default();
        assert!((confidence.multiplier - 1.96).abs() < f64::EPSILON);
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_empty_feature_columns_rejected() {
        let mut config = valid_config();
        config.pipeline.feature_columns.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_duplicate_feature_columns_rejected() {
        let mut config = valid_config();
        config
            .pipeline
            .feature_columns
            .push("hour_sin".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_negative_std_rejected() {
        let mut config = valid_config();
        config.pipeline.normalization.insert(
            "temperature".to_string(),
            FeatureStats {
                mean: 20.0,
                std: -1.0,
            },
        );
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_non_positive_multiplier_rejected() {
        let mut config = valid_config();
        config.confidence.multiplier = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("forecast.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"
[model]
name = "energy-gbdt"
version = "0.3.1"
artifact_dir = "models/energy-gbdt"

[pipeline]
normalize = false
feature_columns = ["hour_sin", "hour_cos", "temperature"]

[pipeline.normalization.temperature]
mean = 18.4
std = 6.2

[confidence]
multiplier = 2.576
"#
        )
        .unwrap();

        let config = ServiceConfig::load(path.to_str().unwrap()).unwrap();
        assert_eq!(config.model.version, "0.3.1");
        assert!(!config.pipeline.normalize);
        assert_eq!(config.pipeline.feature_columns.len(), 3);
        let stats = config.pipeline.normalization["temperature"];
        assert!((stats.mean - 18.4).abs() < f64::EPSILON);
        assert!((config.confidence.multiplier - 2.576).abs() < f64::EPSILON);
    }
}
