//! ONNX inference using tract
//!
//! Wraps the trained regression artifact behind the `Scorer` trait. An
//! artifact is a directory of ONNX files, one per ensemble member; a single
//! file is the degenerate single-estimator case.

use super::Scorer;
use crate::config::ModelConfig;
use crate::error::PredictionError;
use crate::models::FeatureMatrix;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tract_onnx::prelude::*;
use tracing::{debug, info, warn};

/// Maximum per-batch inference latency before warning
const MAX_INFERENCE_MS: u128 = 50;

type TractModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// Point predictions plus the per-member predictions they were derived from.
#[derive(Debug, Clone)]
pub struct EnsemblePredictions {
    point: Vec<f64>,
    members: Vec<Vec<f64>>,
}

impl EnsemblePredictions {
    /// `members` is M vectors of length N; the point prediction per row is
    /// the mean across members.
    pub fn new(members: Vec<Vec<f64>>) -> Self {
        let m = members.len();
        let n = members.first().map_or(0, Vec::len);
        let mut point = Vec::with_capacity(n);
        for row in 0..n {
            let sum: f64 = members.iter().map(|member| member[row]).sum();
            point.push(sum / m as f64);
        }
        Self { point, members }
    }

    pub fn point(&self) -> &[f64] {
        &self.point
    }

    pub fn into_point(self) -> Vec<f64> {
        self.point
    }

    pub fn num_members(&self) -> usize {
        self.members.len()
    }

    /// Per-row standard deviation across ensemble members; all zeros for a
    /// single-estimator model, which downstream treats as a zero-width
    /// interval rather than an error.
    pub fn spread(&self) -> Vec<f64> {
        let m = self.members.len();
        if m < 2 {
            return vec![0.0; self.point.len()];
        }
        self.point
            .iter()
            .enumerate()
            .map(|(row, &mean)| {
                let variance: f64 = self
                    .members
                    .iter()
                    .map(|member| (member[row] - mean).powi(2))
                    .sum::<f64>()
                    / m as f64;
                variance.sqrt()
            })
            .collect()
    }
}

/// ONNX-based scorer using tract for lightweight inference.
pub struct OnnxScorer {
    members: Vec<TractModel>,
    num_features: usize,
}

impl OnnxScorer {
    /// Load every ensemble member under the configured artifact directory.
    /// Any failure here is fatal; the process must not serve without a
    /// working scorer.
    pub fn load(config: &ModelConfig, num_features: usize) -> Result<Self, PredictionError> {
        let paths = discover_members(&config.artifact_dir)?;
        let mut members = Vec::with_capacity(paths.len());
        for path in &paths {
            members.push(load_member(path, num_features)?);
        }

        info!(
            model = %config.name,
            version = %config.version,
            members = members.len(),
            dir = %config.artifact_dir.display(),
            "Model artifact loaded"
        );

        Ok(Self {
            members,
            num_features,
        })
    }

    fn run_row(&self, plan: &TractModel, row: &[f64]) -> Result<f64, PredictionError> {
        let data: Vec<f32> = row.iter().map(|&value| value as f32).collect();
        let input: Tensor = tract_ndarray::Array2::from_shape_vec((1, self.num_features), data)
            .map_err(|err| PredictionError::Inference(err.to_string()))?
            .into();

        let result = plan
            .run(tvec!(input.into()))
            .map_err(|err| PredictionError::Inference(err.to_string()))?;
        let output = result
            .first()
            .ok_or_else(|| PredictionError::Inference("model produced no output".to_string()))?;
        let view = output
            .to_array_view::<f32>()
            .map_err(|err| PredictionError::Inference(err.to_string()))?;
        let value = view
            .iter()
            .next()
            .copied()
            .ok_or_else(|| PredictionError::Inference("empty output tensor".to_string()))?;
        Ok(f64::from(value))
    }
}

impl Scorer for OnnxScorer {
    fn predict(&self, features: &FeatureMatrix) -> Result<Vec<f64>, PredictionError> {
        self.predict_ensemble(features)
            .map(EnsemblePredictions::into_point)
    }

    fn predict_ensemble(
        &self,
        features: &FeatureMatrix,
    ) -> Result<EnsemblePredictions, PredictionError> {
        if features.width() != self.num_features {
            return Err(PredictionError::Inference(format!(
                "feature matrix has {} columns, model expects {}",
                features.width(),
                self.num_features
            )));
        }

        let start = Instant::now();
        let mut members = Vec::with_capacity(self.members.len());
        for plan in &self.members {
            let mut outputs = Vec::with_capacity(features.rows());
            for row in 0..features.rows() {
                outputs.push(self.run_row(plan, features.row(row))?);
            }
            members.push(outputs);
        }

        let elapsed = start.elapsed();
        if elapsed.as_millis() > MAX_INFERENCE_MS {
            warn!(
                elapsed_ms = elapsed.as_millis(),
                rows = features.rows(),
                "Inference exceeded {}ms target",
                MAX_INFERENCE_MS
            );
        } else {
            debug!(
                elapsed_us = elapsed.as_micros(),
                rows = features.rows(),
                "Inference completed"
            );
        }

        Ok(EnsemblePredictions::new(members))
    }

    fn num_members(&self) -> usize {
        self.members.len()
    }
}

/// All `*.onnx` files under the artifact directory, sorted by file name so
/// member order is stable across loads.
fn discover_members(dir: &Path) -> Result<Vec<PathBuf>, PredictionError> {
    let entries = std::fs::read_dir(dir).map_err(|err| {
        PredictionError::ModelLoad(format!("cannot read {}: {}", dir.display(), err))
    })?;

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|entry| entry.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == "onnx"))
        .collect();
    paths.sort();

    if paths.is_empty() {
        return Err(PredictionError::ModelLoad(format!(
            "no .onnx members under {}",
            dir.display()
        )));
    }
    Ok(paths)
}

fn load_member(path: &Path, num_features: usize) -> Result<TractModel, PredictionError> {
    tract_onnx::onnx()
        .model_for_path(path)
        .and_then(|model| model.with_input_fact(0, f32::fact([1, num_features]).into()))
        .and_then(|model| model.into_optimized())
        .and_then(|model| model.into_runnable())
        .map_err(|err| PredictionError::ModelLoad(format!("{}: {}", path.display(), err)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const TOLERANCE: f64 = 1e-9;

    #[test]
    fn test_point_prediction_is_member_mean() {
        let ensemble =
            EnsemblePredictions::new(vec![vec![10.0, 20.0], vec![30.0, 40.0], vec![20.0, 30.0]]);
        assert_eq!(ensemble.num_members(), 3);
        assert_eq!(ensemble.point(), &[20.0, 30.0]);
    }

    #[test]
    fn test_spread_is_population_std_across_members() {
        let ensemble = EnsemblePredictions::new(vec![vec![10.0], vec![30.0]]);
        let spread = ensemble.spread();
        // members 10 and 30, mean 20, population std 10
        assert!((spread[0] - 10.0).abs() < TOLERANCE);
    }

    #[test]
    fn test_single_member_spread_is_zero() {
        let ensemble = EnsemblePredictions::new(vec![vec![42.0, 17.5]]);
        assert_eq!(ensemble.num_members(), 1);
        assert_eq!(ensemble.point(), &[42.0, 17.5]);
        assert_eq!(ensemble.spread(), vec![0.0, 0.0]);
    }

    #[test]
    fn test_discover_members_sorted_by_name() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["member_2.onnx", "member_0.onnx", "member_1.onnx", "notes.txt"] {
            std::fs::File::create(dir.path().join(name)).unwrap();
        }

        let paths = discover_members(dir.path()).unwrap();
        let names: Vec<_> = paths
            .iter()
            .map(|path| path.file_name().unwrap().to_str().unwrap())
            .collect();
        assert_eq!(names, ["member_0.onnx", "member_1.onnx", "member_2.onnx"]);
    }

    #[test]
    fn test_empty_artifact_dir_is_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = discover_members(dir.path()).unwrap_err();
        assert!(matches!(err, PredictionError::ModelLoad(_)));
    }

    #[test]
    fn test_missing_artifact_dir_is_load_error() {
        let err = discover_members(Path::new("/nonexistent/models")).unwrap_err();
        assert!(matches!(err, PredictionError::ModelLoad(_)));
    }

    #[test]
    fn test_corrupt_member_is_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("member_0.onnx");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(b"not an onnx graph").unwrap();

        let err = load_member(&path, 7).unwrap_err();
        assert!(matches!(err, PredictionError::ModelLoad(_)));
    }
}
