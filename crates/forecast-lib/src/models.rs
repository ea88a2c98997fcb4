//! Core data models for the forecast service

use crate::error::PredictionError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One batch forecast call.
///
/// `meter_ids` has length 1 (broadcast to every row) or exactly
/// `timestamps.len()`. Context features are scalar (broadcast) or a series
/// matching the batch length.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionRequest {
    pub timestamps: Vec<String>,
    pub meter_ids: Vec<String>,
    #[serde(default)]
    pub context_features: BTreeMap<String, ContextValue>,
}

/// A context feature value: a single number or one value per row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContextValue {
    Scalar(f64),
    Series(Vec<f64>),
}

impl PredictionRequest {
    /// Number of rows in the batch.
    pub fn batch_size(&self) -> usize {
        self.timestamps.len()
    }

    /// Check the shape invariants before any feature work is done.
    pub fn validate(&self) -> Result<(), PredictionError> {
        let n = self.timestamps.len();

        if self.meter_ids.len() != 1 && self.meter_ids.len() != n {
            return Err(PredictionError::ShapeMismatch {
                feature: "meter_ids".to_string(),
                expected: n,
                actual: self.meter_ids.len(),
            });
        }

        for (name, value) in &self.context_features {
            if let ContextValue::Series(values) = value {
                if values.len() != n {
                    return Err(PredictionError::ShapeMismatch {
                        feature: name.clone(),
                        expected: n,
                        actual: values.len(),
                    });
                }
            }
        }

        Ok(())
    }
}

/// Prediction output: one forecast and one interval per input row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub predictions: Vec<f64>,
    pub confidence_intervals: Vec<(f64, f64)>,
    pub model_version: String,
}

/// Model-ready numeric matrix, rows in request order, columns in the
/// configured feature order.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    columns: Vec<String>,
    rows: usize,
    data: Vec<f64>,
}

impl FeatureMatrix {
    /// `data` is row-major with `rows * columns.len()` entries.
    pub fn new(columns: Vec<String>, rows: usize, data: Vec<f64>) -> Self {
        assert_eq!(data.len(), rows * columns.len());
        Self {
            columns,
            rows,
            data,
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn row(&self, index: usize) -> &[f64] {
        let width = self.columns.len();
        &self.data[index * width..(index + 1) * width]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request_with_context(context: BTreeMap<String, ContextValue>) -> PredictionRequest {
        PredictionRequest {
            timestamps: vec![
                "2024-01-01T00:00:00".to_string(),
                "2024-01-01T12:00:00".to_string(),
            ],
            meter_ids: vec!["m1".to_string(), "m1".to_string()],
            context_features: context,
        }
    }

    #[test]
    fn test_request_deserializes_scalar_and_series_context() {
        let body = r#"{
            "timestamps": ["2024-01-01T00:00:00", "2024-01-01T12:00:00"],
            "meter_ids": ["m1"],
            "context_features": {"temperature": 21.5, "occupancy": [0.0, 1.0]}
        }"#;
        let request: PredictionRequest = serde_json::from_str(body).unwrap();

        assert_eq!(
            request.context_features["temperature"],
            ContextValue::Scalar(21.5)
        );
        assert_eq!(
            request.context_features["occupancy"],
            ContextValue::Series(vec![0.0, 1.0])
        );
    }

    #[test]
    fn test_context_features_default_to_empty() {
        let body = r#"{"timestamps": ["2024-01-01T00:00:00"], "meter_ids": ["m1"]}"#;
        let request: PredictionRequest = serde_json::from_str(body).unwrap();
        assert!(request.context_features.is_empty());
    }

    #[test]
    fn test_validate_accepts_broadcast_meter_id() {
        let mut request = request_with_context(BTreeMap::new());
        request.meter_ids = vec!["m1".to_string()];
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_wrong_meter_id_count() {
        let mut request = request_with_context(BTreeMap::new());
        request.meter_ids = vec!["m1".to_string(), "m2".to_string(), "m3".to_string()];

        let err = request.validate().unwrap_err();
        assert!(matches!(err, PredictionError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_validate_rejects_series_length_mismatch() {
        let mut context = BTreeMap::new();
        context.insert(
            "temp".to_string(),
            ContextValue::Series(vec![1.0, 2.0, 3.0]),
        );
        let request = request_with_context(context);

        let err = request.validate().unwrap_err();
        match err {
            PredictionError::ShapeMismatch {
                feature,
                expected,
                actual,
            } => {
                assert_eq!(feature, "temp");
                assert_eq!(expected, 2);
                assert_eq!(actual, 3);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_response_serializes_intervals_as_pairs() {
        let response = PredictionResponse {
            predictions: vec![42.0],
            confidence_intervals: vec![(40.0, 44.0)],
            model_version: "0.3.1".to_string(),
        };
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["confidence_intervals"][0][0], 40.0);
        assert_eq!(json["confidence_intervals"][0][1], 44.0);
        assert_eq!(json["model_version"], "0.3.1");
    }

    #[test]
    fn test_feature_matrix_row_access() {
        let matrix = FeatureMatrix::new(
            vec!["a".to_string(), "b".to_string()],
            2,
            vec![1.0, 2.0, 3.0, 4.0],
        );
        assert_eq!(matrix.rows(), 2);
        assert_eq!(matrix.width(), 2);
        assert_eq!(matrix.row(0), &[1.0, 2.0]);
        assert_eq!(matrix.row(1), &[3.0, 4.0]);
    }
}
