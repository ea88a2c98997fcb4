//! Feature engineering for forecast requests
//!
//! Turns a prediction request into the model-ready feature matrix: calendar
//! derivation, cyclical encodings, context pass-through, normalization, and
//! configured column selection. Stateless across requests.

use crate::config::PipelineConfig;
use crate::error::PredictionError;
use crate::models::{ContextValue, FeatureMatrix, PredictionRequest};
use chrono::{DateTime, Datelike, NaiveDateTime, Timelike};
use std::f64::consts::PI;

/// Converts a request into an ordered numeric feature matrix.
#[derive(Debug, Clone)]
pub struct FeaturePipeline {
    config: PipelineConfig,
}

impl FeaturePipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Transform a request into an N x K matrix, K being the configured
    /// feature-column count. Deterministic: same request and config produce
    /// a bit-identical matrix.
    pub fn transform(&self, request: &PredictionRequest) -> Result<FeatureMatrix, PredictionError> {
        let n = request.timestamps.len();
        let mut table = FeatureTable::new(n);

        // Context features first; a name colliding with a derived column is
        // overwritten by the derivation below.
        for (name, value) in &request.context_features {
            let column = match value {
                ContextValue::Scalar(scalar) => vec![*scalar; n],
                ContextValue::Series(values) => {
                    if values.len() != n {
                        return Err(PredictionError::ShapeMismatch {
                            feature: name.clone(),
                            expected: n,
                            actual: values.len(),
                        });
                    }
                    values.clone()
                }
            };
            table.upsert(name, column);
        }

        let mut hours = Vec::with_capacity(n);
        let mut days = Vec::with_capacity(n);
        let mut months = Vec::with_capacity(n);
        for raw in &request.timestamps {
            let timestamp = parse_timestamp(raw)?;
            hours.push(f64::from(timestamp.hour()));
            days.push(f64::from(timestamp.weekday().num_days_from_monday()));
            months.push(f64::from(timestamp.month()));
        }
        let weekends: Vec<f64> = days
            .iter()
            .map(|&day| if day >= 5.0 { 1.0 } else { 0.0 })
            .collect();

        let (hour_sin, hour_cos) = cyclical_encode(&hours, 24.0);
        let (day_sin, day_cos) = cyclical_encode(&days, 7.0);
        let (month_sin, month_cos) = cyclical_encode(&months, 12.0);

        table.upsert("hour", hours);
        table.upsert("day_of_week", days);
        table.upsert("month", months);
        table.upsert("is_weekend", weekends);
        table.upsert("hour_sin", hour_sin);
        table.upsert("hour_cos", hour_cos);
        table.upsert("day_sin", day_sin);
        table.upsert("day_cos", day_cos);
        table.upsert("month_sin", month_sin);
        table.upsert("month_cos", month_cos);

        if self.config.normalize {
            self.normalize(&mut table);
        }

        table.select(&self.config.feature_columns)
    }

    /// Scale every numeric column with configured statistics when present,
    /// batch statistics otherwise. A zero standard deviation leaves the
    /// column unscaled.
    fn normalize(&self, table: &mut FeatureTable) {
        for (name, values) in table.columns_mut() {
            let (mean, std) = match self.config.normalization.get(name) {
                Some(stats) => (stats.mean, stats.std),
                None => batch_stats(values),
            };
            if std > 0.0 {
                for value in values.iter_mut() {
                    *value = (*value - mean) / std;
                }
            }
        }
    }
}

/// Intermediate per-request feature table, insertion-ordered, one numeric
/// column per feature. Discarded once the matrix is extracted.
struct FeatureTable {
    rows: usize,
    columns: Vec<(String, Vec<f64>)>,
}

impl FeatureTable {
    fn new(rows: usize) -> Self {
        Self {
            rows,
            columns: Vec::new(),
        }
    }

    fn upsert(&mut self, name: &str, values: Vec<f64>) {
        debug_assert_eq!(values.len(), self.rows);
        match self.columns.iter_mut().find(|(existing, _)| existing == name) {
            Some((_, column)) => *column = values,
            None => self.columns.push((name.to_string(), values)),
        }
    }

    fn get(&self, name: &str) -> Option<&[f64]> {
        self.columns
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, values)| values.as_slice())
    }

    fn columns_mut(&mut self) -> impl Iterator<Item = (&str, &mut Vec<f64>)> {
        self.columns
            .iter_mut()
            .map(|(name, values)| (name.as_str(), values))
    }

    /// Select and order columns exactly as listed; extra columns are dropped.
    fn select(&self, names: &[String]) -> Result<FeatureMatrix, PredictionError> {
        let mut selected = Vec::with_capacity(names.len());
        for name in names {
            let values = self
                .get(name)
                .ok_or_else(|| PredictionError::MissingFeature(name.clone()))?;
            selected.push(values);
        }

        let mut data = Vec::with_capacity(self.rows * names.len());
        for row in 0..self.rows {
            for column in &selected {
                data.push(column[row]);
            }
        }
        Ok(FeatureMatrix::new(names.to_vec(), self.rows, data))
    }
}

/// Parse an ISO-8601 timestamp, with or without a UTC offset. Offset
/// timestamps keep their written wall-clock time for calendar fields.
fn parse_timestamp(value: &str) -> Result<NaiveDateTime, PredictionError> {
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(value) {
        return Ok(timestamp.naive_local());
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f").map_err(|err| {
        PredictionError::InvalidTimestamp {
            value: value.to_string(),
            reason: err.to_string(),
        }
    })
}

/// Sine/cosine pair so that adjacent periods stay numerically close
/// (hour 23 wraps to hour 0 without artificial distance).
fn cyclical_encode(values: &[f64], period: f64) -> (Vec<f64>, Vec<f64>) {
    let sin = values
        .iter()
        .map(|value| (2.0 * PI * value / period).sin())
        .collect();
    let cos = values
        .iter()
        .map(|value| (2.0 * PI * value / period).cos())
        .collect();
    (sin, cos)
}

/// Batch mean and sample standard deviation, zero for batches of fewer than
/// two rows so a single row passes through unscaled.
fn batch_stats(values: &[f64]) -> (f64, f64) {
    let n = values.len();
    if n == 0 {
        return (0.0, 0.0);
    }
    let mean = values.iter().sum::<f64>() / n as f64;
    if n < 2 {
        return (mean, 0.0);
    }
    let variance = values
        .iter()
        .map(|value| (value - mean).powi(2))
        .sum::<f64>()
        / (n - 1) as f64;
    (mean, variance.sqrt())
}
