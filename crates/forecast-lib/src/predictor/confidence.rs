//! Confidence intervals from ensemble spread
//!
//! Two-sided symmetric intervals at a configured multiplier (1.96 for ~95%).
//! A zero spread, the single-estimator case, collapses the interval onto the
//! point prediction.

/// Derives per-prediction uncertainty bounds.
#[derive(Debug, Clone, Copy)]
pub struct ConfidenceEstimator {
    multiplier: f64,
}

impl ConfidenceEstimator {
    pub fn new(multiplier: f64) -> Self {
        Self { multiplier }
    }

    /// `(lower, upper)` per row: `pred ± multiplier * spread`. Symmetry
    /// around the point prediction is an invariant.
    pub fn bounds(&self, predictions: &[f64], spread: &[f64]) -> Vec<(f64, f64)> {
        debug_assert_eq!(predictions.len(), spread.len());
        predictions
            .iter()
            .zip(spread)
            .map(|(&prediction, &sigma)| {
                let width = self.multiplier * sigma;
                (prediction - width, prediction + width)
            })
            .collect()
    }
}
