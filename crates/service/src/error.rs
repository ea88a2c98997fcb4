//! Error types for the HTTP boundary

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use forecast_lib::PredictionError;
use serde_json::json;

/// Wrapper mapping pipeline errors onto HTTP responses.
pub struct ApiError(PredictionError);

impl From<PredictionError> for ApiError {
    fn from(err: PredictionError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = if self.0.is_validation() {
            (StatusCode::BAD_REQUEST, self.0.to_string())
        } else {
            // Server-side defects keep their detail in the log, not the body
            tracing::error!(detail = %self.0, "Prediction failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "An internal error occurred".to_string(),
            )
        };

        let body = Json(json!({
            "error": true,
            "message": message,
        }));

        (status, body).into_response()
    }
}
