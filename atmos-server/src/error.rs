//! HTTP error mapping
//!
//! Every failure leaves the server as
//! `{"error": {"code": "...", "message": "...", "retryable": bool}}`.

use atmos_common::ForecastError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::time::Duration;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed or out-of-range input (400)
    #[error("{0}")]
    BadRequest(String),

    #[error("Location {0} not found")]
    LocationNotFound(i64),

    #[error("No location named '{0}'")]
    LocationNameNotFound(String),

    #[error("Observation {0} not found")]
    ObservationNotFound(i64),

    /// The location exists but has never been observed
    #[error("Location {0} has no observations")]
    NoObservations(i64),

    #[error("Forecast could not be fitted: {0}")]
    FitFailure(String),

    #[error("Forecast timed out after {0:?}")]
    ForecastTimeout(Duration),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::LocationNotFound(_)
            | ApiError::LocationNameNotFound(_)
            | ApiError::ObservationNotFound(_)
            | ApiError::NoObservations(_) => StatusCode::NOT_FOUND,
            ApiError::FitFailure(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::ForecastTimeout(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::LocationNotFound(_) | ApiError::LocationNameNotFound(_) => {
                "LOCATION_NOT_FOUND"
            }
            ApiError::ObservationNotFound(_) => "OBSERVATION_NOT_FOUND",
            ApiError::NoObservations(_) => "NO_OBSERVATIONS",
            ApiError::FitFailure(_) => "FIT_FAILURE",
            ApiError::ForecastTimeout(_) => "FORECAST_TIMEOUT",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn retryable(&self) -> bool {
        matches!(self, ApiError::FitFailure(_) | ApiError::ForecastTimeout(_))
    }
}

impl From<atmos_common::Error> for ApiError {
    fn from(err: atmos_common::Error) -> Self {
        use atmos_common::Error;
        match err {
            Error::LocationNotFound(id) => ApiError::LocationNotFound(id),
            Error::ObservationNotFound(id) => ApiError::ObservationNotFound(id),
            Error::InvalidObservation(msg) | Error::InvalidLocation(msg) => {
                ApiError::BadRequest(msg)
            }
            other => {
                error!("Request failed: {}", other);
                ApiError::Internal(other.to_string())
            }
        }
    }
}

impl From<ForecastError> for ApiError {
    fn from(err: ForecastError) -> Self {
        match err {
            ForecastError::FitFailure(msg) => ApiError::FitFailure(msg),
            ForecastError::Timeout(after) => ApiError::ForecastTimeout(after),
            invalid @ ForecastError::InvalidPeriods { .. } => {
                ApiError::BadRequest(invalid.to_string())
            }
            ForecastError::History(inner) => inner.into(),
            ForecastError::Worker(msg) => {
                error!("Forecast worker failed: {}", msg);
                ApiError::Internal(msg)
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": {
                "code": self.code(),
                "message": self.to_string(),
                "retryable": self.retryable(),
            }
        }));

        (self.status(), body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
