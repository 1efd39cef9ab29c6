//! HTTP error responses.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::HuginnError;

/// Error response body: `{"error": {"code", "message"}}`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
}

/// API-level errors with HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Scoring unavailable: {0}")]
    ScoringUnavailable(String),
    #[error("Invalid batch input: {0}")]
    InvalidBatchInput(String),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Request timed out after {0}s")]
    Timeout(u64),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            ApiError::ScoringUnavailable(detail) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "SCORING_UNAVAILABLE",
                detail,
            ),
            ApiError::InvalidBatchInput(detail) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "INVALID_BATCH_INPUT",
                detail,
            ),
            ApiError::InvalidRequest(detail) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "INVALID_REQUEST", detail)
            }
            ApiError::Timeout(secs) => (
                StatusCode::GATEWAY_TIMEOUT,
                "TIMEOUT",
                format!("Classification did not finish within {secs}s"),
            ),
            ApiError::Internal(detail) => {
                tracing::error!(detail, "API internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = ErrorBody {
            error: ErrorDetail { code, message },
        };
        (status, Json(body)).into_response()
    }
}

impl From<HuginnError> for ApiError {
    fn from(err: HuginnError) -> Self {
        match err {
            HuginnError::ScoringUnavailable(reason) => ApiError::ScoringUnavailable(reason),
            HuginnError::InvalidBatchInput(reason) => ApiError::InvalidBatchInput(reason),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl ApiError {
    /// Map a JSON body rejection for a single-review request.
    pub fn from_classify_rejection(rejection: JsonRejection) -> Self {
        ApiError::InvalidRequest(rejection.body_text())
    }

    /// Map a JSON body rejection for a batch request.
    pub fn from_batch_rejection(rejection: JsonRejection) -> Self {
        ApiError::InvalidBatchInput(format!(
            "expected {{\"reviews\": [string, ...]}}: {}",
            rejection.body_text()
        ))
    }
}
