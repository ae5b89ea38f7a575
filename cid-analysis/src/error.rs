//! Error types for cid-analysis
//!
//! **[CID-ERR-010]** Pipeline error taxonomy
//! **[CID-ERR-020]** HTTP error mapping

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Analysis pipeline errors
///
/// Each variant maps to one stage boundary of the pipeline. Stage-local
/// errors are handled at that boundary: validation and upload errors are
/// recoverable by fixing the draft or retrying the step, submission
/// errors carry an explicit retry transition, and persistence errors are
/// logged without blocking the visible result.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Draft failed request-assembly validation; never reaches the network
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Sample image upload or signed-URL fetch failed
    #[error("Upload failed: {0}")]
    Upload(String),

    /// Prediction service health probe failed
    #[error("Prediction service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Prediction call failed or returned a malformed body
    #[error("Prediction failed: {0}")]
    PredictionFailed(String),

    /// History insert failed (non-fatal to the visible result)
    #[error("Persistence failed: {0}")]
    Persistence(String),
}

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Conflict (409) - e.g., submission already in flight
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// Pipeline error
    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    /// Generic error
    #[error(transparent)]
    Other(#[from] anyhow::Error),

    /// cid-common error
    #[error("Common error: {0}")]
    Common(#[from] cid_common::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
            ApiError::Internal(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg)
            }
            ApiError::Analysis(err) => match err {
                AnalysisError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_FAILED", msg)
                }
                AnalysisError::Upload(msg) => (StatusCode::BAD_GATEWAY, "UPLOAD_FAILED", msg),
                AnalysisError::ServiceUnavailable(msg) => {
                    (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE", msg)
                }
                AnalysisError::PredictionFailed(msg) => {
                    (StatusCode::BAD_GATEWAY, "PREDICTION_FAILED", msg)
                }
                AnalysisError::Persistence(msg) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "PERSISTENCE_FAILED", msg)
                }
            },
            ApiError::Other(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                err.to_string(),
            ),
            ApiError::Common(err) => match err {
                cid_common::Error::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
                cid_common::Error::InvalidInput(msg) => {
                    (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg)
                }
                other => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "COMMON_ERROR",
                    other.to_string(),
                ),
            },
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
