//! Error types for factcheck-ai
//!
//! Pipeline errors are defined next to the orchestrator; this module maps
//! them, and request validation failures, onto HTTP responses.

use crate::services::GenerationError;
use crate::workflow::PipelineError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Pipeline run aborted (429 when rate limited, 502 otherwise)
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Pipeline(ref err) => match err.generation_error() {
                GenerationError::Throttled(_) | GenerationError::RateLimitExceeded { .. } => {
                    (StatusCode::TOO_MANY_REQUESTS, "RATE_LIMITED", err.to_string())
                }
                GenerationError::Service(_) => (StatusCode::BAD_GATEWAY, "GENERATION_ERROR", err.to_string()),
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::StageName;

    fn pipeline_error(source: GenerationError) -> ApiError {
        ApiError::Pipeline(PipelineError::Generation {
            stage: StageName::Research,
            source,
        })
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::BadRequest("empty claim".into()).into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            pipeline_error(GenerationError::RateLimitExceeded { attempts: 3 })
                .into_response()
                .status(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            pipeline_error(GenerationError::Service("bad key".into()))
                .into_response()
                .status(),
            StatusCode::BAD_GATEWAY
        );
    }
}
