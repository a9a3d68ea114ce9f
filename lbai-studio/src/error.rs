//! Error types for lbai-studio
//!
//! `ApiError` is what HTTP handlers return. `PipelineError` is what pipeline
//! stages return; the orchestrator decides per stage whether an error is
//! fatal or degrades to a fallback.

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
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// lbai-common error
    #[error("Common error: {0}")]
    Common(#[from] lbai_common::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Io(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "IO_ERROR",
                err.to_string(),
            ),
            ApiError::Common(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "COMMON_ERROR",
                err.to_string(),
            ),
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

/// Pipeline stage errors
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Optional generative capability failed to initialize or is unreachable
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Required external reference (e.g. voice model path) is missing
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Background image/video unreachable or undecodable
    #[error("Asset fetch failed: {0}")]
    AssetFetch(String),

    /// Malformed input
    #[error("Validation error: {0}")]
    Validation(String),

    /// Provider initialized but rejected or failed a request
    #[error("Provider request failed: {0}")]
    Provider(String),

    /// External media tool (ffmpeg) failed
    #[error("Media tool failed: {0}")]
    Media(String),

    /// WAV decode/encode or sample processing failed
    #[error("Audio processing failed: {0}")]
    Audio(String),

    /// Filesystem failure
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<hound::Error> for PipelineError {
    fn from(err: hound::Error) -> Self {
        match err {
            hound::Error::IoError(e) => PipelineError::Io(e),
            other => PipelineError::Audio(other.to_string()),
        }
    }
}

impl From<tokio::task::JoinError> for PipelineError {
    fn from(err: tokio::task::JoinError) -> Self {
        PipelineError::Audio(format!("Blocking task failed: {}", err))
    }
}

/// Result type for pipeline stages
pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn render(err: ApiError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_error_body_shape_and_status() {
        let (status, body) = render(ApiError::NotFound("No generated file yet".into())).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
        assert_eq!(body["error"]["message"], "No generated file yet");

        let (status, body) = render(ApiError::BadRequest("Only .wav allowed".into())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "BAD_REQUEST");

        let (status, body) =
            render(lbai_common::Error::Internal("pool closed".into()).into()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"]["code"], "COMMON_ERROR");
    }

    #[test]
    fn test_hound_io_error_maps_to_io() {
        let err: PipelineError =
            hound::Error::IoError(std::io::Error::from(std::io::ErrorKind::NotFound)).into();
        assert!(matches!(err, PipelineError::Io(_)));
        let err: PipelineError = hound::Error::Unsupported.into();
        assert!(matches!(err, PipelineError::Audio(_)));
    }
}
