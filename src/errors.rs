use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// Error body returned by every HTTP endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// HTTP status category (e.g., "Bad Request")
    pub error: String,
    /// Human-readable error description
    pub message: String,
    /// RFC 3339 timestamp when the error occurred
    pub timestamp: String,
}

/// Failures at the historical sales feed boundary.
///
/// These are the only failures the forecasting core reports to callers;
/// everything data-related is absorbed as a fallback prediction.
#[derive(Debug, Clone, thiserror::Error, Serialize, PartialEq)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum FeedError {
    #[error("Sales feed unavailable: {0}")]
    Unavailable(String),

    #[error("Sales feed timed out after {after_ms}ms")]
    Timeout { after_ms: u64 },

    #[error("Invalid sales record: {0}")]
    InvalidRecord(String),
}

/// Failures surfaced by the HTTP handlers.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Feed error: {0}")]
    Feed(#[from] FeedError),
}

impl ServiceError {
    /// Returns the HTTP status code for this error.
    /// This is the single source of truth for error-to-status mapping.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::ValidationError(_) => StatusCode::BAD_REQUEST,
            Self::Feed(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Returns the error message suitable for HTTP responses.
    /// Feed details (hosts, record contents) stay in the logs.
    pub fn response_message(&self) -> String {
        match self {
            Self::Feed(FeedError::Unavailable(_)) => "Sales history is unavailable".to_string(),
            Self::Feed(FeedError::InvalidRecord(_)) => "Sales history is malformed".to_string(),
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_message = self.response_message();
        if let Self::Feed(feed) = &self {
            tracing::warn!(error = %feed, "Sales feed failure surfaced to client");
        }

        let err = ErrorResponse {
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            message: error_message,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        (status, Json(err)).into_response()
    }
}
