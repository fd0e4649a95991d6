//! API error envelope
//!
//! Every failure reaches the client as `{"error": "..."}`, except upstream
//! prediction errors whose JSON body is relayed untouched.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid question")]
    InvalidQuestion,
    #[error("Missing configuration")]
    MissingConfiguration,
    #[error("Upstream returned {status}")]
    Upstream { status: StatusCode, body: Value },
    #[error("Billing not configured")]
    BillingUnavailable,
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Log an unexpected failure and collapse it into a generic 500
    pub fn internal(context: &str, err: impl std::fmt::Display) -> Self {
        tracing::error!(error = %err, "{}", context);
        ApiError::Internal(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Upstream { status, body } => return (status, Json(body)).into_response(),
            ApiError::InvalidQuestion => (StatusCode::BAD_REQUEST, "Invalid question".to_string()),
            ApiError::MissingConfiguration => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Missing configuration".to_string(),
            ),
            ApiError::BillingUnavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Billing not configured".to_string(),
            ),
            ApiError::BadRequest(reason) => (StatusCode::BAD_REQUEST, reason),
            ApiError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal Server Error".to_string(),
            ),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
