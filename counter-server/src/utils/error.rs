//! Unified error handling
//!
//! Application error type and response envelope:
//! - [`AppError`] - application error enum
//! - [`AppResponse`] - API response envelope
//!
//! # Error code scheme
//!
//! | Prefix | Category | Example |
//! |--------|----------|---------|
//! | E0xxx  | Business errors | E0003 not found |
//! | E2xxx  | Permission errors | E2001 forbidden |
//! | E3xxx  | Token errors | E3002 invalid token |
//! | E9xxx  | System errors | E9001 internal error |
//!
//! # Usage
//!
//! ```ignore
//! // Return an error
//! Err(AppError::NotFound("order order-17-x1 not found".into()))
//!
//! // Return a success envelope
//! Ok(ok(data))
//! ```

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use shared::models::TransitionError;
use shared::pricing::PricingError;
use tracing::error;

/// Unified API response envelope
///
/// ```json
/// {
///   "code": "E0000",
///   "message": "Success",
///   "data": { ... }
/// }
/// ```
#[derive(Debug, Serialize)]
pub struct AppResponse<T> {
    /// Error code (`E0000` on success)
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

/// Application-level Result type, used in HTTP handlers
pub type AppResult<T> = Result<T, AppError>;

/// Application error enum
///
/// Each variant maps to one HTTP status and one stable error code, so
/// clients can branch on the envelope without parsing messages.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // ========== Auth errors (4xx) ==========
    #[error("Authentication required")]
    /// Missing/absent credentials (401)
    Unauthorized,

    #[error("Token expired")]
    /// Expired token (401)
    TokenExpired,

    #[error("Invalid token")]
    /// Malformed or badly signed token (401)
    InvalidToken,

    #[error("Permission denied: {0}")]
    /// Authenticated but not allowed (403)
    Forbidden(String),

    // ========== Business errors (4xx) ==========
    #[error("Resource not found: {0}")]
    /// Unknown order id (404)
    NotFound(String),

    #[error("Conflict: {0}")]
    /// Duplicate id with a divergent payload (409)
    Conflict(String),

    #[error("Validation failed: {0}")]
    /// Malformed or inconsistent payload (400)
    Validation(String),

    #[error("Invalid transition: {0}")]
    /// Illegal state-machine edge between live states (400)
    InvalidTransition(String),

    #[error("Precondition failed: {0}")]
    /// Mutation of an order already in a terminal state (412)
    PreconditionFailed(String),

    // ========== System errors ==========
    #[error("Request timed out")]
    /// Request exceeded the processing deadline (408)
    Timeout,

    #[error("Internal server error: {0}")]
    /// Unexpected failure (500)
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // Authentication errors (401)
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "E3001", "Please login first"),
            AppError::TokenExpired => (StatusCode::UNAUTHORIZED, "E3003", "Token expired"),
            AppError::InvalidToken => (StatusCode::UNAUTHORIZED, "E3002", "Invalid token"),

            // Authorization errors (403)
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, "E2001", msg.as_str()),

            // Not found (404)
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "E0003", msg.as_str()),

            // Conflict (409)
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "E0004", msg.as_str()),

            // Validation (400)
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "E0002", msg.as_str()),

            // Illegal transition between live states (400)
            AppError::InvalidTransition(msg) => (StatusCode::BAD_REQUEST, "E0005", msg.as_str()),

            // Terminal-state mutation (412)
            AppError::PreconditionFailed(msg) => {
                (StatusCode::PRECONDITION_FAILED, "E0006", msg.as_str())
            }

            // Deadline exceeded (408)
            AppError::Timeout => (StatusCode::REQUEST_TIMEOUT, "E9002", "Request timed out"),

            // Internal errors (500)
            AppError::Internal(msg) => {
                error!(target: "internal", error = %msg, "Internal error occurred");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "E9001",
                    "Internal server error",
                )
            }
        };

        let body = Json(AppResponse::<()> {
            code: code.to_string(),
            message: message.to_string(),
            data: None,
        });

        (status, body).into_response()
    }
}

impl From<TransitionError> for AppError {
    fn from(e: TransitionError) -> Self {
        match e {
            TransitionError::Terminal { .. } => AppError::PreconditionFailed(e.to_string()),
            TransitionError::Invalid { .. } => AppError::InvalidTransition(e.to_string()),
        }
    }
}

impl From<PricingError> for AppError {
    fn from(e: PricingError) -> Self {
        AppError::Validation(e.to_string())
    }
}

// ========== Helper functions ==========

/// Create a successful response
pub fn ok<T: Serialize>(data: T) -> Json<AppResponse<T>> {
    Json(AppResponse {
        code: "E0000".to_string(),
        message: "Success".to_string(),
        data: Some(data),
    })
}

/// Create a successful response with custom message
pub fn ok_with_message<T: Serialize>(data: T, message: impl Into<String>) -> Json<AppResponse<T>> {
    Json(AppResponse {
        code: "E0000".to_string(),
        message: message.into(),
        data: Some(data),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::OrderStatus;

    #[test]
    fn transition_errors_map_to_http_semantics() {
        let terminal = TransitionError::Terminal {
            from: OrderStatus::Completed,
        };
        assert!(matches!(
            AppError::from(terminal),
            AppError::PreconditionFailed(_)
        ));

        let invalid = TransitionError::Invalid {
            from: OrderStatus::Pending,
            to: OrderStatus::Ready,
        };
        assert!(matches!(
            AppError::from(invalid),
            AppError::InvalidTransition(_)
        ));
    }

    #[test]
    fn success_envelope_uses_zero_code() {
        let Json(body) = ok(42);
        assert_eq!(body.code, "E0000");
        assert_eq!(body.data, Some(42));
    }
}
