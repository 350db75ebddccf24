//! Client error types

use thiserror::Error;

use crate::queue::QueueError;

/// Client error type
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP transport failed before a response arrived
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body did not carry the expected envelope
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Authentication required
    #[error("Authentication required")]
    Unauthorized,

    /// Permission denied
    #[error("Permission denied: {0}")]
    Forbidden(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Payload rejected by server-side validation
    #[error("Validation error: {0}")]
    Validation(String),

    /// Order id already stored with a materially different payload
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Update rejected because the order is in a terminal state
    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),

    /// Non-success status with no specific mapping (5xx and friends)
    #[error("Server returned {status}: {message}")]
    Api { status: u16, message: String },

    /// Cart or totals computation failed
    #[error("Pricing error: {0}")]
    Pricing(#[from] shared::pricing::PricingError),

    /// Offline queue storage failed
    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ClientError {
    /// Whether a later retry could plausibly succeed.
    ///
    /// Transport failures, lost acknowledgments and 5xx responses are
    /// retryable: the server either never saw the order or idempotent
    /// resubmission makes a repeat safe. Validation, auth, conflict and
    /// precondition rejections never change on retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Http(e) => !e.is_builder(),
            ClientError::InvalidResponse(_) => true,
            ClientError::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;
