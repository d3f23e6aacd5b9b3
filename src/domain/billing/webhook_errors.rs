//! Webhook error types for Pagar.me webhook handling.
//!
//! Defines all error conditions that can occur during webhook processing,
//! with HTTP status code mapping and retryability semantics. The status
//! code drives the gateway's retry behavior: 2xx acknowledges, 4xx drops,
//! 5xx retries.

use axum::http::StatusCode;
use thiserror::Error;

use crate::domain::foundation::DomainError;

/// Errors that occur during webhook processing.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// Webhook signature verification failed.
    #[error("Invalid signature")]
    InvalidSignature,

    /// Failed to parse the payload, the signature header, or a payload field.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Referenced subscription could not be found.
    #[error("Subscription not found")]
    SubscriptionNotFound,

    /// Attempted state transition is not valid.
    #[error("Invalid state transition: {0}")]
    InvalidTransition(String),

    /// Event was intentionally ignored (not an error condition).
    #[error("Event ignored: {0}")]
    Ignored(String),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(String),
}

impl WebhookError {
    /// Returns true if the gateway should retry delivering this webhook.
    ///
    /// Retryable errors indicate temporary failures that may succeed
    /// on subsequent attempts (database issues, eventual consistency).
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            WebhookError::Database(_)
                | WebhookError::SubscriptionNotFound // Might be eventual consistency
        )
    }

    /// Maps the error to an appropriate HTTP status code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            // Auth failure - don't retry
            WebhookError::InvalidSignature => StatusCode::UNAUTHORIZED,

            // Bad request - don't retry
            WebhookError::ParseError(_) => StatusCode::BAD_REQUEST,

            // Ignored events are acknowledged as success
            WebhookError::Ignored(_) => StatusCode::OK,

            // Server errors - will retry
            WebhookError::SubscriptionNotFound
            | WebhookError::InvalidTransition(_)
            | WebhookError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Repository failures surface as database errors.
impl From<DomainError> for WebhookError {
    fn from(err: DomainError) -> Self {
        WebhookError::Database(err.to_string())
    }
}
