//! Domain error types.
//!
//! [`ValidationError`] covers value-object construction; [`DomainError`]
//! is the uniform error the application layer maps to HTTP responses,
//! keyed by a stable [`ErrorCode`].

use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Field '{field}' cannot be empty")]
    EmptyField { field: String },

    #[error("Field '{field}' has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

impl ValidationError {
    pub fn empty_field(field: impl Into<String>) -> Self {
        ValidationError::EmptyField { field: field.into() }
    }

    pub fn invalid_format(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidationError::InvalidFormat {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Stable machine-readable codes. These appear verbatim in API error
/// bodies, so renaming one is a breaking change for clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Validation
    ValidationFailed,
    EmptyField,
    InvalidFormat,

    // Lookup
    SubscriptionNotFound,
    TransactionNotFound,

    // Subscription state
    InvalidStateTransition,
    RefundWindowExpired,
    RefundAlreadyProcessed,
    ConcurrentModification,
    InvalidPlan,

    // Gateway
    PaymentGatewayError,
    InvalidWebhookSignature,

    // Infrastructure
    DatabaseError,
    InternalError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        use ErrorCode::*;
        match self {
            ValidationFailed => "VALIDATION_FAILED",
            EmptyField => "EMPTY_FIELD",
            InvalidFormat => "INVALID_FORMAT",
            SubscriptionNotFound => "SUBSCRIPTION_NOT_FOUND",
            TransactionNotFound => "TRANSACTION_NOT_FOUND",
            InvalidStateTransition => "INVALID_STATE_TRANSITION",
            RefundWindowExpired => "REFUND_WINDOW_EXPIRED",
            RefundAlreadyProcessed => "REFUND_ALREADY_PROCESSED",
            ConcurrentModification => "CONCURRENT_MODIFICATION",
            InvalidPlan => "INVALID_PLAN",
            PaymentGatewayError => "PAYMENT_GATEWAY_ERROR",
            InvalidWebhookSignature => "INVALID_WEBHOOK_SIGNATURE",
            DatabaseError => "DATABASE_ERROR",
            InternalError => "INTERNAL_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Uniform domain-layer error: a code, a human-readable message, and
/// optional key-value context for logs and API bodies.
#[derive(Debug, Clone, Error)]
#[error("[{code}] {message}")]
pub struct DomainError {
    pub code: ErrorCode,
    pub message: String,
    pub details: HashMap<String, String>,
}

impl DomainError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: HashMap::new(),
        }
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }
}
