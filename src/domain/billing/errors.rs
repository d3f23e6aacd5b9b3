//! Billing-specific error types.
//!
//! Errors related to subscription operations, refunds, and payment gateway
//! interactions.
//!
//! # HTTP Status Mapping
//!
//! | Error | HTTP Status |
//! |-------|-------------|
//! | NotFound | 404 |
//! | TransactionNotFound | 404 |
//! | InvalidPlan | 400 |
//! | InvalidState | 400 |
//! | RefundWindowExpired | 400 |
//! | RefundAlreadyProcessed | 400 |
//! | ValidationFailed | 400 |
//! | VersionConflict | 409 |
//! | InvalidWebhookSignature | 401 |
//! | GatewayFailed | 502 |
//! | Infrastructure | 500 |

use crate::domain::foundation::{DomainError, ErrorCode, SubscriptionId, UserId};

use super::REFUND_WINDOW_DAYS;

/// Billing-specific errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BillingError {
    /// Subscription was not found.
    NotFound(SubscriptionId),

    /// No subscription exists for this user.
    NotFoundForUser(UserId),

    /// No refundable transaction exists for this subscription.
    TransactionNotFound(SubscriptionId),

    /// The requested plan is not valid for this subscription.
    InvalidPlan(String),

    /// Operation not allowed in the subscription's current state.
    InvalidState { reason: String },

    /// The refund window has closed.
    RefundWindowExpired { days_used: u32 },

    /// A refund was already processed for this subscription.
    RefundAlreadyProcessed,

    /// The subscription was modified concurrently.
    VersionConflict,

    /// Payment gateway call failed.
    GatewayFailed(String),

    /// Webhook signature verification failed.
    InvalidWebhookSignature,

    /// Validation failed.
    ValidationFailed { field: String, message: String },

    /// Infrastructure error.
    Infrastructure(String),
}

impl BillingError {
    // Constructor functions for cleaner error creation

    pub fn not_found(id: SubscriptionId) -> Self {
        BillingError::NotFound(id)
    }

    pub fn not_found_for_user(user_id: UserId) -> Self {
        BillingError::NotFoundForUser(user_id)
    }

    pub fn transaction_not_found(subscription_id: SubscriptionId) -> Self {
        BillingError::TransactionNotFound(subscription_id)
    }

    pub fn invalid_plan(message: impl Into<String>) -> Self {
        BillingError::InvalidPlan(message.into())
    }

    pub fn invalid_state(reason: impl Into<String>) -> Self {
        BillingError::InvalidState {
            reason: reason.into(),
        }
    }

    pub fn refund_window_expired(days_used: u32) -> Self {
        BillingError::RefundWindowExpired { days_used }
    }

    pub fn refund_already_processed() -> Self {
        BillingError::RefundAlreadyProcessed
    }

    pub fn version_conflict() -> Self {
        BillingError::VersionConflict
    }

    pub fn gateway_failed(message: impl Into<String>) -> Self {
        BillingError::GatewayFailed(message.into())
    }

    pub fn invalid_webhook_signature() -> Self {
        BillingError::InvalidWebhookSignature
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        BillingError::ValidationFailed {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn infrastructure(message: impl Into<String>) -> Self {
        BillingError::Infrastructure(message.into())
    }

    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            BillingError::NotFound(_) | BillingError::NotFoundForUser(_) => {
                ErrorCode::SubscriptionNotFound
            }
            BillingError::TransactionNotFound(_) => ErrorCode::TransactionNotFound,
            BillingError::InvalidPlan(_) => ErrorCode::InvalidPlan,
            BillingError::InvalidState { .. } => ErrorCode::InvalidStateTransition,
            BillingError::RefundWindowExpired { .. } => ErrorCode::RefundWindowExpired,
            BillingError::RefundAlreadyProcessed => ErrorCode::RefundAlreadyProcessed,
            BillingError::VersionConflict => ErrorCode::ConcurrentModification,
            BillingError::GatewayFailed(_) => ErrorCode::PaymentGatewayError,
            BillingError::InvalidWebhookSignature => ErrorCode::InvalidWebhookSignature,
            BillingError::ValidationFailed { .. } => ErrorCode::ValidationFailed,
            BillingError::Infrastructure(_) => ErrorCode::DatabaseError,
        }
    }

    /// Returns a user-friendly error message.
    pub fn message(&self) -> String {
        match self {
            BillingError::NotFound(id) => format!("Subscription not found: {}", id),
            BillingError::NotFoundForUser(user_id) => {
                format!("No subscription found for user: {}", user_id)
            }
            BillingError::TransactionNotFound(subscription_id) => {
                format!(
                    "No refundable transaction found for subscription: {}",
                    subscription_id
                )
            }
            BillingError::InvalidPlan(message) => message.clone(),
            BillingError::InvalidState { reason } => reason.clone(),
            BillingError::RefundWindowExpired { days_used } => {
                format!(
                    "Refund window of {} days has passed ({} days used)",
                    REFUND_WINDOW_DAYS, days_used
                )
            }
            BillingError::RefundAlreadyProcessed => {
                "A refund has already been processed for this subscription".to_string()
            }
            BillingError::VersionConflict => {
                "Subscription was modified concurrently, retry the request".to_string()
            }
            BillingError::GatewayFailed(message) => {
                format!("Payment gateway error: {}", message)
            }
            BillingError::InvalidWebhookSignature => "Invalid webhook signature".to_string(),
            BillingError::ValidationFailed { field, message } => {
                format!("Validation failed for '{}': {}", field, message)
            }
            BillingError::Infrastructure(msg) => format!("Error: {}", msg),
        }
    }

    /// Returns true if this error should trigger a retry.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            BillingError::Infrastructure(_)
                | BillingError::GatewayFailed(_)
                | BillingError::VersionConflict
        )
    }
}

impl std::fmt::Display for BillingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for BillingError {}

impl From<DomainError> for BillingError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::InvalidPlan => BillingError::InvalidPlan(err.message),
            ErrorCode::InvalidStateTransition => BillingError::InvalidState {
                reason: err.message,
            },
            ErrorCode::RefundAlreadyProcessed => BillingError::RefundAlreadyProcessed,
            ErrorCode::ConcurrentModification => BillingError::VersionConflict,
            ErrorCode::PaymentGatewayError => BillingError::GatewayFailed(err.message),
            ErrorCode::InvalidWebhookSignature => BillingError::InvalidWebhookSignature,
            ErrorCode::ValidationFailed
            | ErrorCode::EmptyField
            | ErrorCode::InvalidFormat => BillingError::ValidationFailed {
                field: "unknown".to_string(),
                message: err.message,
            },
            _ => BillingError::Infrastructure(err.to_string()),
        }
    }
}

impl From<BillingError> for DomainError {
    fn from(err: BillingError) -> Self {
        DomainError::new(err.code(), err.message())
    }
}
