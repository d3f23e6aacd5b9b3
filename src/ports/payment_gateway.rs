//! Payment gateway port for outbound Pagar.me calls.
//!
//! Defines the contract for the gateway operations this service initiates:
//! creating a hosted checkout, cancelling a recurring subscription and
//! refunding a settled charge. Inbound traffic (webhooks) does not go
//! through this port; events are verified and parsed in the domain layer.
//!
//! # Design
//!
//! - **Gateway agnostic**: Interface works with any payment provider
//! - **Hosted checkout**: Card data never touches this service; checkout
//!   hands the user a gateway-hosted payment link
//! - **Idempotent**: A repeat cancel reports `AlreadyCancelled`, not an error

use crate::domain::billing::BillingError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Port for outbound payment gateway operations.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a hosted checkout session for a plan purchase.
    ///
    /// Returns the payment link the user completes the purchase on. The
    /// link id becomes the subscription's gateway reference until a
    /// payment webhook replaces it with the real subscription id.
    async fn create_checkout(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutSession, PaymentError>;

    /// Cancel a recurring subscription at the gateway.
    ///
    /// Gateways report a second cancel attempt as an error; implementations
    /// must fold that into `CancellationOutcome::AlreadyCancelled` so the
    /// caller can treat it as success.
    async fn cancel_subscription(
        &self,
        gateway_subscription_id: &str,
    ) -> Result<CancellationOutcome, PaymentError>;

    /// Refund a settled charge in full.
    ///
    /// `amount_cents` must match the originally charged amount.
    async fn refund_transaction(
        &self,
        gateway_transaction_id: &str,
        amount_cents: i64,
    ) -> Result<(), PaymentError>;
}

/// A checkout the gateway should build a payment link for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutRequest {
    /// Stable item code the gateway reports back in order items.
    pub plan_code: String,

    /// Human-readable plan description shown on the payment page.
    pub description: String,

    /// Price in centavos.
    pub amount_cents: i64,

    /// Buyer details required by the gateway.
    pub customer: CheckoutCustomer,

    /// Platform user id, stamped into checkout metadata so payment
    /// webhooks can be linked back to the subscription row.
    pub user_id: String,
}

/// Buyer identity forwarded to the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutCustomer {
    pub name: String,
    pub email: String,
    /// CPF, digits only.
    pub document: String,
}

/// A hosted checkout created at the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSession {
    /// Gateway payment link id.
    pub gateway_link_id: String,

    /// URL the user completes the purchase on.
    pub checkout_url: String,
}

/// Outcome of a gateway cancellation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancellationOutcome {
    /// The gateway cancelled the subscription on this request.
    Cancelled,
    /// The gateway had already cancelled it (treated as success).
    AlreadyCancelled,
}

/// Errors from payment gateway operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentError {
    /// Error code for categorization.
    pub code: PaymentErrorCode,

    /// Human-readable message.
    pub message: String,

    /// Provider's error code (if available).
    pub provider_code: Option<String>,

    /// Whether the operation can be retried.
    pub retryable: bool,
}

impl PaymentError {
    /// Create a new payment error.
    pub fn new(code: PaymentErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            provider_code: None,
            retryable: code.is_retryable(),
        }
    }

    /// Create with provider code.
    pub fn with_provider_code(mut self, code: impl Into<String>) -> Self {
        self.provider_code = Some(code.into());
        self
    }

    /// Create a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::NetworkError, message)
    }

    /// Create an authentication error.
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::AuthenticationError, message)
    }

    /// Create a not found error.
    pub fn not_found(resource: &str) -> Self {
        Self::new(
            PaymentErrorCode::NotFound,
            format!("{} not found", resource),
        )
    }

    /// Create a provider error.
    pub fn provider(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::ProviderError, message)
    }
}

impl std::fmt::Display for PaymentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for PaymentError {}

/// Gateway failures surface to callers as upstream failures.
impl From<PaymentError> for BillingError {
    fn from(err: PaymentError) -> Self {
        BillingError::gateway_failed(err.to_string())
    }
}

/// Payment error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentErrorCode {
    /// Network connectivity issue.
    NetworkError,

    /// API authentication failed.
    AuthenticationError,

    /// Resource not found.
    NotFound,

    /// Rate limit exceeded.
    RateLimitExceeded,

    /// Provider API error.
    ProviderError,

    /// Unknown error.
    Unknown,
}

impl PaymentErrorCode {
    /// Check if this error type is typically retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PaymentErrorCode::NetworkError | PaymentErrorCode::RateLimitExceeded
        )
    }
}

impl std::fmt::Display for PaymentErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PaymentErrorCode::NetworkError => "network_error",
            PaymentErrorCode::AuthenticationError => "authentication_error",
            PaymentErrorCode::NotFound => "not_found",
            PaymentErrorCode::RateLimitExceeded => "rate_limit_exceeded",
            PaymentErrorCode::ProviderError => "provider_error",
            PaymentErrorCode::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}
