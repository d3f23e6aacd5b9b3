//! Mock payment gateway for testing.
//!
//! Provides a configurable mock implementation of `PaymentGateway` for unit
//! and integration tests. Supports:
//! - Configurable cancellation outcomes
//! - Error injection per method
//! - Call tracking

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::ports::{
    CancellationOutcome, CheckoutRequest, CheckoutSession, PaymentError, PaymentGateway,
};

/// Mock payment gateway for testing.
///
/// # Example
///
/// ```ignore
/// let mock = MockPaymentGateway::new();
///
/// // Inject errors
/// mock.set_cancel_error(PaymentError::network("Connection refused"));
///
/// // Use in tests
/// let result = mock.cancel_subscription("sub_123").await;
/// assert_eq!(mock.cancelled_subscriptions(), Vec::<String>::new());
/// ```
#[derive(Default)]
pub struct MockPaymentGateway {
    /// Inner state (thread-safe for async tests).
    inner: Arc<Mutex<MockState>>,
}

/// Internal mutable state.
#[derive(Default)]
struct MockState {
    /// Session to report for checkouts (defaults to a generated link).
    checkout_session: Option<CheckoutSession>,

    /// Error to return on the next `create_checkout` call.
    checkout_error: Option<PaymentError>,

    /// Checkout requests recorded so far.
    checkouts: Vec<CheckoutRequest>,

    /// Outcome to report for cancellations (defaults to `Cancelled`).
    cancel_outcome: Option<CancellationOutcome>,

    /// Error to return on the next `cancel_subscription` call.
    cancel_error: Option<PaymentError>,

    /// Error to return on the next `refund_transaction` call.
    refund_error: Option<PaymentError>,

    /// Subscription ids passed to `cancel_subscription`.
    cancelled_subscriptions: Vec<String>,

    /// Recorded refund calls.
    refunds: Vec<RefundCall>,
}

/// Recorded refund call for assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefundCall {
    pub gateway_transaction_id: String,
    pub amount_cents: i64,
}

impl MockPaymentGateway {
    /// Create a new mock gateway with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the session reported by `create_checkout`.
    pub fn set_checkout_session(&self, session: CheckoutSession) {
        self.inner.lock().unwrap().checkout_session = Some(session);
    }

    /// Set an error to return on the next `create_checkout` call.
    pub fn set_checkout_error(&self, error: PaymentError) {
        self.inner.lock().unwrap().checkout_error = Some(error);
    }

    /// Checkout requests recorded so far.
    pub fn checkouts(&self) -> Vec<CheckoutRequest> {
        self.inner.lock().unwrap().checkouts.clone()
    }

    /// Set the outcome reported by `cancel_subscription`.
    pub fn set_cancel_outcome(&self, outcome: CancellationOutcome) {
        self.inner.lock().unwrap().cancel_outcome = Some(outcome);
    }

    /// Set an error to return on the next `cancel_subscription` call.
    pub fn set_cancel_error(&self, error: PaymentError) {
        self.inner.lock().unwrap().cancel_error = Some(error);
    }

    /// Set an error to return on the next `refund_transaction` call.
    pub fn set_refund_error(&self, error: PaymentError) {
        self.inner.lock().unwrap().refund_error = Some(error);
    }

    /// Subscription ids cancelled so far.
    pub fn cancelled_subscriptions(&self) -> Vec<String> {
        self.inner.lock().unwrap().cancelled_subscriptions.clone()
    }

    /// Refund calls recorded so far.
    pub fn refunds(&self) -> Vec<RefundCall> {
        self.inner.lock().unwrap().refunds.clone()
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn create_checkout(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutSession, PaymentError> {
        let mut state = self.inner.lock().unwrap();

        if let Some(error) = state.checkout_error.take() {
            return Err(error);
        }

        state.checkouts.push(request.clone());

        let n = state.checkouts.len();
        Ok(state.checkout_session.clone().unwrap_or(CheckoutSession {
            gateway_link_id: format!("pl_mock_{}", n),
            checkout_url: format!("https://mock.pagar.me/links/pl_mock_{}", n),
        }))
    }

    async fn cancel_subscription(
        &self,
        gateway_subscription_id: &str,
    ) -> Result<CancellationOutcome, PaymentError> {
        let mut state = self.inner.lock().unwrap();

        if let Some(error) = state.cancel_error.take() {
            return Err(error);
        }

        state
            .cancelled_subscriptions
            .push(gateway_subscription_id.to_string());

        Ok(state
            .cancel_outcome
            .unwrap_or(CancellationOutcome::Cancelled))
    }

    async fn refund_transaction(
        &self,
        gateway_transaction_id: &str,
        amount_cents: i64,
    ) -> Result<(), PaymentError> {
        let mut state = self.inner.lock().unwrap();

        if let Some(error) = state.refund_error.take() {
            return Err(error);
        }

        state.refunds.push(RefundCall {
            gateway_transaction_id: gateway_transaction_id.to_string(),
            amount_cents,
        });

        Ok(())
    }
}
