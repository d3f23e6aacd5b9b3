//! Data transfer objects for billing HTTP endpoints.
//!
//! Request DTOs deserialize the JSON bodies of the subscription API;
//! response DTOs serialize application results back to the client.
//! Timestamps are serialized as RFC 3339 strings.

use serde::{Deserialize, Serialize};

use crate::application::handlers::billing::{
    CancelSubscriptionResult, ChangePlanResult, CheckAccessResult, RequestRefundResult,
    StartCheckoutResult,
};
use crate::domain::billing::{PlanType, Subscription, SubscriptionStatus};
use crate::domain::foundation::{SubscriptionId, Timestamp};

// ════════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Request to start a checkout for a plan.
#[derive(Debug, Clone, Deserialize)]
pub struct StartCheckoutRequest {
    /// The plan to buy (monthly, quarterly or annual).
    pub plan_type: PlanType,
    /// Buyer display name; falls back to the auth token when absent.
    #[serde(default)]
    pub customer_name: Option<String>,
    /// Buyer CPF; formatting is stripped before it reaches the gateway.
    #[serde(default)]
    pub customer_document: Option<String>,
}

/// Request to cancel a subscription.
#[derive(Debug, Clone, Deserialize)]
pub struct CancelSubscriptionRequest {
    /// The subscription to cancel.
    pub subscription_id: SubscriptionId,
    /// Revoke access now instead of at the end of the paid period.
    #[serde(default)]
    pub cancel_immediately: bool,
}

/// Request to change the subscription plan.
#[derive(Debug, Clone, Deserialize)]
pub struct ChangePlanRequest {
    /// The subscription to change.
    pub subscription_id: SubscriptionId,
    /// The plan to switch to (monthly, quarterly or annual).
    pub new_plan_type: PlanType,
}

/// Request a refund for the latest paid transaction.
#[derive(Debug, Clone, Deserialize)]
pub struct RequestRefundRequest {
    /// The subscription to refund.
    pub subscription_id: SubscriptionId,
}

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Detailed subscription view for API responses.
#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionResponse {
    /// Subscription ID.
    pub id: String,
    /// Owner's user ID.
    pub user_id: String,
    /// Current lifecycle status.
    pub status: SubscriptionStatus,
    /// Plan currently billed.
    pub plan_type: PlanType,
    /// Plan queued for the next billing period (if any).
    pub pending_plan_type: Option<PlanType>,
    /// When the queued plan change takes effect (RFC 3339).
    pub pending_plan_change_at: Option<String>,
    /// Start of current billing period (RFC 3339).
    pub current_period_start: Option<String>,
    /// End of current billing period (RFC 3339).
    pub current_period_end: Option<String>,
    /// Whether the subscription cancels when the paid period runs out.
    pub cancel_at_period_end: bool,
    /// When the cancellation was recorded (RFC 3339).
    pub cancelled_at: Option<String>,
    /// Whether a refund can still be requested.
    pub refund_eligible: bool,
    /// Whether a refund has been requested.
    pub refund_requested: bool,
    /// When a refund was processed (RFC 3339).
    pub refund_processed_at: Option<String>,
    /// Amount billed per period, in BRL cents.
    pub amount_cents: i64,
    /// Pagar.me subscription ID once the gateway confirmed.
    pub gateway_subscription_id: Option<String>,
    /// When trial access for a pending subscription runs out (RFC 3339).
    pub trial_ends_at: Option<String>,
    /// Whether the subscription grants access right now.
    pub has_access: bool,
    /// Days until the current period ends (negative once past).
    pub days_remaining: i64,
    /// When the subscription was created (RFC 3339).
    pub created_at: String,
}

impl SubscriptionResponse {
    /// Build the response view. `has_access` and `days_remaining` are
    /// evaluated against the supplied clock.
    pub fn new(subscription: &Subscription, now: Timestamp) -> Self {
        Self {
            id: subscription.id.to_string(),
            user_id: subscription.user_id.to_string(),
            status: subscription.status,
            plan_type: subscription.plan_type,
            pending_plan_type: subscription.pending_plan_type,
            pending_plan_change_at: subscription.pending_plan_change_at.map(rfc3339),
            current_period_start: subscription.current_period_start.map(rfc3339),
            current_period_end: subscription.current_period_end.map(rfc3339),
            cancel_at_period_end: subscription.cancel_at_period_end,
            cancelled_at: subscription.cancelled_at.map(rfc3339),
            refund_eligible: subscription.refund_eligible,
            refund_requested: subscription.refund_requested,
            refund_processed_at: subscription.refund_processed_at.map(rfc3339),
            amount_cents: subscription.amount_cents,
            gateway_subscription_id: subscription.gateway_subscription_id.clone(),
            trial_ends_at: subscription.trial_ends_at.map(rfc3339),
            has_access: subscription.has_access(now),
            days_remaining: subscription.days_remaining(now),
            created_at: rfc3339(subscription.created_at),
        }
    }
}

/// Response for the access check endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct AccessResponse {
    /// Whether the user may use the platform.
    pub has_access: bool,
    /// True when access comes from the trial of a pending subscription.
    pub trial: bool,
    /// Days until the current period (or trial) ends.
    pub days_remaining: i64,
    /// Why access was granted or denied.
    pub reason: String,
}

impl From<CheckAccessResult> for AccessResponse {
    fn from(result: CheckAccessResult) -> Self {
        Self {
            has_access: result.has_access,
            trial: result.trial,
            days_remaining: result.days_remaining,
            reason: result.reason,
        }
    }
}

/// Response for a cancellation request.
#[derive(Debug, Clone, Serialize)]
pub struct CancelSubscriptionResponse {
    /// The cancelled subscription.
    pub subscription_id: String,
    /// Status after the cancellation.
    pub status: SubscriptionStatus,
    /// When access ends (RFC 3339).
    pub effective_at: String,
    /// True when the subscription was already cancelled and nothing changed.
    pub already_cancelled: bool,
}

impl From<CancelSubscriptionResult> for CancelSubscriptionResponse {
    fn from(result: CancelSubscriptionResult) -> Self {
        Self {
            subscription_id: result.subscription_id.to_string(),
            status: result.status,
            effective_at: rfc3339(result.effective_at),
            already_cancelled: result.already_cancelled,
        }
    }
}

/// Response for a started checkout.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutResponse {
    /// The pending subscription recording the purchase attempt.
    pub subscription_id: String,
    /// Gateway-hosted page the user completes the purchase on.
    pub checkout_url: String,
    /// Payment link id at the gateway.
    pub link_id: String,
}

impl From<StartCheckoutResult> for CheckoutResponse {
    fn from(result: StartCheckoutResult) -> Self {
        Self {
            subscription_id: result.subscription_id.to_string(),
            checkout_url: result.checkout_url,
            link_id: result.gateway_link_id,
        }
    }
}

/// Response for a scheduled plan change.
#[derive(Debug, Clone, Serialize)]
pub struct ChangePlanResponse {
    /// The subscription the change was scheduled for.
    pub subscription_id: String,
    /// Plan that keeps billing until the change takes effect.
    pub current_plan: PlanType,
    /// Plan that takes over at the next billing period.
    pub new_plan: PlanType,
    /// When the new plan takes effect (RFC 3339).
    pub effective_at: String,
}

impl From<ChangePlanResult> for ChangePlanResponse {
    fn from(result: ChangePlanResult) -> Self {
        Self {
            subscription_id: result.subscription_id.to_string(),
            current_plan: result.current_plan,
            new_plan: result.new_plan,
            effective_at: rfc3339(result.effective_at),
        }
    }
}

/// Response for a processed refund.
#[derive(Debug, Clone, Serialize)]
pub struct RefundResponse {
    /// The refunded subscription.
    pub subscription_id: String,
    /// Status after the refund (always cancelled).
    pub status: SubscriptionStatus,
    /// Amount returned, in BRL cents.
    pub amount_cents: i64,
    /// Days of the period consumed when the refund was requested.
    pub days_used: u32,
    /// When the refund was processed (RFC 3339).
    pub refunded_at: String,
}

impl From<RequestRefundResult> for RefundResponse {
    fn from(result: RequestRefundResult) -> Self {
        Self {
            subscription_id: result.subscription_id.to_string(),
            status: result.status,
            amount_cents: result.amount_cents,
            days_used: result.days_used,
            refunded_at: rfc3339(result.refunded_at),
        }
    }
}

/// Acknowledgement body for webhook deliveries.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookAckResponse {
    /// Always true; the gateway only checks the status code.
    pub received: bool,
}

/// Response for the health endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Service status, always "ok" when the server answers.
    pub status: &'static str,
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Response DTO
// ════════════════════════════════════════════════════════════════════════════════

/// Standard error response for API errors.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub error_code: String,
    /// Human-readable error message.
    pub message: String,
    /// Additional details (optional).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    /// Create a new error response.
    pub fn new(error_code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_code: error_code.into(),
            message: message.into(),
            details: None,
        }
    }

    /// Create an error response with details.
    pub fn with_details(
        error_code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error_code: error_code.into(),
            message: message.into(),
            details: Some(details),
        }
    }
}

fn rfc3339(ts: Timestamp) -> String {
    ts.as_datetime().to_rfc3339()
}
