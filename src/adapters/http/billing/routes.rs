//! Axum router configuration for billing endpoints.
//!
//! This module defines the route structure for the subscription API and
//! wires each route to its handler.

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{
    cancel_subscription, change_plan, check_access, get_subscription, handle_pagarme_webhook,
    health, request_refund, start_checkout, BillingAppState,
};

/// Create the subscription API router.
///
/// # Routes (all require authentication)
///
/// - `GET /` - Get current user's subscription
/// - `GET /access` - Check if user has access
/// - `POST /checkout` - Start a checkout, answering with a payment link
/// - `POST /cancel` - Cancel subscription (immediate or at period end)
/// - `POST /change-plan` - Schedule a plan change for the next period
/// - `POST /refund` - Request a refund inside the 8 day window
pub fn subscription_routes() -> Router<BillingAppState> {
    Router::new()
        .route("/", get(get_subscription))
        .route("/access", get(check_access))
        .route("/checkout", post(start_checkout))
        .route("/cancel", post(cancel_subscription))
        .route("/change-plan", post(change_plan))
        .route("/refund", post(request_refund))
}

/// Create the Pagar.me webhook router.
///
/// This is separate from the subscription routes because webhooks don't
/// carry user authentication (they're verified via signature).
///
/// # Routes
/// - `POST /pagarme` - Handle Pagar.me webhooks
pub fn webhook_routes() -> Router<BillingAppState> {
    Router::new().route("/pagarme", post(handle_pagarme_webhook))
}

/// Create the complete billing router.
///
/// Combines the subscription API, the webhook endpoint and the health
/// probe into a single router ready for middleware and state.
///
/// # Example
///
/// ```ignore
/// use axum::Router;
/// use crate::adapters::http::billing::{billing_router, BillingAppState};
///
/// let app_state = BillingAppState { /* ... */ };
/// let app = billing_router().with_state(app_state);
/// ```
pub fn billing_router() -> Router<BillingAppState> {
    Router::new()
        .nest("/api/subscription", subscription_routes())
        .nest("/webhooks", webhook_routes())
        .route("/health", get(health))
}
