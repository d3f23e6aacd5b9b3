//! HTTP adapter for billing endpoints.
//!
//! Exposes the subscription lifecycle via REST API:
//! - `GET /api/subscription` - Get current user's subscription
//! - `GET /api/subscription/access` - Check if user has access
//! - `POST /api/subscription/cancel` - Cancel subscription
//! - `POST /api/subscription/change-plan` - Schedule a plan change
//! - `POST /api/subscription/refund` - Request a refund
//! - `POST /webhooks/pagarme` - Handle Pagar.me webhooks
//! - `GET /health` - Liveness probe

pub mod dto;
pub mod handlers;
pub mod routes;

pub use handlers::BillingAppState;
pub use routes::{billing_router, subscription_routes, webhook_routes};
