//! Billing handlers.
//!
//! Command and query handlers for the subscription lifecycle including:
//!
//! ## Commands
//! - Starting a checkout (hosted payment link + pending row)
//! - Cancelling subscriptions (immediate or at period end)
//! - Scheduling plan changes for the next billing period
//! - Processing refund requests inside the 8-day window
//! - Applying Pagar.me webhook events
//! - Sweeping plan changes whose effective date arrived
//!
//! ## Queries
//! - Get subscription details
//! - Check user access

mod apply_due_plan_changes;
mod cancel_subscription;
mod change_plan;
mod check_access;
mod get_subscription;
mod process_webhook;
mod request_refund;
mod start_checkout;

// Commands
pub use apply_due_plan_changes::{
    ApplyDuePlanChangesCommand, ApplyDuePlanChangesHandler, ApplyDuePlanChangesResult,
};
pub use cancel_subscription::{
    CancelSubscriptionCommand, CancelSubscriptionHandler, CancelSubscriptionResult,
};
pub use change_plan::{ChangePlanCommand, ChangePlanHandler, ChangePlanResult};
pub use process_webhook::{ProcessWebhookCommand, ProcessWebhookHandler};
pub use request_refund::{RequestRefundCommand, RequestRefundHandler, RequestRefundResult};
pub use start_checkout::{StartCheckoutCommand, StartCheckoutHandler, StartCheckoutResult};

// Queries
pub use check_access::{CheckAccessHandler, CheckAccessQuery, CheckAccessResult};
pub use get_subscription::{GetSubscriptionHandler, GetSubscriptionQuery, GetSubscriptionResult};
