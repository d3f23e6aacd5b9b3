//! Billing domain module.
//!
//! Handles the subscription lifecycle, plan changes, refunds, access
//! gating, and Pagar.me webhook events.
//!
//! # Module Structure
//!
//! - `aggregate` - Subscription aggregate entity
//! - `status` - SubscriptionStatus state machine
//! - `plan` - PlanType catalog and pricing
//! - `refund` - Refund window eligibility
//! - `transaction` - Payment transaction records
//! - `errors` - Billing error taxonomy
//! - `events` - Domain events emitted on state changes
//! - `gateway_event` - Pagar.me webhook event payloads
//! - `webhook_errors` - Webhook processing errors
//! - `webhook_verifier` - Webhook signature verification

mod aggregate;
mod errors;
mod events;
mod gateway_event;
mod plan;
mod refund;
mod status;
mod transaction;
mod webhook_errors;
mod webhook_verifier;

pub use aggregate::{RenewalOutcome, Subscription, TRIAL_PERIOD_DAYS};
pub use errors::BillingError;
pub use events::{BillingEvent, ExpiredReason};
pub use gateway_event::{
    ChargeData, CheckoutMetadata, InvoiceData, OrderData, PagarmeEvent, PagarmeEventType,
    SubscriptionData,
};
pub use plan::PlanType;
pub use refund::{RefundEligibility, REFUND_WINDOW_DAYS};
pub use status::SubscriptionStatus;
pub use transaction::{PaymentTransaction, TransactionStatus};
pub use webhook_errors::WebhookError;
pub use webhook_verifier::PagarmeWebhookVerifier;

#[cfg(test)]
pub use gateway_event::PagarmeEventBuilder;
#[cfg(test)]
pub use webhook_verifier::compute_test_signature;
