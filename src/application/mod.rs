//! Application layer - Commands, Queries, and Handlers.
//!
//! This layer orchestrates domain operations and coordinates between ports.
//! Following CQRS, it separates command handlers (write) from query handlers (read).

pub mod handlers;

pub use handlers::{
    // Billing commands
    ApplyDuePlanChangesCommand, ApplyDuePlanChangesHandler, ApplyDuePlanChangesResult,
    CancelSubscriptionCommand, CancelSubscriptionHandler, CancelSubscriptionResult,
    ChangePlanCommand, ChangePlanHandler, ChangePlanResult,
    ProcessWebhookCommand, ProcessWebhookHandler,
    RequestRefundCommand, RequestRefundHandler, RequestRefundResult,
    // Billing queries
    CheckAccessHandler, CheckAccessQuery, CheckAccessResult,
    GetSubscriptionHandler, GetSubscriptionQuery, GetSubscriptionResult,
};
