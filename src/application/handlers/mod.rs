//! Application handlers.
//!
//! Command and query handlers that orchestrate domain operations.

pub mod billing;

pub use billing::{
    // Commands and Results
    ApplyDuePlanChangesCommand,
    ApplyDuePlanChangesHandler,
    ApplyDuePlanChangesResult,
    CancelSubscriptionCommand,
    CancelSubscriptionHandler,
    CancelSubscriptionResult,
    ChangePlanCommand,
    ChangePlanHandler,
    ChangePlanResult,
    ProcessWebhookCommand,
    ProcessWebhookHandler,
    RequestRefundCommand,
    RequestRefundHandler,
    RequestRefundResult,
    // Queries
    CheckAccessHandler,
    CheckAccessQuery,
    CheckAccessResult,
    GetSubscriptionHandler,
    GetSubscriptionQuery,
    GetSubscriptionResult,
};
