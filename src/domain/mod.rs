//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (value objects, IDs, enums, errors)
//! - `billing` - Subscription lifecycle, plan changes, refunds, and webhooks

pub mod billing;
pub mod foundation;
