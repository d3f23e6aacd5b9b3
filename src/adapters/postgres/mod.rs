//! PostgreSQL adapters - Database implementations for repository ports.
//!
//! This module provides adapters for PostgreSQL-backed persistence:
//! - `PostgresSubscriptionRepository` - Subscription rows with optimistic locking
//! - `PostgresTransactionRepository` - Payment transaction audit trail
//! - `PostgresWebhookEventRepository` - Processed webhook events for idempotency

mod subscription_repository;
mod transaction_repository;
mod webhook_event_repository;

pub use subscription_repository::PostgresSubscriptionRepository;
pub use transaction_repository::PostgresTransactionRepository;
pub use webhook_event_repository::PostgresWebhookEventRepository;
