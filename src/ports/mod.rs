//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Persistence Ports
//!
//! - `SubscriptionRepository` - Subscription aggregate persistence
//! - `TransactionRepository` - Payment transaction records
//! - `WebhookEventRepository` - Pagar.me webhook idempotency tracking
//!
//! ## Integration Ports
//!
//! - `PaymentGateway` - Outbound Pagar.me calls (checkout, cancel, refund)
//! - `TokenVerifier` - Bearer token validation
//! - `EventPublisher` - Domain event publishing

mod event_publisher;
mod payment_gateway;
mod subscription_repository;
mod token_verifier;
mod transaction_repository;
mod webhook_event_repository;

pub use event_publisher::EventPublisher;
pub use payment_gateway::{
    CancellationOutcome, CheckoutCustomer, CheckoutRequest, CheckoutSession, PaymentError,
    PaymentErrorCode, PaymentGateway,
};
pub use subscription_repository::SubscriptionRepository;
pub use token_verifier::TokenVerifier;
pub use transaction_repository::TransactionRepository;
pub use webhook_event_repository::{
    SaveResult, WebhookEventRecord, WebhookEventRepository, WebhookResult,
};
