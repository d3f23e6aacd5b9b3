//! Foundation module - Shared domain primitives.
//!
//! Contains value objects, identifiers, auth types, event infrastructure,
//! and error types that form the vocabulary of the billing domain.

mod auth;
mod errors;
mod events;
mod ids;
mod state_machine;
mod timestamp;

pub use auth::{AuthError, AuthenticatedUser};
pub use errors::{DomainError, ErrorCode, ValidationError};
pub use events::{
    DomainEvent, EventEnvelope, EventId, EventMetadata, SerializableDomainEvent,
};
pub use ids::{SubscriptionId, TransactionId, UserId};
pub use state_machine::StateMachine;
pub use timestamp::Timestamp;
