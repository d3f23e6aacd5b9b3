//! Domain event infrastructure.
//!
//! Billing state changes are announced as domain events wrapped in an
//! `EventEnvelope` for transport:
//! - `EventId` - unique identifier for deduplication
//! - `EventMetadata` - correlation context attached by the publisher
//! - `EventEnvelope` - transport wrapper carrying the serialized payload
//! - `DomainEvent` - trait every billing event implements

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use uuid::Uuid;

use super::Timestamp;

/// Contract every domain event implements: identification, routing,
/// ordering, and versioning.
///
/// Events that also implement `Serialize` get `to_envelope()` for free
/// through the `SerializableDomainEvent` blanket impl.
pub trait DomainEvent: Send + Sync {
    /// Event type string used for routing (e.g., "billing.cancelled").
    fn event_type(&self) -> &'static str;

    /// Schema version of the payload.
    fn schema_version(&self) -> u32;

    /// ID of the aggregate that emitted this event.
    fn aggregate_id(&self) -> String;

    /// Kind of aggregate (e.g., "Subscription").
    fn aggregate_type(&self) -> &'static str;

    /// When the state change happened.
    fn occurred_at(&self) -> Timestamp;

    /// Unique ID of this event instance.
    fn event_id(&self) -> EventId;
}

/// Extension trait providing `to_envelope()` for serializable events.
pub trait SerializableDomainEvent: DomainEvent + Serialize {
    /// Wraps this event in an `EventEnvelope`, serializing it as the payload.
    fn to_envelope(&self) -> EventEnvelope {
        EventEnvelope {
            event_id: self.event_id(),
            event_type: self.event_type().to_string(),
            schema_version: self.schema_version(),
            aggregate_id: self.aggregate_id(),
            aggregate_type: self.aggregate_type().to_string(),
            occurred_at: self.occurred_at(),
            payload: serde_json::to_value(self)
                .expect("event serialization cannot fail for well-formed events"),
            metadata: EventMetadata::default(),
        }
    }
}

impl<T: DomainEvent + Serialize> SerializableDomainEvent for T {}

/// Unique identifier for events, used for deduplication downstream.
///
/// Stored as a String rather than a Uuid so webhook-driven events can
/// reuse the gateway's own event id format.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(String);

impl EventId {
    /// Creates a new random EventId (UUID v4).
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Wraps an existing identifier string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Correlation context attached to an envelope by the publisher.
///
/// `correlation_id` carries the gateway webhook event id for
/// webhook-driven state changes; `user_id` is set on user-initiated
/// commands for auditing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMetadata {
    /// Links this event to the request or webhook delivery that caused it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,

    /// User who initiated the action, when there is one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

/// Transport envelope wrapping a serialized domain event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Unique ID for this event instance.
    pub event_id: EventId,

    /// Event type for routing (e.g., "billing.refund_processed").
    pub event_type: String,

    /// Payload schema version.
    pub schema_version: u32,

    /// ID of the aggregate that emitted this event.
    pub aggregate_id: String,

    /// Kind of aggregate (e.g., "Subscription").
    pub aggregate_type: String,

    /// When the state change happened.
    pub occurred_at: Timestamp,

    /// Event-specific payload as JSON.
    pub payload: JsonValue,

    /// Correlation metadata.
    pub metadata: EventMetadata,
}

impl EventEnvelope {
    /// Attaches the id of the request or webhook delivery that caused
    /// this event.
    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.metadata.correlation_id = Some(id.into());
        self
    }

    /// Attaches the acting user for audit trails.
    pub fn with_user_id(mut self, id: impl Into<String>) -> Self {
        self.metadata.user_id = Some(id.into());
        self
    }
}
