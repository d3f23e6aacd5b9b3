//! Outbound port for domain events.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, EventEnvelope};

/// Transport-agnostic event publishing. Handlers build an [`EventEnvelope`]
/// via `to_envelope()` and hand it here; the adapter decides delivery.
///
/// Delivery is at-least-once, so consumers must tolerate duplicates
/// (the envelope's `event_id` supports deduplication).
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: EventEnvelope) -> Result<(), DomainError>;

    /// Sequential best-effort batch publish. Stops at the first failure;
    /// already-published events are not retracted.
    async fn publish_all(&self, events: Vec<EventEnvelope>) -> Result<(), DomainError> {
        for event in events {
            self.publish(event).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[allow(dead_code)]
    fn assert_object_safe(_: &dyn EventPublisher) {}
}
