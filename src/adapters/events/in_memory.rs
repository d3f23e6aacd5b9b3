//! In-memory event bus.
//!
//! Fans envelopes out on a `tokio::sync::broadcast` channel, which suits
//! the single-process deployment this service runs as. A broker-backed
//! adapter can replace it behind the `EventPublisher` port without touching
//! handlers.

use async_trait::async_trait;
use std::sync::RwLock;
use tokio::sync::broadcast;

use crate::domain::foundation::{DomainError, EventEnvelope};
use crate::ports::EventPublisher;

/// Subscribers lagging behind this many events see `RecvError::Lagged`
/// and skip ahead; publishing itself never blocks.
const CHANNEL_CAPACITY: usize = 256;

pub struct InMemoryEventBus {
    sender: broadcast::Sender<EventEnvelope>,
    capture: bool,
    published: RwLock<Vec<EventEnvelope>>,
}

impl InMemoryEventBus {
    /// Broadcast-only bus for production wiring.
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            sender,
            capture: false,
            published: RwLock::new(Vec::new()),
        }
    }

    /// Bus that also records every published envelope. The capture list
    /// grows without bound, so this is for tests only.
    pub fn capturing() -> Self {
        Self {
            capture: true,
            ..Self::new()
        }
    }

    /// Each receiver sees every event published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.sender.subscribe()
    }

    /// Captured envelopes, in publish order. Empty unless built with
    /// [`capturing`](Self::capturing).
    pub fn published_events(&self) -> Vec<EventEnvelope> {
        self.published
            .read()
            .expect("InMemoryEventBus: published lock poisoned")
            .clone()
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventBus {
    async fn publish(&self, event: EventEnvelope) -> Result<(), DomainError> {
        if self.capture {
            self.published
                .write()
                .expect("InMemoryEventBus: published write lock poisoned")
                .push(event.clone());
        }

        // A send error only means nobody is subscribed right now
        let _ = self.sender.send(event);

        Ok(())
    }
}
