//! Idempotency ledger for Pagar.me webhook deliveries.
//!
//! The gateway redelivers events on timeouts and 5xx responses, so every
//! processed delivery is recorded by its gateway event id together with
//! the outcome and the raw payload. Handlers consult the ledger before
//! doing any work and acknowledge replays without reprocessing.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, Timestamp};

/// One processed webhook delivery.
#[derive(Debug, Clone)]
pub struct WebhookEventRecord {
    /// Gateway event id (hook_xxx format), the ledger key.
    pub event_id: String,

    /// Event type string (e.g., "order.paid").
    pub event_type: String,

    pub processed_at: Timestamp,

    /// "success", "ignored", or "failed".
    pub result: String,

    /// Ignore reason or failure message.
    pub error_message: Option<String>,

    /// Raw event payload, kept for auditing.
    pub payload: serde_json::Value,
}

impl WebhookEventRecord {
    pub fn success(
        event_id: impl Into<String>,
        event_type: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self::record(event_id, event_type, "success", None, payload)
    }

    pub fn ignored(
        event_id: impl Into<String>,
        event_type: impl Into<String>,
        reason: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self::record(event_id, event_type, "ignored", Some(reason.into()), payload)
    }

    pub fn failed(
        event_id: impl Into<String>,
        event_type: impl Into<String>,
        error: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self::record(event_id, event_type, "failed", Some(error.into()), payload)
    }

    fn record(
        event_id: impl Into<String>,
        event_type: impl Into<String>,
        result: &str,
        error_message: Option<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            event_id: event_id.into(),
            event_type: event_type.into(),
            processed_at: Timestamp::now(),
            result: result.to_string(),
            error_message,
            payload,
        }
    }
}

/// Outcome of inserting into the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveResult {
    /// First time this event id was seen.
    Inserted,
    /// A concurrent delivery recorded it first.
    AlreadyExists,
}

/// Ledger port.
///
/// Implementations must make `save` race-safe under concurrent deliveries
/// of the same event; the Postgres adapter leans on the primary key with
/// `ON CONFLICT DO NOTHING`.
#[async_trait]
pub trait WebhookEventRepository: Send + Sync {
    /// Looks up a delivery by gateway event id. `None` means unprocessed.
    async fn find_by_event_id(
        &self,
        event_id: &str,
    ) -> Result<Option<WebhookEventRecord>, DomainError>;

    /// Records a delivery, keeping the first record when two race.
    async fn save(&self, record: WebhookEventRecord) -> Result<SaveResult, DomainError>;

    /// Prunes records processed before `cutoff`; returns how many.
    async fn delete_before(&self, cutoff: Timestamp) -> Result<u64, DomainError>;
}

/// What the webhook endpoint reports back to the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookResult {
    Processed,
    /// Replay of an already-recorded delivery.
    AlreadyProcessed,
}
