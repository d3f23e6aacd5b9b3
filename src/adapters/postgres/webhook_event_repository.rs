//! PostgreSQL implementation of WebhookEventRepository.
//!
//! Relies on the primary key on event_id so that concurrent deliveries of
//! the same webhook race safely at the database instead of in application
//! code.

use crate::domain::foundation::{DomainError, ErrorCode, Timestamp};
use crate::ports::{SaveResult, WebhookEventRecord, WebhookEventRepository};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

/// PostgreSQL implementation of the WebhookEventRepository port.
pub struct PostgresWebhookEventRepository {
    pool: PgPool,
}

impl PostgresWebhookEventRepository {
    /// Creates a new PostgresWebhookEventRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a processed webhook event.
#[derive(Debug, sqlx::FromRow)]
struct WebhookEventRow {
    event_id: String,
    event_type: String,
    processed_at: DateTime<Utc>,
    result: String,
    error_message: Option<String>,
    payload: serde_json::Value,
}

impl From<WebhookEventRow> for WebhookEventRecord {
    fn from(row: WebhookEventRow) -> Self {
        WebhookEventRecord {
            event_id: row.event_id,
            event_type: row.event_type,
            processed_at: Timestamp::from_datetime(row.processed_at),
            result: row.result,
            error_message: row.error_message,
            payload: row.payload,
        }
    }
}

#[async_trait]
impl WebhookEventRepository for PostgresWebhookEventRepository {
    async fn find_by_event_id(
        &self,
        event_id: &str,
    ) -> Result<Option<WebhookEventRecord>, DomainError> {
        let row: Option<WebhookEventRow> = sqlx::query_as(
            r#"
            SELECT event_id, event_type, processed_at, result, error_message, payload
            FROM webhook_events
            WHERE event_id = $1
            "#,
        )
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to find webhook event: {}", e),
            )
        })?;

        Ok(row.map(WebhookEventRecord::from))
    }

    async fn save(&self, record: WebhookEventRecord) -> Result<SaveResult, DomainError> {
        let result = sqlx::query(
            r#"
            INSERT INTO webhook_events (
                event_id, event_type, processed_at, result, error_message, payload
            ) VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (event_id) DO NOTHING
            "#,
        )
        .bind(&record.event_id)
        .bind(&record.event_type)
        .bind(record.processed_at.as_datetime())
        .bind(&record.result)
        .bind(&record.error_message)
        .bind(&record.payload)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to save webhook event: {}", e),
            )
        })?;

        // Zero rows means another delivery of the same event got there first
        if result.rows_affected() == 0 {
            Ok(SaveResult::AlreadyExists)
        } else {
            Ok(SaveResult::Inserted)
        }
    }

    async fn delete_before(&self, cutoff: Timestamp) -> Result<u64, DomainError> {
        let result = sqlx::query("DELETE FROM webhook_events WHERE processed_at < $1")
            .bind(cutoff.as_datetime())
            .execute(&self.pool)
            .await
            .map_err(|e| {
                DomainError::new(
                    ErrorCode::DatabaseError,
                    format!("Failed to delete webhook events: {}", e),
                )
            })?;

        Ok(result.rows_affected())
    }
}
