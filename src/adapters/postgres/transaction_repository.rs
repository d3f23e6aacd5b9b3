//! PostgreSQL implementation of TransactionRepository.
//!
//! Stores the audit trail of gateway charge attempts.

use crate::domain::billing::{PaymentTransaction, TransactionStatus};
use crate::domain::foundation::{DomainError, ErrorCode, SubscriptionId, Timestamp, TransactionId, UserId};
use crate::ports::TransactionRepository;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

/// PostgreSQL implementation of the TransactionRepository port.
pub struct PostgresTransactionRepository {
    pool: PgPool,
}

impl PostgresTransactionRepository {
    /// Creates a new PostgresTransactionRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a payment transaction.
#[derive(Debug, sqlx::FromRow)]
struct TransactionRow {
    id: Uuid,
    subscription_id: Uuid,
    user_id: String,
    gateway_transaction_id: Option<String>,
    amount_cents: i64,
    status: String,
    payment_method: Option<String>,
    paid_at: Option<DateTime<Utc>>,
    failed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<TransactionRow> for PaymentTransaction {
    type Error = DomainError;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        Ok(PaymentTransaction {
            id: TransactionId::from_uuid(row.id),
            subscription_id: SubscriptionId::from_uuid(row.subscription_id),
            user_id: UserId::new(row.user_id).map_err(|e| {
                DomainError::new(ErrorCode::DatabaseError, format!("Invalid user_id: {}", e))
            })?,
            gateway_transaction_id: row.gateway_transaction_id,
            amount_cents: row.amount_cents,
            status: parse_transaction_status(&row.status)?,
            payment_method: row.payment_method,
            paid_at: row.paid_at.map(Timestamp::from_datetime),
            failed_at: row.failed_at.map(Timestamp::from_datetime),
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

fn parse_transaction_status(s: &str) -> Result<TransactionStatus, DomainError> {
    match s.to_lowercase().as_str() {
        "paid" => Ok(TransactionStatus::Paid),
        "refused" => Ok(TransactionStatus::Refused),
        "failed" => Ok(TransactionStatus::Failed),
        "refunded" => Ok(TransactionStatus::Refunded),
        _ => Err(DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid transaction status value: {}", s),
        )),
    }
}

fn transaction_status_to_string(status: &TransactionStatus) -> &'static str {
    match status {
        TransactionStatus::Paid => "paid",
        TransactionStatus::Refused => "refused",
        TransactionStatus::Failed => "failed",
        TransactionStatus::Refunded => "refunded",
    }
}

#[async_trait]
impl TransactionRepository for PostgresTransactionRepository {
    async fn save(&self, transaction: &PaymentTransaction) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO payment_transactions (
                id, subscription_id, user_id, gateway_transaction_id, amount_cents,
                status, payment_method, paid_at, failed_at, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(transaction.id.as_uuid())
        .bind(transaction.subscription_id.as_uuid())
        .bind(transaction.user_id.as_str())
        .bind(&transaction.gateway_transaction_id)
        .bind(transaction.amount_cents)
        .bind(transaction_status_to_string(&transaction.status))
        .bind(&transaction.payment_method)
        .bind(transaction.paid_at.map(|t| *t.as_datetime()))
        .bind(transaction.failed_at.map(|t| *t.as_datetime()))
        .bind(transaction.created_at.as_datetime())
        .bind(transaction.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to save transaction: {}", e),
            )
        })?;

        Ok(())
    }

    async fn update(&self, transaction: &PaymentTransaction) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE payment_transactions SET
                gateway_transaction_id = $2,
                amount_cents = $3,
                status = $4,
                payment_method = $5,
                paid_at = $6,
                failed_at = $7,
                updated_at = $8
            WHERE id = $1
            "#,
        )
        .bind(transaction.id.as_uuid())
        .bind(&transaction.gateway_transaction_id)
        .bind(transaction.amount_cents)
        .bind(transaction_status_to_string(&transaction.status))
        .bind(&transaction.payment_method)
        .bind(transaction.paid_at.map(|t| *t.as_datetime()))
        .bind(transaction.failed_at.map(|t| *t.as_datetime()))
        .bind(transaction.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to update transaction: {}", e),
            )
        })?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::TransactionNotFound,
                "Transaction not found",
            ));
        }

        Ok(())
    }

    async fn find_latest_paid_for_subscription(
        &self,
        subscription_id: &SubscriptionId,
    ) -> Result<Option<PaymentTransaction>, DomainError> {
        let row: Option<TransactionRow> = sqlx::query_as(
            r#"
            SELECT id, subscription_id, user_id, gateway_transaction_id, amount_cents,
                   status, payment_method, paid_at, failed_at, created_at, updated_at
            FROM payment_transactions
            WHERE subscription_id = $1 AND status = 'paid'
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(subscription_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to find paid transaction: {}", e),
            )
        })?;

        row.map(PaymentTransaction::try_from).transpose()
    }
}
