//! PostgreSQL implementation of SubscriptionRepository.
//!
//! Provides persistent storage for Subscription aggregates using PostgreSQL.

use crate::domain::billing::{PlanType, Subscription, SubscriptionStatus};
use crate::domain::foundation::{DomainError, ErrorCode, SubscriptionId, Timestamp, UserId};
use crate::ports::SubscriptionRepository;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

/// PostgreSQL implementation of the SubscriptionRepository port.
///
/// Uses sqlx for type-safe database operations with connection pooling.
/// Updates are conditional on the row version, so a lost race surfaces as
/// a concurrency error instead of silently overwriting.
pub struct PostgresSubscriptionRepository {
    pool: PgPool,
}

impl PostgresSubscriptionRepository {
    /// Creates a new PostgresSubscriptionRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a subscription.
#[derive(Debug, sqlx::FromRow)]
struct SubscriptionRow {
    id: Uuid,
    user_id: String,
    status: String,
    plan_type: String,
    pending_plan_type: Option<String>,
    pending_plan_change_at: Option<DateTime<Utc>>,
    current_period_start: Option<DateTime<Utc>>,
    current_period_end: Option<DateTime<Utc>>,
    cancel_at_period_end: bool,
    cancelled_at: Option<DateTime<Utc>>,
    refund_eligible: bool,
    refund_requested: bool,
    refund_processed_at: Option<DateTime<Utc>>,
    amount_cents: i64,
    gateway_subscription_id: Option<String>,
    trial_ends_at: Option<DateTime<Utc>>,
    days_used: i32,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<SubscriptionRow> for Subscription {
    type Error = DomainError;

    fn try_from(row: SubscriptionRow) -> Result<Self, Self::Error> {
        let status = parse_status(&row.status)?;
        let plan_type = parse_plan(&row.plan_type)?;
        let pending_plan_type = row.pending_plan_type.as_deref().map(parse_plan).transpose()?;

        Ok(Subscription {
            id: SubscriptionId::from_uuid(row.id),
            user_id: UserId::new(row.user_id).map_err(|e| {
                DomainError::new(ErrorCode::DatabaseError, format!("Invalid user_id: {}", e))
            })?,
            status,
            plan_type,
            pending_plan_type,
            pending_plan_change_at: row.pending_plan_change_at.map(Timestamp::from_datetime),
            current_period_start: row.current_period_start.map(Timestamp::from_datetime),
            current_period_end: row.current_period_end.map(Timestamp::from_datetime),
            cancel_at_period_end: row.cancel_at_period_end,
            cancelled_at: row.cancelled_at.map(Timestamp::from_datetime),
            refund_eligible: row.refund_eligible,
            refund_requested: row.refund_requested,
            refund_processed_at: row.refund_processed_at.map(Timestamp::from_datetime),
            amount_cents: row.amount_cents,
            gateway_subscription_id: row.gateway_subscription_id,
            trial_ends_at: row.trial_ends_at.map(Timestamp::from_datetime),
            days_used: u32::try_from(row.days_used).map_err(|_| {
                DomainError::new(
                    ErrorCode::DatabaseError,
                    format!("Invalid days_used value: {}", row.days_used),
                )
            })?,
            version: row.version,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

fn parse_status(s: &str) -> Result<SubscriptionStatus, DomainError> {
    match s.to_lowercase().as_str() {
        "pending" => Ok(SubscriptionStatus::Pending),
        "active" => Ok(SubscriptionStatus::Active),
        "cancelled" => Ok(SubscriptionStatus::Cancelled),
        "expired" => Ok(SubscriptionStatus::Expired),
        "suspended" => Ok(SubscriptionStatus::Suspended),
        _ => Err(DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid status value: {}", s),
        )),
    }
}

fn status_to_string(status: &SubscriptionStatus) -> &'static str {
    match status {
        SubscriptionStatus::Pending => "pending",
        SubscriptionStatus::Active => "active",
        SubscriptionStatus::Cancelled => "cancelled",
        SubscriptionStatus::Expired => "expired",
        SubscriptionStatus::Suspended => "suspended",
    }
}

fn parse_plan(s: &str) -> Result<PlanType, DomainError> {
    match s.to_lowercase().as_str() {
        "monthly" => Ok(PlanType::Monthly),
        "quarterly" => Ok(PlanType::Quarterly),
        "annual" => Ok(PlanType::Annual),
        _ => Err(DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid plan_type value: {}", s),
        )),
    }
}

fn plan_to_string(plan: &PlanType) -> &'static str {
    match plan {
        PlanType::Monthly => "monthly",
        PlanType::Quarterly => "quarterly",
        PlanType::Annual => "annual",
    }
}

const SELECT_COLUMNS: &str = r#"
    SELECT id, user_id, status, plan_type, pending_plan_type, pending_plan_change_at,
           current_period_start, current_period_end, cancel_at_period_end, cancelled_at,
           refund_eligible, refund_requested, refund_processed_at, amount_cents,
           gateway_subscription_id, trial_ends_at, days_used, version, created_at, updated_at
    FROM subscriptions
"#;

#[async_trait]
impl SubscriptionRepository for PostgresSubscriptionRepository {
    async fn save(&self, subscription: &Subscription) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO subscriptions (
                id, user_id, status, plan_type, pending_plan_type, pending_plan_change_at,
                current_period_start, current_period_end, cancel_at_period_end, cancelled_at,
                refund_eligible, refund_requested, refund_processed_at, amount_cents,
                gateway_subscription_id, trial_ends_at, days_used, version, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20)
            "#,
        )
        .bind(subscription.id.as_uuid())
        .bind(subscription.user_id.as_str())
        .bind(status_to_string(&subscription.status))
        .bind(plan_to_string(&subscription.plan_type))
        .bind(subscription.pending_plan_type.as_ref().map(plan_to_string))
        .bind(subscription.pending_plan_change_at.map(|t| *t.as_datetime()))
        .bind(subscription.current_period_start.map(|t| *t.as_datetime()))
        .bind(subscription.current_period_end.map(|t| *t.as_datetime()))
        .bind(subscription.cancel_at_period_end)
        .bind(subscription.cancelled_at.map(|t| *t.as_datetime()))
        .bind(subscription.refund_eligible)
        .bind(subscription.refund_requested)
        .bind(subscription.refund_processed_at.map(|t| *t.as_datetime()))
        .bind(subscription.amount_cents)
        .bind(&subscription.gateway_subscription_id)
        .bind(subscription.trial_ends_at.map(|t| *t.as_datetime()))
        .bind(subscription.days_used as i32)
        .bind(subscription.version)
        .bind(subscription.created_at.as_datetime())
        .bind(subscription.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.constraint() == Some("subscriptions_user_id_key") {
                    return DomainError::new(
                        ErrorCode::ValidationFailed,
                        "User already has a subscription",
                    );
                }
            }
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to save subscription: {}", e),
            )
        })?;

        Ok(())
    }

    async fn update(&self, subscription: &Subscription) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE subscriptions SET
                status = $3,
                plan_type = $4,
                pending_plan_type = $5,
                pending_plan_change_at = $6,
                current_period_start = $7,
                current_period_end = $8,
                cancel_at_period_end = $9,
                cancelled_at = $10,
                refund_eligible = $11,
                refund_requested = $12,
                refund_processed_at = $13,
                amount_cents = $14,
                gateway_subscription_id = $15,
                trial_ends_at = $16,
                days_used = $17,
                updated_at = $18,
                version = version + 1
            WHERE id = $1 AND version = $2
            "#,
        )
        .bind(subscription.id.as_uuid())
        .bind(subscription.version)
        .bind(status_to_string(&subscription.status))
        .bind(plan_to_string(&subscription.plan_type))
        .bind(subscription.pending_plan_type.as_ref().map(plan_to_string))
        .bind(subscription.pending_plan_change_at.map(|t| *t.as_datetime()))
        .bind(subscription.current_period_start.map(|t| *t.as_datetime()))
        .bind(subscription.current_period_end.map(|t| *t.as_datetime()))
        .bind(subscription.cancel_at_period_end)
        .bind(subscription.cancelled_at.map(|t| *t.as_datetime()))
        .bind(subscription.refund_eligible)
        .bind(subscription.refund_requested)
        .bind(subscription.refund_processed_at.map(|t| *t.as_datetime()))
        .bind(subscription.amount_cents)
        .bind(&subscription.gateway_subscription_id)
        .bind(subscription.trial_ends_at.map(|t| *t.as_datetime()))
        .bind(subscription.days_used as i32)
        .bind(subscription.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to update subscription: {}", e),
            )
        })?;

        // Zero rows means the version moved underneath us (or the row is gone)
        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::ConcurrentModification,
                "Subscription was modified concurrently",
            ));
        }

        Ok(())
    }

    async fn find_by_id(&self, id: &SubscriptionId) -> Result<Option<Subscription>, DomainError> {
        let row: Option<SubscriptionRow> =
            sqlx::query_as(&format!("{} WHERE id = $1", SELECT_COLUMNS))
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| {
                    DomainError::new(
                        ErrorCode::DatabaseError,
                        format!("Failed to find subscription: {}", e),
                    )
                })?;

        row.map(Subscription::try_from).transpose()
    }

    async fn find_by_user_id(&self, user_id: &UserId) -> Result<Option<Subscription>, DomainError> {
        let row: Option<SubscriptionRow> =
            sqlx::query_as(&format!("{} WHERE user_id = $1", SELECT_COLUMNS))
                .bind(user_id.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| {
                    DomainError::new(
                        ErrorCode::DatabaseError,
                        format!("Failed to find subscription: {}", e),
                    )
                })?;

        row.map(Subscription::try_from).transpose()
    }

    async fn find_pending_by_user_id(
        &self,
        user_id: &UserId,
    ) -> Result<Option<Subscription>, DomainError> {
        let row: Option<SubscriptionRow> = sqlx::query_as(&format!(
            "{} WHERE user_id = $1 AND status = 'pending'",
            SELECT_COLUMNS
        ))
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to find pending subscription: {}", e),
            )
        })?;

        row.map(Subscription::try_from).transpose()
    }

    async fn find_by_gateway_subscription_id(
        &self,
        gateway_id: &str,
    ) -> Result<Option<Subscription>, DomainError> {
        let row: Option<SubscriptionRow> = sqlx::query_as(&format!(
            "{} WHERE gateway_subscription_id = $1",
            SELECT_COLUMNS
        ))
        .bind(gateway_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to find subscription: {}", e),
            )
        })?;

        row.map(Subscription::try_from).transpose()
    }

    async fn find_due_plan_changes(&self, now: Timestamp) -> Result<Vec<Subscription>, DomainError> {
        let rows: Vec<SubscriptionRow> = sqlx::query_as(&format!(
            r#"{}
            WHERE pending_plan_type IS NOT NULL
              AND pending_plan_change_at IS NOT NULL
              AND pending_plan_change_at <= $1
            ORDER BY pending_plan_change_at ASC
            "#,
            SELECT_COLUMNS
        ))
        .bind(now.as_datetime())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to find due plan changes: {}", e),
            )
        })?;

        rows.into_iter().map(Subscription::try_from).collect()
    }
}
