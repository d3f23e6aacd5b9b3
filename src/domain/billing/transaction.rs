//! Payment transaction entity.
//!
//! One row per gateway charge attempt against a subscription. Transactions
//! are the audit trail behind refunds: a refund always targets the most
//! recent paid transaction.

use crate::domain::foundation::{
    DomainError, ErrorCode, SubscriptionId, Timestamp, TransactionId, UserId,
};
use serde::{Deserialize, Serialize};

/// Outcome of a gateway charge attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    /// Charge settled successfully.
    Paid,

    /// Charge declined at checkout.
    Refused,

    /// Recurring charge failed (the gateway retries).
    Failed,

    /// A previously paid charge was refunded.
    Refunded,
}

impl TransactionStatus {
    /// Only paid transactions can be refunded.
    pub fn is_refundable(&self) -> bool {
        matches!(self, TransactionStatus::Paid)
    }
}

/// A recorded charge attempt from the payment gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentTransaction {
    /// Unique identifier for this transaction.
    pub id: TransactionId,

    /// Subscription this charge belongs to.
    pub subscription_id: SubscriptionId,

    /// User who owns the subscription.
    pub user_id: UserId,

    /// Pagar.me charge ID, when the gateway reported one.
    pub gateway_transaction_id: Option<String>,

    /// Charged amount in BRL cents.
    pub amount_cents: i64,

    /// Outcome of the charge attempt.
    pub status: TransactionStatus,

    /// Payment method reported by the gateway (credit_card, pix, boleto).
    pub payment_method: Option<String>,

    /// When the charge settled.
    pub paid_at: Option<Timestamp>,

    /// When a recurring charge failed.
    pub failed_at: Option<Timestamp>,

    /// When the transaction was recorded.
    pub created_at: Timestamp,

    /// When the transaction was last updated.
    pub updated_at: Timestamp,
}

impl PaymentTransaction {
    /// Record a settled charge.
    pub fn paid(
        id: TransactionId,
        subscription_id: SubscriptionId,
        user_id: UserId,
        gateway_transaction_id: Option<String>,
        amount_cents: i64,
        payment_method: Option<String>,
        now: Timestamp,
    ) -> Self {
        Self {
            id,
            subscription_id,
            user_id,
            gateway_transaction_id,
            amount_cents,
            status: TransactionStatus::Paid,
            payment_method,
            paid_at: Some(now),
            failed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Record a charge declined at checkout.
    pub fn refused(
        id: TransactionId,
        subscription_id: SubscriptionId,
        user_id: UserId,
        gateway_transaction_id: Option<String>,
        amount_cents: i64,
        now: Timestamp,
    ) -> Self {
        Self {
            id,
            subscription_id,
            user_id,
            gateway_transaction_id,
            amount_cents,
            status: TransactionStatus::Refused,
            payment_method: None,
            paid_at: None,
            failed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Record a failed recurring charge.
    pub fn failed(
        id: TransactionId,
        subscription_id: SubscriptionId,
        user_id: UserId,
        gateway_transaction_id: Option<String>,
        amount_cents: i64,
        now: Timestamp,
    ) -> Self {
        Self {
            id,
            subscription_id,
            user_id,
            gateway_transaction_id,
            amount_cents,
            status: TransactionStatus::Failed,
            payment_method: None,
            paid_at: None,
            failed_at: Some(now),
            created_at: now,
            updated_at: now,
        }
    }

    /// Mark this transaction as refunded.
    ///
    /// # Errors
    ///
    /// Returns error unless the transaction is currently Paid.
    pub fn mark_refunded(&mut self, now: Timestamp) -> Result<(), DomainError> {
        if !self.status.is_refundable() {
            return Err(DomainError::new(
                ErrorCode::InvalidStateTransition,
                format!("Cannot refund a {:?} transaction", self.status),
            ));
        }
        self.status = TransactionStatus::Refunded;
        self.updated_at = now;
        Ok(())
    }
}
