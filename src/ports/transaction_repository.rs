//! Payment transaction repository port.
//!
//! Defines the contract for persisting charge attempt records. Webhook
//! handlers append rows as the gateway reports outcomes; the refund flow
//! reads back the most recent paid row and flips it to refunded.
//!
//! # Design
//!
//! - **Append-mostly**: rows are written once and only updated on refund
//! - **Refund anchor**: the latest paid row is the refund target

use crate::domain::billing::PaymentTransaction;
use crate::domain::foundation::{DomainError, SubscriptionId};
use async_trait::async_trait;

/// Repository port for payment transaction records.
#[async_trait]
pub trait TransactionRepository: Send + Sync {
    /// Save a new transaction record.
    ///
    /// # Errors
    ///
    /// - `DatabaseError` on persistence failure
    async fn save(&self, transaction: &PaymentTransaction) -> Result<(), DomainError>;

    /// Update an existing transaction record.
    ///
    /// Used when a paid transaction is marked refunded.
    ///
    /// # Errors
    ///
    /// - `TransactionNotFound` if the transaction doesn't exist
    /// - `DatabaseError` on persistence failure
    async fn update(&self, transaction: &PaymentTransaction) -> Result<(), DomainError>;

    /// Find the most recent paid transaction for a subscription.
    ///
    /// Returns `None` if the subscription has no paid transaction, which
    /// makes it ineligible for a refund.
    async fn find_latest_paid_for_subscription(
        &self,
        subscription_id: &SubscriptionId,
    ) -> Result<Option<PaymentTransaction>, DomainError>;
}
