//! Subscription repository port (write side).
//!
//! Defines the contract for persisting and retrieving Subscription
//! aggregates. Implementations handle the actual database operations.
//!
//! # Design
//!
//! - **Write-focused**: Optimized for aggregate persistence
//! - **Unique constraint**: Only one subscription per user
//! - **Optimistic locking**: `update` must check the aggregate version
//!
//! # Example
//!
//! ```ignore
//! async fn activate_for_user(
//!     repo: &dyn SubscriptionRepository,
//!     user_id: &UserId,
//!     now: Timestamp,
//! ) -> Result<(), DomainError> {
//!     let mut subscription = repo
//!         .find_pending_by_user_id(user_id)
//!         .await?
//!         .ok_or_else(|| DomainError::new(ErrorCode::SubscriptionNotFound, "no pending subscription"))?;
//!
//!     subscription.activate(now, Some("sub_gateway123".to_string()))?;
//!     repo.update(&subscription).await?;
//!     Ok(())
//! }
//! ```

use crate::domain::billing::Subscription;
use crate::domain::foundation::{DomainError, SubscriptionId, Timestamp, UserId};
use async_trait::async_trait;

/// Repository port for Subscription aggregate persistence.
///
/// Handles write operations for the subscription lifecycle.
/// Implementations must ensure:
/// - Unique user_id constraint
/// - Optimistic locking for concurrent updates
#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    /// Save a new subscription.
    ///
    /// # Errors
    ///
    /// - `ValidationFailed` if the user already has a subscription
    /// - `DatabaseError` on persistence failure
    async fn save(&self, subscription: &Subscription) -> Result<(), DomainError>;

    /// Update an existing subscription.
    ///
    /// The stored row is only written when its version matches the
    /// aggregate's version; the datastore bumps the version on success.
    ///
    /// # Errors
    ///
    /// - `SubscriptionNotFound` if the subscription doesn't exist
    /// - `ConcurrentModification` if the stored version has moved on
    /// - `DatabaseError` on persistence failure
    async fn update(&self, subscription: &Subscription) -> Result<(), DomainError>;

    /// Find a subscription by its ID.
    ///
    /// Returns `None` if not found.
    async fn find_by_id(&self, id: &SubscriptionId) -> Result<Option<Subscription>, DomainError>;

    /// Find the most recent subscription for a user.
    ///
    /// Returns `None` if the user has no subscription. This is the primary
    /// lookup for the authenticated API surface.
    async fn find_by_user_id(&self, user_id: &UserId) -> Result<Option<Subscription>, DomainError>;

    /// Find the most recent pending subscription for a user.
    ///
    /// Used by payment webhooks, which carry the user ID in checkout
    /// metadata before a gateway subscription ID has been linked.
    async fn find_pending_by_user_id(
        &self,
        user_id: &UserId,
    ) -> Result<Option<Subscription>, DomainError>;

    /// Find a subscription by its gateway subscription ID.
    ///
    /// Used by lifecycle webhooks, which identify the subscription by the
    /// ID Pagar.me assigned at activation.
    async fn find_by_gateway_subscription_id(
        &self,
        gateway_subscription_id: &str,
    ) -> Result<Option<Subscription>, DomainError>;

    /// Find active subscriptions whose scheduled plan change is due.
    ///
    /// Returns subscriptions with `pending_plan_change_at <= now`. Used by
    /// the periodic sweep that applies deferred plan changes.
    async fn find_due_plan_changes(
        &self,
        now: Timestamp,
    ) -> Result<Vec<Subscription>, DomainError>;
}
