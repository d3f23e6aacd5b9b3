//! CancelSubscriptionHandler - Command handler for cancelling a subscription.

use std::sync::Arc;

use crate::domain::billing::{BillingError, BillingEvent, SubscriptionStatus};
use crate::domain::foundation::{
    EventId, SerializableDomainEvent, SubscriptionId, Timestamp, UserId,
};
use crate::ports::{EventPublisher, PaymentGateway, SubscriptionRepository};

/// Command to cancel a subscription.
#[derive(Debug, Clone)]
pub struct CancelSubscriptionCommand {
    pub subscription_id: SubscriptionId,
    /// Authenticated caller. Must own the subscription.
    pub user_id: UserId,
    /// Revoke access now instead of at period end.
    pub cancel_immediately: bool,
}

/// Result of a successful cancellation.
#[derive(Debug, Clone)]
pub struct CancelSubscriptionResult {
    pub subscription_id: SubscriptionId,
    pub status: SubscriptionStatus,
    /// When access ends: now for immediate, period end for deferred.
    pub effective_at: Timestamp,
    /// True when the subscription was already cancelled and nothing changed.
    pub already_cancelled: bool,
}

/// Handler for subscription cancellation.
///
/// Cancels at the gateway first; the local row is only mutated after
/// Pagar.me has accepted the cancellation. A gateway report that the
/// subscription was already cancelled counts as acceptance.
pub struct CancelSubscriptionHandler {
    repository: Arc<dyn SubscriptionRepository>,
    gateway: Arc<dyn PaymentGateway>,
    event_publisher: Arc<dyn EventPublisher>,
}

impl CancelSubscriptionHandler {
    pub fn new(
        repository: Arc<dyn SubscriptionRepository>,
        gateway: Arc<dyn PaymentGateway>,
        event_publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            repository,
            gateway,
            event_publisher,
        }
    }

    pub async fn handle(
        &self,
        cmd: CancelSubscriptionCommand,
    ) -> Result<CancelSubscriptionResult, BillingError> {
        // 1. Find the subscription and check ownership
        let mut subscription = self
            .repository
            .find_by_id(&cmd.subscription_id)
            .await?
            .ok_or_else(|| BillingError::not_found(cmd.subscription_id))?;

        if subscription.user_id != cmd.user_id {
            // Another user's subscription is reported as missing
            return Err(BillingError::not_found(cmd.subscription_id));
        }

        // 2. Repeat cancellations are idempotent
        let now = Timestamp::now();
        if subscription.status == SubscriptionStatus::Cancelled {
            return Ok(CancelSubscriptionResult {
                subscription_id: subscription.id,
                status: subscription.status,
                effective_at: subscription.cancelled_at.unwrap_or(now),
                already_cancelled: true,
            });
        }

        // 3. Cancel at the gateway before touching the local row
        if let Some(gateway_id) = subscription.gateway_subscription_id.clone() {
            self.gateway.cancel_subscription(&gateway_id).await?;
        }

        // 4. Apply the cancellation locally
        let effective_at = if cmd.cancel_immediately {
            subscription.cancel_immediately(now)?;
            now
        } else {
            subscription.schedule_cancel_at_period_end(now)?;
            subscription.cancelled_at.unwrap_or(now)
        };

        // 5. Persist
        self.repository.update(&subscription).await?;

        // 6. Publish the cancellation event
        let event = BillingEvent::Cancelled {
            event_id: EventId::new(),
            subscription_id: subscription.id,
            user_id: subscription.user_id.clone(),
            effective_at,
            immediate: cmd.cancel_immediately,
            occurred_at: now,
        };
        let envelope = event.to_envelope().with_user_id(cmd.user_id.to_string());
        self.event_publisher.publish(envelope).await?;

        Ok(CancelSubscriptionResult {
            subscription_id: subscription.id,
            status: subscription.status,
            effective_at,
            already_cancelled: false,
        })
    }
}
