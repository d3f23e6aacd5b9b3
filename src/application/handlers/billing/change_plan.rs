//! ChangePlanHandler - Command handler for scheduling a plan change.

use std::sync::Arc;

use crate::domain::billing::{BillingError, BillingEvent, PlanType};
use crate::domain::foundation::{
    EventId, SerializableDomainEvent, SubscriptionId, Timestamp, UserId,
};
use crate::ports::{EventPublisher, SubscriptionRepository};

/// Command to schedule a plan change.
#[derive(Debug, Clone)]
pub struct ChangePlanCommand {
    pub subscription_id: SubscriptionId,
    /// Authenticated caller. Must own the subscription.
    pub user_id: UserId,
    pub new_plan: PlanType,
}

/// Result of a scheduled plan change.
///
/// The change is deferred: the subscription keeps its current plan and
/// price until `effective_at`, when the next renewal picks it up.
#[derive(Debug, Clone)]
pub struct ChangePlanResult {
    pub subscription_id: SubscriptionId,
    pub current_plan: PlanType,
    pub new_plan: PlanType,
    pub effective_at: Timestamp,
}

/// Handler for plan changes.
pub struct ChangePlanHandler {
    repository: Arc<dyn SubscriptionRepository>,
    event_publisher: Arc<dyn EventPublisher>,
}

impl ChangePlanHandler {
    pub fn new(
        repository: Arc<dyn SubscriptionRepository>,
        event_publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            repository,
            event_publisher,
        }
    }

    pub async fn handle(&self, cmd: ChangePlanCommand) -> Result<ChangePlanResult, BillingError> {
        // 1. Find the subscription and check ownership
        let mut subscription = self
            .repository
            .find_by_id(&cmd.subscription_id)
            .await?
            .ok_or_else(|| BillingError::not_found(cmd.subscription_id))?;

        if subscription.user_id != cmd.user_id {
            return Err(BillingError::not_found(cmd.subscription_id));
        }

        // 2. Schedule the change for the end of the current period
        let now = Timestamp::now();
        subscription.schedule_plan_change(cmd.new_plan, now)?;

        // schedule_plan_change always stamps the effective date
        let effective_at = subscription.pending_plan_change_at.unwrap_or(now);

        // 3. Persist
        self.repository.update(&subscription).await?;

        // 4. Publish the scheduling event
        let event = BillingEvent::PlanChangeScheduled {
            event_id: EventId::new(),
            subscription_id: subscription.id,
            user_id: subscription.user_id.clone(),
            current_plan: subscription.plan_type,
            new_plan: cmd.new_plan,
            effective_at,
            occurred_at: now,
        };
        let envelope = event.to_envelope().with_user_id(cmd.user_id.to_string());
        self.event_publisher.publish(envelope).await?;

        Ok(ChangePlanResult {
            subscription_id: subscription.id,
            current_plan: subscription.plan_type,
            new_plan: cmd.new_plan,
            effective_at,
        })
    }
}
