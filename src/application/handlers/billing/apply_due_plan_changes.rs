//! ApplyDuePlanChangesHandler - Sweep that applies plan changes whose date arrived.
//!
//! Renewal webhooks apply pending changes on their own. This sweep is the
//! backstop for subscriptions whose renewal event never arrived, driven by
//! a periodic task rather than a user request.

use std::sync::Arc;

use tracing::warn;

use crate::domain::billing::{BillingError, BillingEvent};
use crate::domain::foundation::{EventId, SerializableDomainEvent, Timestamp};
use crate::ports::{EventPublisher, SubscriptionRepository};

/// Command to apply every plan change due at `now`.
#[derive(Debug, Clone)]
pub struct ApplyDuePlanChangesCommand {
    pub now: Timestamp,
}

/// Counters for one sweep run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyDuePlanChangesResult {
    pub applied: u32,
    pub failed: u32,
}

/// Handler for the plan change sweep.
pub struct ApplyDuePlanChangesHandler {
    repository: Arc<dyn SubscriptionRepository>,
    event_publisher: Arc<dyn EventPublisher>,
}

impl ApplyDuePlanChangesHandler {
    pub fn new(
        repository: Arc<dyn SubscriptionRepository>,
        event_publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            repository,
            event_publisher,
        }
    }

    /// One row failing does not stop the sweep; failures are counted and
    /// the row is retried on the next run.
    pub async fn handle(
        &self,
        cmd: ApplyDuePlanChangesCommand,
    ) -> Result<ApplyDuePlanChangesResult, BillingError> {
        let due = self.repository.find_due_plan_changes(cmd.now).await?;

        let mut applied = 0u32;
        let mut failed = 0u32;

        for mut subscription in due {
            let previous_plan = subscription.plan_type;
            if !subscription.apply_pending_plan_change(cmd.now) {
                continue;
            }

            if let Err(error) = self.repository.update(&subscription).await {
                warn!(
                    subscription_id = %subscription.id,
                    %error,
                    "failed to persist due plan change"
                );
                failed += 1;
                continue;
            }
            applied += 1;

            let event = BillingEvent::PlanChangeApplied {
                event_id: EventId::new(),
                subscription_id: subscription.id,
                user_id: subscription.user_id.clone(),
                previous_plan,
                new_plan: subscription.plan_type,
                occurred_at: cmd.now,
            };
            if let Err(error) = self.event_publisher.publish(event.to_envelope()).await {
                // The plan change is already persisted, so only the event is lost
                warn!(
                    subscription_id = %subscription.id,
                    %error,
                    "plan change applied but event publish failed"
                );
            }
        }

        Ok(ApplyDuePlanChangesResult { applied, failed })
    }
}
