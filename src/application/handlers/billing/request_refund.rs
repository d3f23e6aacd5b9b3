//! RequestRefundHandler - Command handler for the 8-day refund guarantee.

use std::sync::Arc;

use crate::domain::billing::{BillingError, BillingEvent, SubscriptionStatus};
use crate::domain::foundation::{
    EventId, SerializableDomainEvent, SubscriptionId, Timestamp, UserId,
};
use crate::ports::{
    EventPublisher, PaymentGateway, SubscriptionRepository, TransactionRepository,
};

/// Command to refund a subscription's latest payment.
#[derive(Debug, Clone)]
pub struct RequestRefundCommand {
    pub subscription_id: SubscriptionId,
    /// Authenticated caller. Must own the subscription.
    pub user_id: UserId,
}

/// Result of a processed refund.
#[derive(Debug, Clone)]
pub struct RequestRefundResult {
    pub subscription_id: SubscriptionId,
    pub status: SubscriptionStatus,
    pub amount_cents: i64,
    pub days_used: u32,
    pub refunded_at: Timestamp,
}

/// Handler for refund requests.
///
/// Eligibility is checked before anything else: the window counts whole
/// days from the start of the current period and closes once eight days
/// are used or a refund was already processed. The gateway refund runs
/// before any local row changes, so a gateway failure leaves the
/// subscription and the transaction exactly as they were.
pub struct RequestRefundHandler {
    subscription_repository: Arc<dyn SubscriptionRepository>,
    transaction_repository: Arc<dyn TransactionRepository>,
    gateway: Arc<dyn PaymentGateway>,
    event_publisher: Arc<dyn EventPublisher>,
}

impl RequestRefundHandler {
    pub fn new(
        subscription_repository: Arc<dyn SubscriptionRepository>,
        transaction_repository: Arc<dyn TransactionRepository>,
        gateway: Arc<dyn PaymentGateway>,
        event_publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            subscription_repository,
            transaction_repository,
            gateway,
            event_publisher,
        }
    }

    pub async fn handle(
        &self,
        cmd: RequestRefundCommand,
    ) -> Result<RequestRefundResult, BillingError> {
        // 1. Find the subscription and check ownership
        let mut subscription = self
            .subscription_repository
            .find_by_id(&cmd.subscription_id)
            .await?
            .ok_or_else(|| BillingError::not_found(cmd.subscription_id))?;

        if subscription.user_id != cmd.user_id {
            return Err(BillingError::not_found(cmd.subscription_id));
        }

        // 2. Check eligibility before anything is touched
        let now = Timestamp::now();
        let eligibility = subscription.refund_eligibility(now);
        if !eligibility.eligible {
            if subscription.refund_processed_at.is_some() {
                return Err(BillingError::refund_already_processed());
            }
            return Err(BillingError::refund_window_expired(eligibility.days_used));
        }

        // 3. The refund targets the most recent successful payment
        let mut transaction = self
            .transaction_repository
            .find_latest_paid_for_subscription(&subscription.id)
            .await?
            .ok_or_else(|| BillingError::transaction_not_found(subscription.id))?;

        let gateway_transaction_id = transaction
            .gateway_transaction_id
            .clone()
            .ok_or_else(|| BillingError::transaction_not_found(subscription.id))?;

        // 4. Refund at the gateway before touching local rows
        self.gateway
            .refund_transaction(&gateway_transaction_id, transaction.amount_cents)
            .await?;

        // 5. Mark the transaction refunded
        transaction.mark_refunded(now)?;
        self.transaction_repository.update(&transaction).await?;

        // 6. Cancel the subscription and stamp the refund
        subscription.approve_refund(now)?;
        self.subscription_repository.update(&subscription).await?;

        // 7. Publish the refund event
        let event = BillingEvent::RefundProcessed {
            event_id: EventId::new(),
            subscription_id: subscription.id,
            user_id: subscription.user_id.clone(),
            gateway_transaction_id: Some(gateway_transaction_id),
            amount_cents: transaction.amount_cents,
            days_used: subscription.days_used,
            occurred_at: now,
        };
        let envelope = event.to_envelope().with_user_id(cmd.user_id.to_string());
        self.event_publisher.publish(envelope).await?;

        Ok(RequestRefundResult {
            subscription_id: subscription.id,
            status: subscription.status,
            amount_cents: transaction.amount_cents,
            days_used: subscription.days_used,
            refunded_at: now,
        })
    }
}
