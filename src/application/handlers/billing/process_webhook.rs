//! ProcessWebhookHandler - Applies Pagar.me webhook events to subscriptions.
//!
//! Every delivery runs the same pipeline: verify the HMAC signature, drop
//! replays by gateway event id, dispatch to the event-specific handler, and
//! record the attempt with its outcome. Ignored events are acknowledged so
//! the gateway stops retrying; database and lookup failures are surfaced so
//! it retries later.

use std::sync::Arc;

use tracing::{info, warn};

use crate::domain::billing::{
    BillingEvent, CheckoutMetadata, ExpiredReason, InvoiceData, OrderData, PagarmeEvent,
    PagarmeEventType, PagarmeWebhookVerifier, PaymentTransaction, RenewalOutcome, Subscription,
    SubscriptionData, SubscriptionStatus, WebhookError,
};
use crate::domain::foundation::{
    EventId, SerializableDomainEvent, Timestamp, TransactionId, UserId,
};
use crate::ports::{
    EventPublisher, SaveResult, SubscriptionRepository, TransactionRepository, WebhookEventRecord,
    WebhookEventRepository, WebhookResult,
};

/// Command carrying one raw webhook delivery.
///
/// The payload stays as raw bytes because the signature covers the exact
/// body the gateway sent.
#[derive(Debug, Clone)]
pub struct ProcessWebhookCommand {
    pub payload: Vec<u8>,
    /// Hex HMAC from the `X-Pagarme-Signature` header.
    pub signature: String,
}

/// Handler for incoming Pagar.me webhooks.
pub struct ProcessWebhookHandler {
    verifier: PagarmeWebhookVerifier,
    subscription_repository: Arc<dyn SubscriptionRepository>,
    transaction_repository: Arc<dyn TransactionRepository>,
    webhook_repository: Arc<dyn WebhookEventRepository>,
    event_publisher: Arc<dyn EventPublisher>,
}

impl ProcessWebhookHandler {
    pub fn new(
        verifier: PagarmeWebhookVerifier,
        subscription_repository: Arc<dyn SubscriptionRepository>,
        transaction_repository: Arc<dyn TransactionRepository>,
        webhook_repository: Arc<dyn WebhookEventRepository>,
        event_publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            verifier,
            subscription_repository,
            transaction_repository,
            webhook_repository,
            event_publisher,
        }
    }

    pub async fn handle(&self, cmd: ProcessWebhookCommand) -> Result<WebhookResult, WebhookError> {
        // 1. Reject anything without a valid signature
        let event = self.verifier.verify_and_parse(&cmd.payload, &cmd.signature)?;

        // 2. Replays are acknowledged without reprocessing
        if self
            .webhook_repository
            .find_by_event_id(&event.id)
            .await?
            .is_some()
        {
            info!(event_id = %event.id, "webhook replay acknowledged");
            return Ok(WebhookResult::AlreadyProcessed);
        }

        // 3. Apply the event
        let outcome = self.dispatch(&event).await;

        // 4. Record the attempt whatever the outcome
        let payload = serde_json::to_value(&event)
            .map_err(|e| WebhookError::ParseError(format!("event not serializable: {}", e)))?;
        let record = match &outcome {
            Ok(()) => {
                WebhookEventRecord::success(event.id.as_str(), event.event_type.as_str(), payload)
            }
            Err(WebhookError::Ignored(reason)) => WebhookEventRecord::ignored(
                event.id.as_str(),
                event.event_type.as_str(),
                reason.as_str(),
                payload,
            ),
            Err(error) => WebhookEventRecord::failed(
                event.id.as_str(),
                event.event_type.as_str(),
                error.to_string(),
                payload,
            ),
        };

        // 5. A concurrent delivery may have recorded the same event first
        if self.webhook_repository.save(record).await? == SaveResult::AlreadyExists {
            return Ok(WebhookResult::AlreadyProcessed);
        }

        match outcome {
            Ok(()) => Ok(WebhookResult::Processed),
            Err(WebhookError::Ignored(reason)) => {
                info!(
                    event_id = %event.id,
                    event_type = %event.event_type,
                    %reason,
                    "webhook ignored"
                );
                Ok(WebhookResult::Processed)
            }
            Err(error) => Err(error),
        }
    }

    async fn dispatch(&self, event: &PagarmeEvent) -> Result<(), WebhookError> {
        match event.parsed_type() {
            PagarmeEventType::OrderPaid | PagarmeEventType::ChargePaid => {
                self.handle_payment_succeeded(event).await
            }
            PagarmeEventType::OrderPaymentFailed | PagarmeEventType::ChargeFailed => {
                self.handle_payment_refused(event).await
            }
            PagarmeEventType::SubscriptionActivated => {
                self.handle_subscription_activated(event).await
            }
            PagarmeEventType::SubscriptionPaymentSucceeded
            | PagarmeEventType::SubscriptionRenewed => {
                self.handle_subscription_renewal(event).await
            }
            PagarmeEventType::SubscriptionPaymentFailed => {
                self.handle_subscription_payment_failed(event).await
            }
            PagarmeEventType::SubscriptionCanceled => {
                self.handle_subscription_cancelled(event).await
            }
            PagarmeEventType::SubscriptionExpired => self.handle_subscription_expired(event).await,
            PagarmeEventType::SubscriptionSuspended => {
                self.handle_subscription_suspended(event).await
            }
            PagarmeEventType::InvoicePaymentSucceeded => {
                self.handle_invoice_payment_succeeded(event).await
            }
            PagarmeEventType::InvoicePaymentFailed => {
                self.handle_invoice_payment_failed(event).await
            }
            PagarmeEventType::Unknown => Err(WebhookError::Ignored(format!(
                "no handler for event type {}",
                event.event_type
            ))),
        }
    }

    /// `order.paid` / `charge.paid`. The checkout payment went through, so
    /// the pending subscription created for that user becomes active.
    async fn handle_payment_succeeded(&self, event: &PagarmeEvent) -> Result<(), WebhookError> {
        let data: OrderData = Self::payload(event)?;
        let user_id = Self::metadata_user_id(&data.metadata)?;

        let mut subscription = self
            .subscription_repository
            .find_pending_by_user_id(&user_id)
            .await?
            .ok_or(WebhookError::SubscriptionNotFound)?;

        let now = Timestamp::now();
        subscription
            .activate(now, Some(data.id.clone()))
            .map_err(|e| WebhookError::InvalidTransition(e.to_string()))?;
        self.subscription_repository.update(&subscription).await?;

        let transaction = PaymentTransaction::paid(
            TransactionId::new(),
            subscription.id,
            subscription.user_id.clone(),
            Some(data.id.clone()),
            subscription.amount_cents,
            Some(data.payment_method().unwrap_or("credit_card").to_string()),
            now,
        );
        self.transaction_repository.save(&transaction).await?;

        info!(
            subscription_id = %subscription.id,
            user_id = %subscription.user_id,
            event_id = %event.id,
            "subscription activated by payment"
        );
        self.publish_activated(&subscription, now, &event.id).await
    }

    /// `order.payment_failed` / `charge.failed`. The checkout payment was
    /// refused, so the pending subscription expires.
    async fn handle_payment_refused(&self, event: &PagarmeEvent) -> Result<(), WebhookError> {
        let data: OrderData = Self::payload(event)?;
        let user_id = Self::metadata_user_id(&data.metadata)?;

        let mut subscription = self
            .subscription_repository
            .find_pending_by_user_id(&user_id)
            .await?
            .ok_or(WebhookError::SubscriptionNotFound)?;

        let now = Timestamp::now();
        subscription
            .expire(now)
            .map_err(|e| WebhookError::InvalidTransition(e.to_string()))?;
        self.subscription_repository.update(&subscription).await?;

        let transaction = PaymentTransaction::refused(
            TransactionId::new(),
            subscription.id,
            subscription.user_id.clone(),
            Some(data.id.clone()),
            data.amount.unwrap_or(subscription.amount_cents),
            now,
        );
        self.transaction_repository.save(&transaction).await?;

        info!(
            subscription_id = %subscription.id,
            event_id = %event.id,
            "pending subscription expired after refused payment"
        );

        let billing_event = BillingEvent::Expired {
            event_id: EventId::new(),
            subscription_id: subscription.id,
            user_id: subscription.user_id.clone(),
            reason: ExpiredReason::PaymentRefused,
            occurred_at: now,
        };
        self.publish(billing_event, &event.id).await
    }

    /// `subscription.activated`. Carries the definitive gateway subscription
    /// id and the billing period the gateway opened.
    async fn handle_subscription_activated(
        &self,
        event: &PagarmeEvent,
    ) -> Result<(), WebhookError> {
        let data: SubscriptionData = Self::payload(event)?;

        if let Some(status) = data.status.as_deref() {
            if SubscriptionStatus::from_gateway(status) != SubscriptionStatus::Active {
                return Err(WebhookError::Ignored(format!(
                    "subscription.activated carried gateway status {}",
                    status
                )));
            }
        }

        let user_id = Self::metadata_user_id(&data.metadata)?;
        let pending = self
            .subscription_repository
            .find_pending_by_user_id(&user_id)
            .await?;

        let mut subscription = match pending {
            Some(subscription) => subscription,
            None => {
                // The order.paid for the same checkout may have won the race.
                // The row still needs the real gateway subscription id so
                // later renewal events can find it.
                let existing = self.subscription_repository.find_by_user_id(&user_id).await?;
                match existing {
                    Some(mut existing) if existing.status == SubscriptionStatus::Active => {
                        existing.gateway_subscription_id = Some(data.id.clone());
                        self.subscription_repository.update(&existing).await?;
                        info!(
                            subscription_id = %existing.id,
                            event_id = %event.id,
                            "stored gateway subscription id on already active subscription"
                        );
                        return Ok(());
                    }
                    _ => return Err(WebhookError::SubscriptionNotFound),
                }
            }
        };

        let now = Timestamp::now();
        subscription
            .activate_from_gateway(now, data.period_start(), data.period_end())
            .map_err(|e| WebhookError::InvalidTransition(e.to_string()))?;
        subscription.gateway_subscription_id = Some(data.id.clone());
        self.subscription_repository.update(&subscription).await?;

        info!(
            subscription_id = %subscription.id,
            user_id = %subscription.user_id,
            event_id = %event.id,
            "subscription activated by gateway"
        );
        self.publish_activated(&subscription, now, &event.id).await
    }

    /// `subscription.payment_succeeded` / `subscription.renewed`. Rolls the
    /// billing period forward. The aggregate applies a pending plan change
    /// here and turns the renewal into a cancellation when one was scheduled
    /// and the old period already ended.
    async fn handle_subscription_renewal(&self, event: &PagarmeEvent) -> Result<(), WebhookError> {
        let data: SubscriptionData = Self::payload(event)?;
        let mut subscription = self.find_by_gateway_id(&data.id).await?;

        let now = Timestamp::now();
        let was_active = subscription.status == SubscriptionStatus::Active;
        let outcome = subscription
            .renew(now, data.period_start(), data.period_end())
            .map_err(|e| WebhookError::InvalidTransition(e.to_string()))?;
        self.subscription_repository.update(&subscription).await?;

        info!(
            subscription_id = %subscription.id,
            event_id = %event.id,
            outcome = ?outcome,
            "subscription renewal processed"
        );
        self.publish_renewal_outcome(&subscription, outcome, was_active, now, &event.id)
            .await
    }

    /// `subscription.payment_failed`. Records the failed attempt without
    /// touching the subscription. The gateway retries on its own schedule
    /// and reports suspension separately once it gives up.
    async fn handle_subscription_payment_failed(
        &self,
        event: &PagarmeEvent,
    ) -> Result<(), WebhookError> {
        let data: SubscriptionData = Self::payload(event)?;
        let subscription = self.find_by_gateway_id(&data.id).await?;

        // The subscription payload carries no charge id or amount, so the
        // transaction row falls back to the current plan snapshot
        let now = Timestamp::now();
        let transaction = PaymentTransaction::failed(
            TransactionId::new(),
            subscription.id,
            subscription.user_id.clone(),
            None,
            subscription.amount_cents,
            now,
        );
        self.transaction_repository.save(&transaction).await?;

        warn!(
            subscription_id = %subscription.id,
            event_id = %event.id,
            "subscription payment failed"
        );

        let billing_event = BillingEvent::PaymentFailed {
            event_id: EventId::new(),
            subscription_id: subscription.id,
            user_id: subscription.user_id.clone(),
            gateway_transaction_id: None,
            occurred_at: now,
        };
        self.publish(billing_event, &event.id).await
    }

    /// `subscription.canceled`. The gateway is the source of truth, so the
    /// local row follows it even when the cancellation did not originate here.
    async fn handle_subscription_cancelled(
        &self,
        event: &PagarmeEvent,
    ) -> Result<(), WebhookError> {
        let data: SubscriptionData = Self::payload(event)?;
        let mut subscription = self.find_by_gateway_id(&data.id).await?;

        // A cancellation that went through this service was already announced
        if subscription.status == SubscriptionStatus::Cancelled {
            return Ok(());
        }

        let now = Timestamp::now();
        subscription
            .gateway_cancelled(now)
            .map_err(|e| WebhookError::InvalidTransition(e.to_string()))?;
        self.subscription_repository.update(&subscription).await?;

        info!(
            subscription_id = %subscription.id,
            event_id = %event.id,
            "subscription cancelled by gateway"
        );

        let billing_event = BillingEvent::Cancelled {
            event_id: EventId::new(),
            subscription_id: subscription.id,
            user_id: subscription.user_id.clone(),
            effective_at: now,
            immediate: true,
            occurred_at: now,
        };
        self.publish(billing_event, &event.id).await
    }

    /// `subscription.expired`.
    async fn handle_subscription_expired(&self, event: &PagarmeEvent) -> Result<(), WebhookError> {
        let data: SubscriptionData = Self::payload(event)?;
        let mut subscription = self.find_by_gateway_id(&data.id).await?;

        if subscription.status == SubscriptionStatus::Expired {
            return Ok(());
        }

        let now = Timestamp::now();
        subscription
            .expire(now)
            .map_err(|e| WebhookError::InvalidTransition(e.to_string()))?;
        self.subscription_repository.update(&subscription).await?;

        info!(
            subscription_id = %subscription.id,
            event_id = %event.id,
            "subscription expired by gateway"
        );

        let billing_event = BillingEvent::Expired {
            event_id: EventId::new(),
            subscription_id: subscription.id,
            user_id: subscription.user_id.clone(),
            reason: ExpiredReason::GatewayReported,
            occurred_at: now,
        };
        self.publish(billing_event, &event.id).await
    }

    /// `subscription.suspended`. The gateway gave up retrying a failed
    /// renewal payment.
    async fn handle_subscription_suspended(
        &self,
        event: &PagarmeEvent,
    ) -> Result<(), WebhookError> {
        let data: SubscriptionData = Self::payload(event)?;
        let mut subscription = self.find_by_gateway_id(&data.id).await?;

        if subscription.status == SubscriptionStatus::Suspended {
            return Ok(());
        }

        let now = Timestamp::now();
        subscription
            .suspend(now)
            .map_err(|e| WebhookError::InvalidTransition(e.to_string()))?;
        self.subscription_repository.update(&subscription).await?;

        warn!(
            subscription_id = %subscription.id,
            event_id = %event.id,
            "subscription suspended by gateway"
        );

        let billing_event = BillingEvent::Suspended {
            event_id: EventId::new(),
            subscription_id: subscription.id,
            user_id: subscription.user_id.clone(),
            occurred_at: now,
        };
        self.publish(billing_event, &event.id).await
    }

    /// `invoice.payment_succeeded`. A paid renewal invoice: rolls the period
    /// forward and records the payment row.
    async fn handle_invoice_payment_succeeded(
        &self,
        event: &PagarmeEvent,
    ) -> Result<(), WebhookError> {
        let data: InvoiceData = Self::payload(event)?;
        let subscription_data = data
            .subscription
            .as_ref()
            .ok_or_else(|| WebhookError::Ignored("invoice carries no subscription".to_string()))?;

        let mut subscription = self.find_by_gateway_id(&subscription_data.id).await?;

        let now = Timestamp::now();
        let was_active = subscription.status == SubscriptionStatus::Active;
        let outcome = subscription
            .renew(
                now,
                subscription_data.period_start(),
                subscription_data.period_end(),
            )
            .map_err(|e| WebhookError::InvalidTransition(e.to_string()))?;
        self.subscription_repository.update(&subscription).await?;

        // The row amount reflects any plan change the renewal applied
        let transaction = PaymentTransaction::paid(
            TransactionId::new(),
            subscription.id,
            subscription.user_id.clone(),
            Some(data.id.clone()),
            subscription.amount_cents,
            data.payment_method.clone(),
            now,
        );
        self.transaction_repository.save(&transaction).await?;

        info!(
            subscription_id = %subscription.id,
            event_id = %event.id,
            outcome = ?outcome,
            "invoice payment recorded"
        );
        self.publish_renewal_outcome(&subscription, outcome, was_active, now, &event.id)
            .await
    }

    /// `invoice.payment_failed`. Records the failed attempt without touching
    /// the subscription. The gateway retries on its own schedule and reports
    /// suspension separately once it gives up.
    async fn handle_invoice_payment_failed(
        &self,
        event: &PagarmeEvent,
    ) -> Result<(), WebhookError> {
        let data: InvoiceData = Self::payload(event)?;
        let subscription_data = data
            .subscription
            .as_ref()
            .ok_or_else(|| WebhookError::Ignored("invoice carries no subscription".to_string()))?;

        let subscription = self.find_by_gateway_id(&subscription_data.id).await?;

        let now = Timestamp::now();
        let transaction = PaymentTransaction::failed(
            TransactionId::new(),
            subscription.id,
            subscription.user_id.clone(),
            Some(data.id.clone()),
            data.amount.unwrap_or(subscription.amount_cents),
            now,
        );
        self.transaction_repository.save(&transaction).await?;

        warn!(
            subscription_id = %subscription.id,
            event_id = %event.id,
            "invoice payment failed"
        );

        let billing_event = BillingEvent::PaymentFailed {
            event_id: EventId::new(),
            subscription_id: subscription.id,
            user_id: subscription.user_id.clone(),
            gateway_transaction_id: Some(data.id.clone()),
            occurred_at: now,
        };
        self.publish(billing_event, &event.id).await
    }

    fn payload<T: serde::de::DeserializeOwned>(event: &PagarmeEvent) -> Result<T, WebhookError> {
        event.deserialize_data().map_err(|e| {
            WebhookError::ParseError(format!("invalid {} payload: {}", event.event_type, e))
        })
    }

    fn metadata_user_id(metadata: &CheckoutMetadata) -> Result<UserId, WebhookError> {
        let raw = metadata
            .user_id
            .as_deref()
            .ok_or_else(|| WebhookError::Ignored("no user_id in checkout metadata".to_string()))?;
        UserId::new(raw)
            .map_err(|_| WebhookError::Ignored("empty user_id in checkout metadata".to_string()))
    }

    async fn find_by_gateway_id(&self, gateway_id: &str) -> Result<Subscription, WebhookError> {
        self.subscription_repository
            .find_by_gateway_subscription_id(gateway_id)
            .await?
            .ok_or(WebhookError::SubscriptionNotFound)
    }

    /// Publishes a billing event correlated to the gateway delivery that
    /// caused it.
    async fn publish(
        &self,
        billing_event: BillingEvent,
        gateway_event_id: &str,
    ) -> Result<(), WebhookError> {
        let envelope = billing_event
            .to_envelope()
            .with_correlation_id(gateway_event_id);
        self.event_publisher.publish(envelope).await?;
        Ok(())
    }

    async fn publish_activated(
        &self,
        subscription: &Subscription,
        now: Timestamp,
        gateway_event_id: &str,
    ) -> Result<(), WebhookError> {
        // activate always stamps the period
        let billing_event = BillingEvent::Activated {
            event_id: EventId::new(),
            subscription_id: subscription.id,
            user_id: subscription.user_id.clone(),
            plan_type: subscription.plan_type,
            period_start: subscription.current_period_start.unwrap_or(now),
            period_end: subscription.current_period_end.unwrap_or(now),
            occurred_at: now,
        };
        self.publish(billing_event, gateway_event_id).await
    }

    async fn publish_renewal_outcome(
        &self,
        subscription: &Subscription,
        outcome: RenewalOutcome,
        was_active: bool,
        now: Timestamp,
        gateway_event_id: &str,
    ) -> Result<(), WebhookError> {
        match outcome {
            RenewalOutcome::CancellationApplied => {
                let billing_event = BillingEvent::Cancelled {
                    event_id: EventId::new(),
                    subscription_id: subscription.id,
                    user_id: subscription.user_id.clone(),
                    effective_at: now,
                    immediate: false,
                    occurred_at: now,
                };
                self.publish(billing_event, gateway_event_id).await?;
            }
            RenewalOutcome::Renewed if was_active => {
                let billing_event = BillingEvent::Renewed {
                    event_id: EventId::new(),
                    subscription_id: subscription.id,
                    user_id: subscription.user_id.clone(),
                    plan_type: subscription.plan_type,
                    new_period_start: subscription.current_period_start.unwrap_or(now),
                    new_period_end: subscription.current_period_end.unwrap_or(now),
                    occurred_at: now,
                };
                self.publish(billing_event, gateway_event_id).await?;
            }
            // A renewal that revives a non-active subscription is an activation
            RenewalOutcome::Renewed => {
                self.publish_activated(subscription, now, gateway_event_id)
                    .await?
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::billing::{compute_test_signature, PlanType, TransactionStatus};
    use crate::domain::foundation::{DomainError, EventEnvelope, SubscriptionId};
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use secrecy::SecretString;
    use serde_json::json;
    use std::sync::Mutex;

    const TEST_SECRET: &str = "whsec_test_secret";

    // ════════════════════════════════════════════════════════════════════════════
    // Mock Implementations
    // ════════════════════════════════════════════════════════════════════════════

    struct MockSubscriptionRepository {
        subscriptions: Mutex<Vec<Subscription>>,
    }

    impl MockSubscriptionRepository {
        fn with_subscriptions(subscriptions: Vec<Subscription>) -> Self {
            Self {
                subscriptions: Mutex::new(subscriptions),
            }
        }

        fn get_subscriptions(&self) -> Vec<Subscription> {
            self.subscriptions.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl SubscriptionRepository for MockSubscriptionRepository {
        async fn save(&self, subscription: &Subscription) -> Result<(), DomainError> {
            self.subscriptions.lock().unwrap().push(subscription.clone());
            Ok(())
        }

        async fn update(&self, subscription: &Subscription) -> Result<(), DomainError> {
            let mut subscriptions = self.subscriptions.lock().unwrap();
            if let Some(s) = subscriptions.iter_mut().find(|s| s.id == subscription.id) {
                *s = subscription.clone();
            }
            Ok(())
        }

        async fn find_by_id(
            &self,
            id: &SubscriptionId,
        ) -> Result<Option<Subscription>, DomainError> {
            let subscriptions = self.subscriptions.lock().unwrap();
            Ok(subscriptions.iter().find(|s| &s.id == id).cloned())
        }

        async fn find_by_user_id(
            &self,
            user_id: &UserId,
        ) -> Result<Option<Subscription>, DomainError> {
            let subscriptions = self.subscriptions.lock().unwrap();
            Ok(subscriptions.iter().find(|s| &s.user_id == user_id).cloned())
        }

        async fn find_pending_by_user_id(
            &self,
            user_id: &UserId,
        ) -> Result<Option<Subscription>, DomainError> {
            let subscriptions = self.subscriptions.lock().unwrap();
            Ok(subscriptions
                .iter()
                .find(|s| &s.user_id == user_id && s.status == SubscriptionStatus::Pending)
                .cloned())
        }

        async fn find_by_gateway_subscription_id(
            &self,
            gateway_id: &str,
        ) -> Result<Option<Subscription>, DomainError> {
            let subscriptions = self.subscriptions.lock().unwrap();
            Ok(subscriptions
                .iter()
                .find(|s| s.gateway_subscription_id.as_deref() == Some(gateway_id))
                .cloned())
        }

        async fn find_due_plan_changes(
            &self,
            _now: Timestamp,
        ) -> Result<Vec<Subscription>, DomainError> {
            Ok(vec![])
        }
    }

    struct MockTransactionRepository {
        transactions: Mutex<Vec<PaymentTransaction>>,
    }

    impl MockTransactionRepository {
        fn new() -> Self {
            Self {
                transactions: Mutex::new(Vec::new()),
            }
        }

        fn get_transactions(&self) -> Vec<PaymentTransaction> {
            self.transactions.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl TransactionRepository for MockTransactionRepository {
        async fn save(&self, transaction: &PaymentTransaction) -> Result<(), DomainError> {
            self.transactions.lock().unwrap().push(transaction.clone());
            Ok(())
        }

        async fn update(&self, transaction: &PaymentTransaction) -> Result<(), DomainError> {
            let mut transactions = self.transactions.lock().unwrap();
            if let Some(t) = transactions.iter_mut().find(|t| t.id == transaction.id) {
                *t = transaction.clone();
            }
            Ok(())
        }

        async fn find_latest_paid_for_subscription(
            &self,
            subscription_id: &SubscriptionId,
        ) -> Result<Option<PaymentTransaction>, DomainError> {
            let transactions = self.transactions.lock().unwrap();
            Ok(transactions
                .iter()
                .rev()
                .find(|t| {
                    &t.subscription_id == subscription_id
                        && t.status == TransactionStatus::Paid
                })
                .cloned())
        }
    }

    struct MockWebhookEventRepository {
        records: Mutex<Vec<WebhookEventRecord>>,
    }

    impl MockWebhookEventRepository {
        fn new() -> Self {
            Self {
                records: Mutex::new(Vec::new()),
            }
        }

        fn records(&self) -> Vec<WebhookEventRecord> {
            self.records.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl WebhookEventRepository for MockWebhookEventRepository {
        async fn find_by_event_id(
            &self,
            event_id: &str,
        ) -> Result<Option<WebhookEventRecord>, DomainError> {
            let records = self.records.lock().unwrap();
            Ok(records.iter().find(|r| r.event_id == event_id).cloned())
        }

        async fn save(&self, record: WebhookEventRecord) -> Result<SaveResult, DomainError> {
            let mut records = self.records.lock().unwrap();
            if records.iter().any(|r| r.event_id == record.event_id) {
                return Ok(SaveResult::AlreadyExists);
            }
            records.push(record);
            Ok(SaveResult::Inserted)
        }

        async fn delete_before(&self, _cutoff: Timestamp) -> Result<u64, DomainError> {
            Ok(0)
        }
    }

    struct MockEventPublisher {
        published_events: Mutex<Vec<EventEnvelope>>,
    }

    impl MockEventPublisher {
        fn new() -> Self {
            Self {
                published_events: Mutex::new(Vec::new()),
            }
        }

        fn published_events(&self) -> Vec<EventEnvelope> {
            self.published_events.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl EventPublisher for MockEventPublisher {
        async fn publish(&self, event: EventEnvelope) -> Result<(), DomainError> {
            self.published_events.lock().unwrap().push(event);
            Ok(())
        }
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Test Helpers
    // ════════════════════════════════════════════════════════════════════════════

    struct Fixture {
        subscriptions: Arc<MockSubscriptionRepository>,
        transactions: Arc<MockTransactionRepository>,
        webhooks: Arc<MockWebhookEventRepository>,
        publisher: Arc<MockEventPublisher>,
        handler: ProcessWebhookHandler,
    }

    fn fixture(subscriptions: Vec<Subscription>) -> Fixture {
        let subscriptions = Arc::new(MockSubscriptionRepository::with_subscriptions(subscriptions));
        let transactions = Arc::new(MockTransactionRepository::new());
        let webhooks = Arc::new(MockWebhookEventRepository::new());
        let publisher = Arc::new(MockEventPublisher::new());
        let handler = ProcessWebhookHandler::new(
            PagarmeWebhookVerifier::new(SecretString::new(TEST_SECRET.to_string())),
            subscriptions.clone(),
            transactions.clone(),
            webhooks.clone(),
            publisher.clone(),
        );
        Fixture {
            subscriptions,
            transactions,
            webhooks,
            publisher,
            handler,
        }
    }

    fn signed(payload: serde_json::Value) -> ProcessWebhookCommand {
        let body = payload.to_string().into_bytes();
        let signature = compute_test_signature(TEST_SECRET, &body);
        ProcessWebhookCommand {
            payload: body,
            signature,
        }
    }

    fn ts(rfc3339: &str) -> Timestamp {
        let dt = DateTime::parse_from_rfc3339(rfc3339)
            .unwrap()
            .with_timezone(&Utc);
        Timestamp::from_datetime(dt)
    }

    fn test_user_id() -> UserId {
        UserId::new("user-test-123").unwrap()
    }

    fn pending_subscription() -> Subscription {
        Subscription::create_pending(
            SubscriptionId::new(),
            test_user_id(),
            PlanType::Monthly,
            Timestamp::now(),
        )
    }

    fn active_subscription(gateway_id: &str) -> Subscription {
        let mut subscription = pending_subscription();
        subscription
            .activate(Timestamp::now(), Some(gateway_id.to_string()))
            .unwrap();
        subscription
    }

    fn order_paid_payload(event_id: &str, event_type: &str) -> serde_json::Value {
        json!({
            "id": event_id,
            "type": event_type,
            "created_at": "2025-11-15T12:00:00Z",
            "data": {
                "id": "or_123",
                "status": "paid",
                "amount": 4990,
                "metadata": { "user_id": "user-test-123" },
                "charges": [
                    { "id": "ch_123", "status": "paid", "payment_method": "pix" }
                ]
            }
        })
    }

    fn subscription_payload(event_id: &str, event_type: &str, gateway_id: &str) -> serde_json::Value {
        json!({
            "id": event_id,
            "type": event_type,
            "data": {
                "id": gateway_id,
                "current_period_start": "2025-12-15T00:00:00Z",
                "current_period_end": "2026-01-15T00:00:00Z",
                "metadata": {}
            }
        })
    }

    fn invoice_payload(event_id: &str, event_type: &str, gateway_id: &str) -> serde_json::Value {
        json!({
            "id": event_id,
            "type": event_type,
            "data": {
                "id": "in_42",
                "amount": 4990,
                "status": "paid",
                "payment_method": "credit_card",
                "subscription": {
                    "id": gateway_id,
                    "current_period_start": "2025-12-15T00:00:00Z",
                    "current_period_end": "2026-01-15T00:00:00Z",
                    "metadata": {}
                }
            }
        })
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Checkout Payment Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn order_paid_activates_the_pending_subscription() {
        let f = fixture(vec![pending_subscription()]);
        let cmd = signed(order_paid_payload("hook_1", "order.paid"));

        let result = f.handler.handle(cmd).await.unwrap();
        assert_eq!(result, WebhookResult::Processed);

        let subscriptions = f.subscriptions.get_subscriptions();
        assert_eq!(subscriptions[0].status, SubscriptionStatus::Active);
        assert_eq!(
            subscriptions[0].gateway_subscription_id.as_deref(),
            Some("or_123")
        );
        assert!(subscriptions[0].current_period_end.is_some());

        let transactions = f.transactions.get_transactions();
        assert_eq!(transactions.len(), 1);
        assert_eq!(transactions[0].status, TransactionStatus::Paid);
        assert_eq!(transactions[0].amount_cents, PlanType::Monthly.price_cents());
        assert_eq!(transactions[0].payment_method.as_deref(), Some("pix"));
        assert_eq!(transactions[0].gateway_transaction_id.as_deref(), Some("or_123"));

        let events = f.publisher.published_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, "billing.activated");
        assert_eq!(events[0].metadata.correlation_id.as_deref(), Some("hook_1"));

        let records = f.webhooks.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].result, "success");
    }

    #[tokio::test]
    async fn charge_paid_is_handled_like_order_paid() {
        let f = fixture(vec![pending_subscription()]);
        let cmd = signed(order_paid_payload("hook_2", "charge.paid"));

        let result = f.handler.handle(cmd).await.unwrap();

        assert_eq!(result, WebhookResult::Processed);
        assert_eq!(
            f.subscriptions.get_subscriptions()[0].status,
            SubscriptionStatus::Active
        );
    }

    #[tokio::test]
    async fn replayed_event_is_processed_once() {
        let f = fixture(vec![pending_subscription()]);
        let cmd = signed(order_paid_payload("hook_replay", "order.paid"));

        let first = f.handler.handle(cmd.clone()).await.unwrap();
        let second = f.handler.handle(cmd).await.unwrap();

        assert_eq!(first, WebhookResult::Processed);
        assert_eq!(second, WebhookResult::AlreadyProcessed);
        assert_eq!(f.transactions.get_transactions().len(), 1);
        assert_eq!(f.publisher.published_events().len(), 1);
        assert_eq!(f.webhooks.records().len(), 1);
    }

    #[tokio::test]
    async fn order_without_user_metadata_is_recorded_ignored() {
        let f = fixture(vec![pending_subscription()]);
        let cmd = signed(json!({
            "id": "hook_3",
            "type": "order.paid",
            "data": { "id": "or_456", "status": "paid", "metadata": {} }
        }));

        let result = f.handler.handle(cmd).await.unwrap();

        assert_eq!(result, WebhookResult::Processed);
        assert_eq!(
            f.subscriptions.get_subscriptions()[0].status,
            SubscriptionStatus::Pending
        );
        assert!(f.publisher.published_events().is_empty());

        let records = f.webhooks.records();
        assert_eq!(records[0].result, "ignored");
        assert!(records[0].error_message.is_some());
    }

    #[tokio::test]
    async fn order_payment_failed_expires_the_pending_subscription() {
        let f = fixture(vec![pending_subscription()]);
        let cmd = signed(order_paid_payload("hook_4", "order.payment_failed"));

        let result = f.handler.handle(cmd).await.unwrap();

        assert_eq!(result, WebhookResult::Processed);
        assert_eq!(
            f.subscriptions.get_subscriptions()[0].status,
            SubscriptionStatus::Expired
        );

        let transactions = f.transactions.get_transactions();
        assert_eq!(transactions.len(), 1);
        assert_eq!(transactions[0].status, TransactionStatus::Refused);

        let events = f.publisher.published_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, "billing.expired");
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Subscription Lifecycle Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn subscription_activated_stores_the_gateway_period() {
        let f = fixture(vec![pending_subscription()]);
        let cmd = signed(json!({
            "id": "hook_5",
            "type": "subscription.activated",
            "data": {
                "id": "sub_real_1",
                "status": "active",
                "current_period_start": "2025-11-15T00:00:00Z",
                "current_period_end": "2025-12-15T00:00:00Z",
                "metadata": { "user_id": "user-test-123" }
            }
        }));

        let result = f.handler.handle(cmd).await.unwrap();
        assert_eq!(result, WebhookResult::Processed);

        let subscriptions = f.subscriptions.get_subscriptions();
        assert_eq!(subscriptions[0].status, SubscriptionStatus::Active);
        assert_eq!(
            subscriptions[0].gateway_subscription_id.as_deref(),
            Some("sub_real_1")
        );
        assert_eq!(
            subscriptions[0].current_period_start,
            Some(ts("2025-11-15T00:00:00Z"))
        );
        assert_eq!(
            subscriptions[0].current_period_end,
            Some(ts("2025-12-15T00:00:00Z"))
        );
        assert_eq!(f.publisher.published_events()[0].event_type, "billing.activated");
    }

    #[tokio::test]
    async fn subscription_activated_with_other_gateway_status_is_ignored() {
        let f = fixture(vec![pending_subscription()]);
        let cmd = signed(json!({
            "id": "hook_6",
            "type": "subscription.activated",
            "data": {
                "id": "sub_real_1",
                "status": "canceled",
                "metadata": { "user_id": "user-test-123" }
            }
        }));

        let result = f.handler.handle(cmd).await.unwrap();

        assert_eq!(result, WebhookResult::Processed);
        assert_eq!(
            f.subscriptions.get_subscriptions()[0].status,
            SubscriptionStatus::Pending
        );
        assert_eq!(f.webhooks.records()[0].result, "ignored");
    }

    #[tokio::test]
    async fn subscription_activated_adopts_gateway_id_when_payment_won_the_race() {
        // order.paid already activated the row and stored the order id
        let f = fixture(vec![active_subscription("or_123")]);
        let cmd = signed(json!({
            "id": "hook_7",
            "type": "subscription.activated",
            "data": {
                "id": "sub_real_1",
                "status": "active",
                "metadata": { "user_id": "user-test-123" }
            }
        }));

        let result = f.handler.handle(cmd).await.unwrap();
        assert_eq!(result, WebhookResult::Processed);

        let subscriptions = f.subscriptions.get_subscriptions();
        assert_eq!(subscriptions[0].status, SubscriptionStatus::Active);
        assert_eq!(
            subscriptions[0].gateway_subscription_id.as_deref(),
            Some("sub_real_1")
        );
        // The checkout payment already announced the activation
        assert!(f.publisher.published_events().is_empty());
        assert_eq!(f.webhooks.records()[0].result, "success");
    }

    #[tokio::test]
    async fn subscription_payment_succeeded_renews_the_period() {
        let f = fixture(vec![active_subscription("sub_pg_123")]);
        let cmd = signed(subscription_payload(
            "hook_8",
            "subscription.payment_succeeded",
            "sub_pg_123",
        ));

        let result = f.handler.handle(cmd).await.unwrap();
        assert_eq!(result, WebhookResult::Processed);

        let subscriptions = f.subscriptions.get_subscriptions();
        assert_eq!(subscriptions[0].status, SubscriptionStatus::Active);
        assert_eq!(
            subscriptions[0].current_period_end,
            Some(ts("2026-01-15T00:00:00Z"))
        );

        let events = f.publisher.published_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, "billing.renewed");
    }

    #[tokio::test]
    async fn renewal_applies_a_scheduled_cancellation() {
        let mut subscription = active_subscription("sub_pg_123");
        subscription
            .schedule_cancel_at_period_end(Timestamp::now())
            .unwrap();
        subscription.current_period_end = Some(Timestamp::now().minus_days(1));
        let f = fixture(vec![subscription]);
        let cmd = signed(subscription_payload(
            "hook_9",
            "subscription.renewed",
            "sub_pg_123",
        ));

        let result = f.handler.handle(cmd).await.unwrap();
        assert_eq!(result, WebhookResult::Processed);

        let subscriptions = f.subscriptions.get_subscriptions();
        assert_eq!(subscriptions[0].status, SubscriptionStatus::Cancelled);
        assert!(!subscriptions[0].cancel_at_period_end);

        let events = f.publisher.published_events();
        assert_eq!(events[0].event_type, "billing.cancelled");
    }

    #[tokio::test]
    async fn renewal_applies_a_due_plan_change() {
        let mut subscription = active_subscription("sub_pg_123");
        subscription
            .schedule_plan_change(PlanType::Annual, Timestamp::now())
            .unwrap();
        subscription.pending_plan_change_at = Some(Timestamp::now().minus_days(1));
        let f = fixture(vec![subscription]);
        let cmd = signed(subscription_payload(
            "hook_10",
            "subscription.renewed",
            "sub_pg_123",
        ));

        f.handler.handle(cmd).await.unwrap();

        let subscriptions = f.subscriptions.get_subscriptions();
        assert_eq!(subscriptions[0].plan_type, PlanType::Annual);
        assert_eq!(subscriptions[0].amount_cents, PlanType::Annual.price_cents());
        assert_eq!(subscriptions[0].pending_plan_type, None);
        assert_eq!(f.publisher.published_events()[0].event_type, "billing.renewed");
    }

    #[tokio::test]
    async fn subscription_canceled_mirrors_the_gateway() {
        let f = fixture(vec![active_subscription("sub_pg_123")]);
        let cmd = signed(subscription_payload(
            "hook_11",
            "subscription.canceled",
            "sub_pg_123",
        ));

        let result = f.handler.handle(cmd).await.unwrap();
        assert_eq!(result, WebhookResult::Processed);

        let subscriptions = f.subscriptions.get_subscriptions();
        assert_eq!(subscriptions[0].status, SubscriptionStatus::Cancelled);
        assert!(subscriptions[0].cancelled_at.is_some());
        assert_eq!(f.publisher.published_events()[0].event_type, "billing.cancelled");
    }

    #[tokio::test]
    async fn subscription_canceled_after_local_cancel_is_quiet() {
        let mut subscription = active_subscription("sub_pg_123");
        subscription.cancel_immediately(Timestamp::now()).unwrap();
        let f = fixture(vec![subscription]);
        let cmd = signed(subscription_payload(
            "hook_12",
            "subscription.canceled",
            "sub_pg_123",
        ));

        let result = f.handler.handle(cmd).await.unwrap();

        assert_eq!(result, WebhookResult::Processed);
        assert!(f.publisher.published_events().is_empty());
        assert_eq!(f.webhooks.records()[0].result, "success");
    }

    #[tokio::test]
    async fn subscription_expired_marks_the_row() {
        let f = fixture(vec![active_subscription("sub_pg_123")]);
        let cmd = signed(subscription_payload(
            "hook_13",
            "subscription.expired",
            "sub_pg_123",
        ));

        f.handler.handle(cmd).await.unwrap();

        assert_eq!(
            f.subscriptions.get_subscriptions()[0].status,
            SubscriptionStatus::Expired
        );
        assert_eq!(f.publisher.published_events()[0].event_type, "billing.expired");
    }

    #[tokio::test]
    async fn subscription_suspended_marks_the_row() {
        let f = fixture(vec![active_subscription("sub_pg_123")]);
        let cmd = signed(subscription_payload(
            "hook_14",
            "subscription.suspended",
            "sub_pg_123",
        ));

        f.handler.handle(cmd).await.unwrap();

        assert_eq!(
            f.subscriptions.get_subscriptions()[0].status,
            SubscriptionStatus::Suspended
        );
        assert_eq!(f.publisher.published_events()[0].event_type, "billing.suspended");
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Invoice Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn invoice_payment_records_a_transaction() {
        let f = fixture(vec![active_subscription("sub_pg_123")]);
        let cmd = signed(invoice_payload(
            "hook_15",
            "invoice.payment_succeeded",
            "sub_pg_123",
        ));

        let result = f.handler.handle(cmd).await.unwrap();
        assert_eq!(result, WebhookResult::Processed);

        let transactions = f.transactions.get_transactions();
        assert_eq!(transactions.len(), 1);
        assert_eq!(transactions[0].status, TransactionStatus::Paid);
        assert_eq!(transactions[0].gateway_transaction_id.as_deref(), Some("in_42"));
        assert_eq!(
            transactions[0].payment_method.as_deref(),
            Some("credit_card")
        );

        assert_eq!(
            f.subscriptions.get_subscriptions()[0].current_period_end,
            Some(ts("2026-01-15T00:00:00Z"))
        );
        assert_eq!(f.publisher.published_events()[0].event_type, "billing.renewed");
    }

    #[tokio::test]
    async fn invoice_without_subscription_is_ignored() {
        let f = fixture(vec![active_subscription("sub_pg_123")]);
        let cmd = signed(json!({
            "id": "hook_16",
            "type": "invoice.payment_succeeded",
            "data": { "id": "in_43", "status": "paid" }
        }));

        let result = f.handler.handle(cmd).await.unwrap();

        assert_eq!(result, WebhookResult::Processed);
        assert!(f.transactions.get_transactions().is_empty());
        assert_eq!(f.webhooks.records()[0].result, "ignored");
    }

    #[tokio::test]
    async fn invoice_payment_failed_keeps_the_subscription_active() {
        let f = fixture(vec![active_subscription("sub_pg_123")]);
        let cmd = signed(invoice_payload(
            "hook_17",
            "invoice.payment_failed",
            "sub_pg_123",
        ));

        let result = f.handler.handle(cmd).await.unwrap();
        assert_eq!(result, WebhookResult::Processed);

        assert_eq!(
            f.subscriptions.get_subscriptions()[0].status,
            SubscriptionStatus::Active
        );

        let transactions = f.transactions.get_transactions();
        assert_eq!(transactions.len(), 1);
        assert_eq!(transactions[0].status, TransactionStatus::Failed);

        let events = f.publisher.published_events();
        assert_eq!(events[0].event_type, "billing.payment_failed");
    }

    #[tokio::test]
    async fn subscription_payment_failed_records_a_failed_transaction() {
        let f = fixture(vec![active_subscription("sub_pg_123")]);
        let cmd = signed(subscription_payload(
            "hook_19",
            "subscription.payment_failed",
            "sub_pg_123",
        ));

        let result = f.handler.handle(cmd).await.unwrap();
        assert_eq!(result, WebhookResult::Processed);

        // Landed in the ledger as a handled event, not an ignored one
        assert_eq!(f.webhooks.records()[0].result, "success");

        assert_eq!(
            f.subscriptions.get_subscriptions()[0].status,
            SubscriptionStatus::Active
        );

        let transactions = f.transactions.get_transactions();
        assert_eq!(transactions.len(), 1);
        assert_eq!(transactions[0].status, TransactionStatus::Failed);

        let events = f.publisher.published_events();
        assert_eq!(events[0].event_type, "billing.payment_failed");
    }

    #[tokio::test]
    async fn unknown_event_type_is_acknowledged() {
        let f = fixture(vec![]);
        let cmd = signed(json!({
            "id": "hook_18",
            "type": "customer.updated",
            "data": { "id": "cus_1" }
        }));

        let result = f.handler.handle(cmd).await.unwrap();

        assert_eq!(result, WebhookResult::Processed);
        assert_eq!(f.webhooks.records()[0].result, "ignored");
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Failure Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn rejects_an_invalid_signature() {
        let f = fixture(vec![pending_subscription()]);
        let body = order_paid_payload("hook_19", "order.paid").to_string().into_bytes();
        let cmd = ProcessWebhookCommand {
            payload: body,
            signature: "deadbeef".repeat(8),
        };

        let result = f.handler.handle(cmd).await;

        assert!(matches!(result, Err(WebhookError::InvalidSignature)));
        assert!(f.webhooks.records().is_empty());
        assert!(f.publisher.published_events().is_empty());
    }

    #[tokio::test]
    async fn rejects_a_malformed_payload_with_valid_signature() {
        let f = fixture(vec![]);
        let body = b"not json".to_vec();
        let signature = compute_test_signature(TEST_SECRET, &body);
        let cmd = ProcessWebhookCommand {
            payload: body,
            signature,
        };

        let result = f.handler.handle(cmd).await;

        assert!(matches!(result, Err(WebhookError::ParseError(_))));
        assert!(f.webhooks.records().is_empty());
    }

    #[tokio::test]
    async fn order_paid_without_a_pending_subscription_fails() {
        let f = fixture(vec![]);
        let cmd = signed(order_paid_payload("hook_20", "order.paid"));

        let result = f.handler.handle(cmd).await;

        assert!(matches!(result, Err(WebhookError::SubscriptionNotFound)));
        assert_eq!(f.webhooks.records()[0].result, "failed");
        assert!(f.publisher.published_events().is_empty());
    }

    #[tokio::test]
    async fn canceled_for_unknown_gateway_id_fails() {
        let f = fixture(vec![active_subscription("sub_pg_123")]);
        let cmd = signed(subscription_payload(
            "hook_21",
            "subscription.canceled",
            "sub_other",
        ));

        let result = f.handler.handle(cmd).await;

        assert!(matches!(result, Err(WebhookError::SubscriptionNotFound)));
        assert_eq!(f.webhooks.records()[0].result, "failed");
    }

    #[tokio::test]
    async fn canceled_on_an_expired_subscription_is_rejected() {
        let mut subscription = active_subscription("sub_pg_123");
        subscription.expire(Timestamp::now()).unwrap();
        let f = fixture(vec![subscription]);
        let cmd = signed(subscription_payload(
            "hook_22",
            "subscription.canceled",
            "sub_pg_123",
        ));

        let result = f.handler.handle(cmd).await;

        assert!(matches!(result, Err(WebhookError::InvalidTransition(_))));
        assert_eq!(f.webhooks.records()[0].result, "failed");
        assert_eq!(
            f.subscriptions.get_subscriptions()[0].status,
            SubscriptionStatus::Expired
        );
    }
}
