//! Billing domain events.
//!
//! Events emitted during subscription lifecycle changes. These events are used for:
//! - Audit logging (all state transitions)
//! - Integration with other modules (access control changes)
//! - Email notifications (payment failed, refund processed, etc.)
//!
//! # Event Naming Convention
//!
//! Events are named in past tense to indicate something that has already happened:
//! - `PlanChangeScheduled` not `SchedulePlanChange`
//! - `RefundProcessed` not `ProcessRefund`

use crate::domain::foundation::{
    DomainEvent, EventId, SubscriptionId, Timestamp, UserId,
};
use serde::{Deserialize, Serialize};

use super::PlanType;

/// Events that occur during the subscription lifecycle.
///
/// All state transitions emit events for audit logging and integration.
/// Each event carries its own `event_id` so envelopes stay stable when an
/// event is re-published.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BillingEvent {
    /// Subscription was activated after a confirmed payment.
    ///
    /// State transition: Pending → Active
    ///
    /// Trigger: `order.paid`/`charge.paid` or `subscription.activated` webhook
    Activated {
        event_id: EventId,
        subscription_id: SubscriptionId,
        user_id: UserId,
        plan_type: PlanType,
        period_start: Timestamp,
        period_end: Timestamp,
        occurred_at: Timestamp,
    },

    /// Subscription was renewed for a new billing period.
    ///
    /// State transition: Active → Active (renewal)
    ///
    /// Trigger: `subscription.renewed` or `invoice.payment_succeeded` webhook
    Renewed {
        event_id: EventId,
        subscription_id: SubscriptionId,
        user_id: UserId,
        plan_type: PlanType,
        new_period_start: Timestamp,
        new_period_end: Timestamp,
        occurred_at: Timestamp,
    },

    /// Subscription was cancelled, immediately or at period end.
    ///
    /// State transition: Active → Cancelled (immediate), or Active stays
    /// Active until `effective_at` (deferred)
    ///
    /// Trigger: user cancel endpoint, `subscription.canceled` webhook, or a
    /// scheduled cancellation taking effect at renewal
    Cancelled {
        event_id: EventId,
        subscription_id: SubscriptionId,
        user_id: UserId,
        effective_at: Timestamp,
        immediate: bool,
        occurred_at: Timestamp,
    },

    /// A plan change was scheduled for a future date.
    ///
    /// Trigger: user change-plan endpoint
    PlanChangeScheduled {
        event_id: EventId,
        subscription_id: SubscriptionId,
        user_id: UserId,
        current_plan: PlanType,
        new_plan: PlanType,
        effective_at: Timestamp,
        occurred_at: Timestamp,
    },

    /// A scheduled plan change took effect.
    ///
    /// Trigger: the periodic sweep, or a renewal applying a due change
    PlanChangeApplied {
        event_id: EventId,
        subscription_id: SubscriptionId,
        user_id: UserId,
        previous_plan: PlanType,
        new_plan: PlanType,
        occurred_at: Timestamp,
    },

    /// A refund was processed and the subscription cancelled.
    ///
    /// State transition: Active/Cancelled → Cancelled + refund recorded
    ///
    /// Trigger: user refund endpoint after the gateway confirms
    RefundProcessed {
        event_id: EventId,
        subscription_id: SubscriptionId,
        user_id: UserId,
        gateway_transaction_id: Option<String>,
        amount_cents: i64,
        days_used: u32,
        occurred_at: Timestamp,
    },

    /// A recurring charge failed; the gateway will retry.
    ///
    /// State transition: none (status unchanged while the gateway retries)
    ///
    /// Trigger: `invoice.payment_failed` webhook
    PaymentFailed {
        event_id: EventId,
        subscription_id: SubscriptionId,
        user_id: UserId,
        gateway_transaction_id: Option<String>,
        occurred_at: Timestamp,
    },

    /// Subscription was suspended by the gateway.
    ///
    /// State transition: any → Suspended
    ///
    /// Trigger: `subscription.suspended` webhook
    Suspended {
        event_id: EventId,
        subscription_id: SubscriptionId,
        user_id: UserId,
        occurred_at: Timestamp,
    },

    /// Subscription expired.
    ///
    /// State transition: Pending → Expired (refused payment) or
    /// Active → Expired (gateway reported)
    ///
    /// Trigger: `order.payment_failed`/`charge.failed` or
    /// `subscription.expired` webhook
    Expired {
        event_id: EventId,
        subscription_id: SubscriptionId,
        user_id: UserId,
        reason: ExpiredReason,
        occurred_at: Timestamp,
    },
}

/// Reason why a subscription expired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExpiredReason {
    /// First charge was refused, the pending subscription never activated.
    PaymentRefused,

    /// The gateway reported the subscription as expired.
    GatewayReported,
}

impl std::fmt::Display for ExpiredReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExpiredReason::PaymentRefused => write!(f, "payment_refused"),
            ExpiredReason::GatewayReported => write!(f, "gateway_reported"),
        }
    }
}

impl BillingEvent {
    /// Returns the subscription this event belongs to.
    pub fn subscription_id(&self) -> SubscriptionId {
        match self {
            BillingEvent::Activated { subscription_id, .. }
            | BillingEvent::Renewed { subscription_id, .. }
            | BillingEvent::Cancelled { subscription_id, .. }
            | BillingEvent::PlanChangeScheduled { subscription_id, .. }
            | BillingEvent::PlanChangeApplied { subscription_id, .. }
            | BillingEvent::RefundProcessed { subscription_id, .. }
            | BillingEvent::PaymentFailed { subscription_id, .. }
            | BillingEvent::Suspended { subscription_id, .. }
            | BillingEvent::Expired { subscription_id, .. } => *subscription_id,
        }
    }

    /// Returns the user ID associated with this event.
    pub fn user_id(&self) -> &UserId {
        match self {
            BillingEvent::Activated { user_id, .. }
            | BillingEvent::Renewed { user_id, .. }
            | BillingEvent::Cancelled { user_id, .. }
            | BillingEvent::PlanChangeScheduled { user_id, .. }
            | BillingEvent::PlanChangeApplied { user_id, .. }
            | BillingEvent::RefundProcessed { user_id, .. }
            | BillingEvent::PaymentFailed { user_id, .. }
            | BillingEvent::Suspended { user_id, .. }
            | BillingEvent::Expired { user_id, .. } => user_id,
        }
    }
}

impl DomainEvent for BillingEvent {
    fn event_type(&self) -> &'static str {
        match self {
            BillingEvent::Activated { .. } => "billing.activated",
            BillingEvent::Renewed { .. } => "billing.renewed",
            BillingEvent::Cancelled { .. } => "billing.cancelled",
            BillingEvent::PlanChangeScheduled { .. } => "billing.plan_change_scheduled",
            BillingEvent::PlanChangeApplied { .. } => "billing.plan_change_applied",
            BillingEvent::RefundProcessed { .. } => "billing.refund_processed",
            BillingEvent::PaymentFailed { .. } => "billing.payment_failed",
            BillingEvent::Suspended { .. } => "billing.suspended",
            BillingEvent::Expired { .. } => "billing.expired",
        }
    }

    fn schema_version(&self) -> u32 {
        1
    }

    fn aggregate_id(&self) -> String {
        self.subscription_id().to_string()
    }

    fn aggregate_type(&self) -> &'static str {
        "Subscription"
    }

    fn occurred_at(&self) -> Timestamp {
        match self {
            BillingEvent::Activated { occurred_at, .. }
            | BillingEvent::Renewed { occurred_at, .. }
            | BillingEvent::Cancelled { occurred_at, .. }
            | BillingEvent::PlanChangeScheduled { occurred_at, .. }
            | BillingEvent::PlanChangeApplied { occurred_at, .. }
            | BillingEvent::RefundProcessed { occurred_at, .. }
            | BillingEvent::PaymentFailed { occurred_at, .. }
            | BillingEvent::Suspended { occurred_at, .. }
            | BillingEvent::Expired { occurred_at, .. } => *occurred_at,
        }
    }

    fn event_id(&self) -> EventId {
        match self {
            BillingEvent::Activated { event_id, .. }
            | BillingEvent::Renewed { event_id, .. }
            | BillingEvent::Cancelled { event_id, .. }
            | BillingEvent::PlanChangeScheduled { event_id, .. }
            | BillingEvent::PlanChangeApplied { event_id, .. }
            | BillingEvent::RefundProcessed { event_id, .. }
            | BillingEvent::PaymentFailed { event_id, .. }
            | BillingEvent::Suspended { event_id, .. }
            | BillingEvent::Expired { event_id, .. } => event_id.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::SerializableDomainEvent;

    fn test_subscription_id() -> SubscriptionId {
        SubscriptionId::new()
    }

    fn test_user_id() -> UserId {
        UserId::new("user-test-123").unwrap()
    }

    fn now() -> Timestamp {
        Timestamp::now()
    }

    // ============================================================
    // Event Construction Tests
    // ============================================================

    #[test]
    fn activated_event_contains_period_dates() {
        let period_start = now();
        let period_end = now().add_days(30);

        let event = BillingEvent::Activated {
            event_id: EventId::new(),
            subscription_id: test_subscription_id(),
            user_id: test_user_id(),
            plan_type: PlanType::Monthly,
            period_start,
            period_end,
            occurred_at: now(),
        };

        assert_eq!(event.event_type(), "billing.activated");
        if let BillingEvent::Activated {
            period_start: ps,
            period_end: pe,
            ..
        } = event
        {
            assert_eq!(ps, period_start);
            assert_eq!(pe, period_end);
        } else {
            panic!("Expected Activated event");
        }
    }

    #[test]
    fn cancelled_event_distinguishes_immediate_from_deferred() {
        let effective = now().add_days(30);

        let event = BillingEvent::Cancelled {
            event_id: EventId::new(),
            subscription_id: test_subscription_id(),
            user_id: test_user_id(),
            effective_at: effective,
            immediate: false,
            occurred_at: now(),
        };

        assert_eq!(event.event_type(), "billing.cancelled");
        if let BillingEvent::Cancelled {
            effective_at,
            immediate,
            ..
        } = event
        {
            assert_eq!(effective_at, effective);
            assert!(!immediate);
        } else {
            panic!("Expected Cancelled event");
        }
    }

    #[test]
    fn plan_change_scheduled_captures_both_plans() {
        let event = BillingEvent::PlanChangeScheduled {
            event_id: EventId::new(),
            subscription_id: test_subscription_id(),
            user_id: test_user_id(),
            current_plan: PlanType::Monthly,
            new_plan: PlanType::Annual,
            effective_at: now().add_days(15),
            occurred_at: now(),
        };

        assert_eq!(event.event_type(), "billing.plan_change_scheduled");
        if let BillingEvent::PlanChangeScheduled {
            current_plan,
            new_plan,
            ..
        } = event
        {
            assert_eq!(current_plan, PlanType::Monthly);
            assert_eq!(new_plan, PlanType::Annual);
        } else {
            panic!("Expected PlanChangeScheduled event");
        }
    }

    #[test]
    fn refund_processed_captures_amount_and_days_used() {
        let event = BillingEvent::RefundProcessed {
            event_id: EventId::new(),
            subscription_id: test_subscription_id(),
            user_id: test_user_id(),
            gateway_transaction_id: Some("ch_123".to_string()),
            amount_cents: 7_900,
            days_used: 3,
            occurred_at: now(),
        };

        assert_eq!(event.event_type(), "billing.refund_processed");
        if let BillingEvent::RefundProcessed {
            amount_cents,
            days_used,
            ..
        } = event
        {
            assert_eq!(amount_cents, 7_900);
            assert_eq!(days_used, 3);
        } else {
            panic!("Expected RefundProcessed event");
        }
    }

    #[test]
    fn expired_event_captures_reason() {
        let event = BillingEvent::Expired {
            event_id: EventId::new(),
            subscription_id: test_subscription_id(),
            user_id: test_user_id(),
            reason: ExpiredReason::PaymentRefused,
            occurred_at: now(),
        };

        assert_eq!(event.event_type(), "billing.expired");
        if let BillingEvent::Expired { reason, .. } = event {
            assert_eq!(reason, ExpiredReason::PaymentRefused);
        } else {
            panic!("Expected Expired event");
        }
    }

    // ============================================================
    // Event Type Tests
    // ============================================================

    #[test]
    fn all_event_types_are_namespaced() {
        let events = vec![
            BillingEvent::Activated {
                event_id: EventId::new(),
                subscription_id: test_subscription_id(),
                user_id: test_user_id(),
                plan_type: PlanType::Monthly,
                period_start: now(),
                period_end: now(),
                occurred_at: now(),
            },
            BillingEvent::Renewed {
                event_id: EventId::new(),
                subscription_id: test_subscription_id(),
                user_id: test_user_id(),
                plan_type: PlanType::Quarterly,
                new_period_start: now(),
                new_period_end: now(),
                occurred_at: now(),
            },
            BillingEvent::Cancelled {
                event_id: EventId::new(),
                subscription_id: test_subscription_id(),
                user_id: test_user_id(),
                effective_at: now(),
                immediate: true,
                occurred_at: now(),
            },
            BillingEvent::PlanChangeScheduled {
                event_id: EventId::new(),
                subscription_id: test_subscription_id(),
                user_id: test_user_id(),
                current_plan: PlanType::Monthly,
                new_plan: PlanType::Annual,
                effective_at: now(),
                occurred_at: now(),
            },
            BillingEvent::PlanChangeApplied {
                event_id: EventId::new(),
                subscription_id: test_subscription_id(),
                user_id: test_user_id(),
                previous_plan: PlanType::Monthly,
                new_plan: PlanType::Annual,
                occurred_at: now(),
            },
            BillingEvent::RefundProcessed {
                event_id: EventId::new(),
                subscription_id: test_subscription_id(),
                user_id: test_user_id(),
                gateway_transaction_id: None,
                amount_cents: 7_900,
                days_used: 1,
                occurred_at: now(),
            },
            BillingEvent::PaymentFailed {
                event_id: EventId::new(),
                subscription_id: test_subscription_id(),
                user_id: test_user_id(),
                gateway_transaction_id: None,
                occurred_at: now(),
            },
            BillingEvent::Suspended {
                event_id: EventId::new(),
                subscription_id: test_subscription_id(),
                user_id: test_user_id(),
                occurred_at: now(),
            },
            BillingEvent::Expired {
                event_id: EventId::new(),
                subscription_id: test_subscription_id(),
                user_id: test_user_id(),
                reason: ExpiredReason::GatewayReported,
                occurred_at: now(),
            },
        ];

        for event in events {
            assert!(
                event.event_type().starts_with("billing."),
                "Event type {} should be namespaced with 'billing.'",
                event.event_type()
            );
        }
    }

    // ============================================================
    // DomainEvent Implementation Tests
    // ============================================================

    #[test]
    fn aggregate_id_is_the_subscription_id() {
        let subscription_id = test_subscription_id();
        let event = BillingEvent::Suspended {
            event_id: EventId::new(),
            subscription_id,
            user_id: test_user_id(),
            occurred_at: now(),
        };

        assert_eq!(event.aggregate_id(), subscription_id.to_string());
        assert_eq!(event.aggregate_type(), "Subscription");
        assert_eq!(event.schema_version(), 1);
    }

    #[test]
    fn envelope_carries_event_identity() {
        let event_id = EventId::new();
        let event = BillingEvent::PaymentFailed {
            event_id: event_id.clone(),
            subscription_id: test_subscription_id(),
            user_id: test_user_id(),
            gateway_transaction_id: Some("ch_456".to_string()),
            occurred_at: now(),
        };

        let envelope = event.to_envelope();
        assert_eq!(envelope.event_id, event_id);
        assert_eq!(envelope.event_type, "billing.payment_failed");
        assert_eq!(envelope.schema_version, 1);
        assert!(envelope.payload.to_string().contains("ch_456"));
    }

    // ============================================================
    // ExpiredReason Tests
    // ============================================================

    #[test]
    fn expired_reason_display() {
        assert_eq!(ExpiredReason::PaymentRefused.to_string(), "payment_refused");
        assert_eq!(
            ExpiredReason::GatewayReported.to_string(),
            "gateway_reported"
        );
    }

    #[test]
    fn expired_reason_serialization_round_trip() {
        let reasons = vec![ExpiredReason::PaymentRefused, ExpiredReason::GatewayReported];

        for reason in reasons {
            let json = serde_json::to_string(&reason).unwrap();
            let restored: ExpiredReason = serde_json::from_str(&json).unwrap();
            assert_eq!(reason, restored);
        }
    }

    // ============================================================
    // Serialization Tests
    // ============================================================

    #[test]
    fn billing_event_serializes_to_json() {
        let event = BillingEvent::PlanChangeApplied {
            event_id: EventId::new(),
            subscription_id: test_subscription_id(),
            user_id: test_user_id(),
            previous_plan: PlanType::Monthly,
            new_plan: PlanType::Quarterly,
            occurred_at: now(),
        };

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("PlanChangeApplied"));
        assert!(json.contains("subscription_id"));
        assert!(json.contains("previous_plan"));
    }

    #[test]
    fn billing_event_deserializes_from_json() {
        let event = BillingEvent::Suspended {
            event_id: EventId::new(),
            subscription_id: test_subscription_id(),
            user_id: test_user_id(),
            occurred_at: now(),
        };

        let json = serde_json::to_string(&event).unwrap();
        let restored: BillingEvent = serde_json::from_str(&json).unwrap();

        assert_eq!(event.event_type(), restored.event_type());
    }

    // ============================================================
    // Accessor Method Tests
    // ============================================================

    #[test]
    fn user_id_accessor_returns_correct_value() {
        let user_id = test_user_id();
        let event = BillingEvent::Renewed {
            event_id: EventId::new(),
            subscription_id: test_subscription_id(),
            user_id: user_id.clone(),
            plan_type: PlanType::Annual,
            new_period_start: now(),
            new_period_end: now(),
            occurred_at: now(),
        };

        assert_eq!(event.user_id(), &user_id);
    }

    #[test]
    fn occurred_at_accessor_returns_correct_value() {
        let occurred_at = now();
        let event = BillingEvent::Suspended {
            event_id: EventId::new(),
            subscription_id: test_subscription_id(),
            user_id: test_user_id(),
            occurred_at,
        };

        assert_eq!(event.occurred_at(), occurred_at);
    }
}
