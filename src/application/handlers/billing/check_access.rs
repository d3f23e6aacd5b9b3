//! CheckAccessHandler - Query handler for the platform access gate.

use std::sync::Arc;

use crate::domain::billing::{BillingError, SubscriptionStatus};
use crate::domain::foundation::{Timestamp, UserId};
use crate::ports::SubscriptionRepository;

/// Query to check whether a user currently has paid access.
#[derive(Debug, Clone)]
pub struct CheckAccessQuery {
    pub user_id: UserId,
}

/// Access decision returned to the gate.
///
/// `has_access` is the paid-access rule only. A pending subscription
/// inside its trial window reports `trial: true` with `has_access`
/// still false; the frontend decides what trial users may see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckAccessResult {
    pub has_access: bool,
    pub trial: bool,
    pub days_remaining: i64,
    pub reason: String,
}

/// Handler for access checks.
///
/// A user without a subscription is a normal answer here, not an
/// error: the gate gets `has_access: false` and a reason it can show.
pub struct CheckAccessHandler {
    repository: Arc<dyn SubscriptionRepository>,
}

impl CheckAccessHandler {
    pub fn new(repository: Arc<dyn SubscriptionRepository>) -> Self {
        Self { repository }
    }

    pub async fn handle(&self, query: CheckAccessQuery) -> Result<CheckAccessResult, BillingError> {
        let subscription = match self.repository.find_by_user_id(&query.user_id).await? {
            Some(subscription) => subscription,
            None => {
                return Ok(CheckAccessResult {
                    has_access: false,
                    trial: false,
                    days_remaining: 0,
                    reason: "No subscription found".to_string(),
                })
            }
        };

        let now = Timestamp::now();
        let has_access = subscription.has_access(now);
        let trial = subscription.is_in_trial(now);

        let reason = if has_access {
            format!(
                "Active {} subscription",
                subscription.plan_type.display_name()
            )
        } else if trial {
            "Trial access while awaiting first payment".to_string()
        } else {
            match subscription.status {
                SubscriptionStatus::Pending => "Awaiting first payment confirmation".to_string(),
                SubscriptionStatus::Active => "Billing period has ended".to_string(),
                SubscriptionStatus::Cancelled => "Subscription is cancelled".to_string(),
                SubscriptionStatus::Expired => "Subscription has expired".to_string(),
                SubscriptionStatus::Suspended => "Subscription is suspended".to_string(),
            }
        };

        Ok(CheckAccessResult {
            has_access,
            trial,
            days_remaining: subscription.days_remaining(now),
            reason,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::billing::{PlanType, Subscription};
    use crate::domain::foundation::{DomainError, ErrorCode, SubscriptionId};
    use async_trait::async_trait;

    // ════════════════════════════════════════════════════════════════════════════
    // Mock Implementation
    // ════════════════════════════════════════════════════════════════════════════

    struct MockSubscriptionRepository {
        subscriptions: Vec<Subscription>,
        fail_read: bool,
    }

    impl MockSubscriptionRepository {
        fn new() -> Self {
            Self {
                subscriptions: Vec::new(),
                fail_read: false,
            }
        }

        fn with_subscription(subscription: Subscription) -> Self {
            Self {
                subscriptions: vec![subscription],
                fail_read: false,
            }
        }

        fn failing() -> Self {
            Self {
                subscriptions: Vec::new(),
                fail_read: true,
            }
        }
    }

    #[async_trait]
    impl SubscriptionRepository for MockSubscriptionRepository {
        async fn save(&self, _subscription: &Subscription) -> Result<(), DomainError> {
            Ok(())
        }

        async fn update(&self, _subscription: &Subscription) -> Result<(), DomainError> {
            Ok(())
        }

        async fn find_by_id(
            &self,
            _id: &SubscriptionId,
        ) -> Result<Option<Subscription>, DomainError> {
            Ok(None)
        }

        async fn find_by_user_id(
            &self,
            user_id: &UserId,
        ) -> Result<Option<Subscription>, DomainError> {
            if self.fail_read {
                return Err(DomainError::new(
                    ErrorCode::DatabaseError,
                    "Simulated read failure",
                ));
            }
            Ok(self
                .subscriptions
                .iter()
                .find(|s| &s.user_id == user_id)
                .cloned())
        }

        async fn find_pending_by_user_id(
            &self,
            _user_id: &UserId,
        ) -> Result<Option<Subscription>, DomainError> {
            Ok(None)
        }

        async fn find_by_gateway_subscription_id(
            &self,
            _gateway_id: &str,
        ) -> Result<Option<Subscription>, DomainError> {
            Ok(None)
        }

        async fn find_due_plan_changes(
            &self,
            _now: Timestamp,
        ) -> Result<Vec<Subscription>, DomainError> {
            Ok(vec![])
        }
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Test Helpers
    // ════════════════════════════════════════════════════════════════════════════

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

    fn active_subscription() -> Subscription {
        let mut subscription = pending_subscription();
        subscription
            .activate(Timestamp::now(), Some("sub_pg_123".to_string()))
            .unwrap();
        subscription
    }

    async fn decide(subscription: Subscription) -> CheckAccessResult {
        let repo = Arc::new(MockSubscriptionRepository::with_subscription(subscription));
        let handler = CheckAccessHandler::new(repo);
        handler
            .handle(CheckAccessQuery {
                user_id: test_user_id(),
            })
            .await
            .unwrap()
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Success Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn active_subscription_has_access() {
        let result = decide(active_subscription()).await;

        assert!(result.has_access);
        assert!(!result.trial);
        assert!(result.days_remaining > 0);
        assert!(result.reason.contains("Active"));
    }

    #[tokio::test]
    async fn no_subscription_reports_no_access_without_error() {
        let repo = Arc::new(MockSubscriptionRepository::new());
        let handler = CheckAccessHandler::new(repo);

        let result = handler
            .handle(CheckAccessQuery {
                user_id: test_user_id(),
            })
            .await
            .unwrap();

        assert!(!result.has_access);
        assert!(!result.trial);
        assert_eq!(result.days_remaining, 0);
        assert_eq!(result.reason, "No subscription found");
    }

    #[tokio::test]
    async fn pending_within_trial_reports_trial_access() {
        let result = decide(pending_subscription()).await;

        assert!(!result.has_access);
        assert!(result.trial);
        assert!(result.reason.contains("Trial"));
    }

    #[tokio::test]
    async fn pending_after_trial_is_not_trial() {
        let mut subscription = pending_subscription();
        subscription.trial_ends_at = Some(Timestamp::now().minus_days(1));

        let result = decide(subscription).await;

        assert!(!result.has_access);
        assert!(!result.trial);
        assert!(result.reason.contains("Awaiting"));
    }

    #[tokio::test]
    async fn scheduled_cancellation_keeps_access_until_period_end() {
        let mut subscription = active_subscription();
        subscription
            .schedule_cancel_at_period_end(Timestamp::now())
            .unwrap();

        let result = decide(subscription).await;

        assert!(result.has_access);
    }

    #[tokio::test]
    async fn active_past_period_end_has_no_access() {
        let mut subscription = active_subscription();
        subscription.current_period_end = Some(Timestamp::now().minus_days(1));

        let result = decide(subscription).await;

        assert!(!result.has_access);
        assert!(result.days_remaining <= 0);
        assert_eq!(result.reason, "Billing period has ended");
    }

    #[tokio::test]
    async fn cancelled_subscription_has_no_access() {
        let mut subscription = active_subscription();
        subscription.cancel_immediately(Timestamp::now()).unwrap();

        let result = decide(subscription).await;

        assert!(!result.has_access);
        assert_eq!(result.reason, "Subscription is cancelled");
    }

    #[tokio::test]
    async fn suspended_subscription_has_no_access() {
        let mut subscription = active_subscription();
        subscription.suspend(Timestamp::now()).unwrap();

        let result = decide(subscription).await;

        assert!(!result.has_access);
        assert_eq!(result.reason, "Subscription is suspended");
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Failure Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn fails_when_repository_fails() {
        let repo = Arc::new(MockSubscriptionRepository::failing());
        let handler = CheckAccessHandler::new(repo);

        let result = handler
            .handle(CheckAccessQuery {
                user_id: test_user_id(),
            })
            .await;

        assert!(result.is_err());
    }
}
