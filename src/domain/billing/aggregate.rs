//! Subscription aggregate entity.
//!
//! The Subscription aggregate represents a user's paid plan on the platform.
//! Each user has at most one Subscription. Users without a Subscription have
//! no paid access.
//!
//! # Design Decisions
//!
//! - **One per user**: Unique constraint on user_id enforced at database level
//! - **Money in cents**: All BRL amounts stored as i64 cents (not floats)
//! - **Deferred plan changes**: `plan_type` is never swapped in place; a
//!   change lands in `pending_plan_type` and the sweep applies it at
//!   `pending_plan_change_at`
//! - **Clock as input**: time-dependent rules take `now` from the caller so
//!   period and refund-window boundaries are exact
//! - **Optimistic locking**: `version` is bumped by the datastore on update,
//!   not by domain code

use crate::domain::foundation::{DomainError, ErrorCode, SubscriptionId, Timestamp, UserId};
use serde::{Deserialize, Serialize};

use super::{PlanType, RefundEligibility, SubscriptionStatus, REFUND_WINDOW_DAYS};

/// Days of trial access granted to a pending subscription after signup.
pub const TRIAL_PERIOD_DAYS: i64 = 7;

/// Fallback delay for a scheduled plan change when no period end is recorded.
pub const PLAN_CHANGE_FALLBACK_DAYS: i64 = 30;

/// Outcome of processing a renewal notice from the payment gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenewalOutcome {
    /// Period advanced; subscription remains active.
    Renewed,
    /// A cancellation scheduled for period end took effect instead.
    CancellationApplied,
}

/// Subscription aggregate - represents a user's paid plan.
///
/// # Invariants
///
/// - `id` is globally unique
/// - `user_id` is unique (one subscription per user)
/// - Status transitions follow state machine rules
/// - Period dates: `current_period_start <= current_period_end` when both set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    /// Unique identifier for this subscription.
    pub id: SubscriptionId,

    /// User who owns this subscription.
    pub user_id: UserId,

    /// Current status in the subscription lifecycle.
    pub status: SubscriptionStatus,

    /// Plan currently billed and displayed.
    pub plan_type: PlanType,

    /// Plan to switch to once `pending_plan_change_at` elapses.
    pub pending_plan_type: Option<PlanType>,

    /// When the pending plan change takes effect.
    pub pending_plan_change_at: Option<Timestamp>,

    /// Start of current billing period (set on first successful payment).
    pub current_period_start: Option<Timestamp>,

    /// End of current billing period (set on first successful payment).
    pub current_period_end: Option<Timestamp>,

    /// Whether the user asked to cancel once the paid period runs out.
    pub cancel_at_period_end: bool,

    /// When the cancellation happened or is scheduled to happen.
    pub cancelled_at: Option<Timestamp>,

    /// Whether the subscription is still inside the refund window.
    pub refund_eligible: bool,

    /// Whether the user has asked for a refund.
    pub refund_requested: bool,

    /// When a refund was processed (set at most once).
    pub refund_processed_at: Option<Timestamp>,

    /// Amount billed per period, in BRL cents.
    pub amount_cents: i64,

    /// Pagar.me subscription ID (set once the gateway confirms).
    pub gateway_subscription_id: Option<String>,

    /// When trial access for a pending subscription runs out.
    pub trial_ends_at: Option<Timestamp>,

    /// Days of the current period consumed, snapshotted by the refund flow.
    pub days_used: u32,

    /// Optimistic locking version, incremented by the datastore.
    pub version: i64,

    /// When the subscription was created.
    pub created_at: Timestamp,

    /// When the subscription was last updated.
    pub updated_at: Timestamp,
}

impl Subscription {
    /// Create a new pending subscription awaiting first payment.
    ///
    /// The price is snapshotted from the plan catalog and trial access runs
    /// for [`TRIAL_PERIOD_DAYS`] from creation.
    pub fn create_pending(
        id: SubscriptionId,
        user_id: UserId,
        plan_type: PlanType,
        now: Timestamp,
    ) -> Self {
        Self {
            id,
            user_id,
            status: SubscriptionStatus::Pending,
            plan_type,
            pending_plan_type: None,
            pending_plan_change_at: None,
            current_period_start: None,
            current_period_end: None,
            cancel_at_period_end: false,
            cancelled_at: None,
            refund_eligible: true,
            refund_requested: false,
            refund_processed_at: None,
            amount_cents: plan_type.price_cents(),
            gateway_subscription_id: None,
            trial_ends_at: Some(now.add_days(TRIAL_PERIOD_DAYS)),
            days_used: 0,
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    /// Point this row at a new checkout attempt.
    ///
    /// A user keeps a single subscription row, so a new checkout after a
    /// previous subscription ended re-arms that row instead of inserting a
    /// second one: status returns to Pending, the plan and price are
    /// re-snapshotted, period, cancellation and refund state are cleared,
    /// and the payment link id becomes the gateway reference until a
    /// payment webhook replaces it.
    ///
    /// # Errors
    ///
    /// Returns error while the subscription is still Active; an active
    /// subscriber has nothing to check out for.
    pub fn start_checkout(
        &mut self,
        plan_type: PlanType,
        gateway_link_id: String,
        now: Timestamp,
    ) -> Result<(), DomainError> {
        if self.status == SubscriptionStatus::Active {
            return Err(DomainError::new(
                ErrorCode::InvalidStateTransition,
                "Cannot start a checkout while a subscription is active",
            ));
        }
        self.status = SubscriptionStatus::Pending;
        self.plan_type = plan_type;
        self.amount_cents = plan_type.price_cents();
        self.pending_plan_type = None;
        self.pending_plan_change_at = None;
        self.current_period_start = None;
        self.current_period_end = None;
        self.cancel_at_period_end = false;
        self.cancelled_at = None;
        self.refund_eligible = true;
        self.refund_requested = false;
        self.refund_processed_at = None;
        self.days_used = 0;
        self.gateway_subscription_id = Some(gateway_link_id);
        self.trial_ends_at = Some(now.add_days(TRIAL_PERIOD_DAYS));
        self.updated_at = now;
        Ok(())
    }

    /// Check if this subscription grants paid access at `now`.
    ///
    /// Granted iff status is Active and `now <= current_period_end`
    /// (equality still grants). `cancel_at_period_end` alone never
    /// revokes access. No recorded period end means no paid access.
    pub fn has_access(&self, now: Timestamp) -> bool {
        if !self.status.grants_access() {
            return false;
        }
        match self.current_period_end {
            Some(end) => !end.is_before(&now),
            None => false,
        }
    }

    /// Whether trial access applies at `now`.
    ///
    /// Only pending subscriptions get trial access, and only until
    /// [`trial_deadline`](Self::trial_deadline).
    pub fn is_in_trial(&self, now: Timestamp) -> bool {
        self.status == SubscriptionStatus::Pending && !self.trial_deadline().is_before(&now)
    }

    /// When trial access runs out.
    ///
    /// Falls back to `created_at + TRIAL_PERIOD_DAYS` for rows without a
    /// recorded trial end.
    pub fn trial_deadline(&self) -> Timestamp {
        self.trial_ends_at
            .unwrap_or_else(|| self.created_at.add_days(TRIAL_PERIOD_DAYS))
    }

    /// Whole days until period end. `<= 0` once the period has passed,
    /// `0` when no period end is recorded.
    pub fn days_remaining(&self, now: Timestamp) -> i64 {
        match self.current_period_end {
            Some(end) => end.duration_since(&now).num_days(),
            None => 0,
        }
    }

    /// Activate this subscription after a confirmed payment.
    ///
    /// Starts a fresh billing period at `now`, with the end computed from
    /// the current plan, and re-snapshots the amount from the catalog.
    ///
    /// # Errors
    ///
    /// Returns error if transition from current status is not allowed.
    pub fn activate(
        &mut self,
        now: Timestamp,
        gateway_subscription_id: Option<String>,
    ) -> Result<(), DomainError> {
        self.transition_to(SubscriptionStatus::Active)?;
        self.current_period_start = Some(now);
        self.current_period_end = Some(self.plan_type.period_end_from(now));
        self.amount_cents = self.plan_type.price_cents();
        if let Some(gateway_id) = gateway_subscription_id {
            self.gateway_subscription_id = Some(gateway_id);
        }
        self.updated_at = now;
        Ok(())
    }

    /// Activate with period bounds reported by the gateway.
    ///
    /// Used when a gateway notice carries its own billing period dates.
    /// Absent bounds fall back to `now` and the plan's period length. The
    /// amount snapshot and gateway id are left untouched.
    ///
    /// # Errors
    ///
    /// Returns error if transition from current status is not allowed.
    pub fn activate_from_gateway(
        &mut self,
        now: Timestamp,
        period_start: Option<Timestamp>,
        period_end: Option<Timestamp>,
    ) -> Result<(), DomainError> {
        self.transition_to(SubscriptionStatus::Active)?;
        let start = period_start.unwrap_or(now);
        self.current_period_start = Some(start);
        self.current_period_end =
            Some(period_end.unwrap_or_else(|| self.plan_type.period_end_from(start)));
        self.updated_at = now;
        Ok(())
    }

    /// Process a renewal notice from the gateway.
    ///
    /// A cancellation scheduled for period end takes effect here once the
    /// stored period has actually ended; otherwise any due pending plan
    /// change is applied and the period advances. Period bounds reported
    /// by the gateway win over computed ones; absent bounds fall back to
    /// `now` and the plan's own period length.
    ///
    /// # Errors
    ///
    /// Returns error if transition from current status is not allowed.
    pub fn renew(
        &mut self,
        now: Timestamp,
        period_start: Option<Timestamp>,
        period_end: Option<Timestamp>,
    ) -> Result<RenewalOutcome, DomainError> {
        if self.cancel_at_period_end && self.period_has_ended(now) {
            self.transition_to(SubscriptionStatus::Cancelled)?;
            self.cancelled_at = Some(now);
            self.cancel_at_period_end = false;
            self.updated_at = now;
            return Ok(RenewalOutcome::CancellationApplied);
        }

        self.transition_to(SubscriptionStatus::Active)?;
        self.apply_pending_plan_change(now);
        let start = period_start.unwrap_or(now);
        self.current_period_start = Some(start);
        self.current_period_end =
            Some(period_end.unwrap_or_else(|| self.plan_type.period_end_from(start)));
        self.updated_at = now;
        Ok(RenewalOutcome::Renewed)
    }

    /// Cancel this subscription immediately, revoking access.
    ///
    /// # Errors
    ///
    /// Returns error if transition from current status is not allowed.
    pub fn cancel_immediately(&mut self, now: Timestamp) -> Result<(), DomainError> {
        self.transition_to(SubscriptionStatus::Cancelled)?;
        self.cancelled_at = Some(now);
        self.cancel_at_period_end = false;
        self.updated_at = now;
        Ok(())
    }

    /// Schedule cancellation for the end of the paid period.
    ///
    /// Status stays Active and access continues until the period ends;
    /// `cancelled_at` records the scheduled effective date.
    ///
    /// # Errors
    ///
    /// Returns error if the subscription is not currently Active.
    pub fn schedule_cancel_at_period_end(&mut self, now: Timestamp) -> Result<(), DomainError> {
        if self.status != SubscriptionStatus::Active {
            return Err(DomainError::new(
                ErrorCode::InvalidStateTransition,
                format!(
                    "Cannot schedule cancellation while subscription is {:?}",
                    self.status
                ),
            ));
        }
        self.cancel_at_period_end = true;
        self.cancelled_at = self.current_period_end;
        self.updated_at = now;
        Ok(())
    }

    /// Mirror a cancellation reported by the gateway.
    ///
    /// No-op when already cancelled. `cancelled_at` records when the
    /// gateway notice arrived, overwriting a scheduled effective date.
    ///
    /// # Errors
    ///
    /// Returns error if transition from current status is not allowed.
    pub fn gateway_cancelled(&mut self, now: Timestamp) -> Result<(), DomainError> {
        if self.status == SubscriptionStatus::Cancelled {
            return Ok(());
        }
        self.transition_to(SubscriptionStatus::Cancelled)?;
        self.cancelled_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Mark this subscription as expired. No-op when already expired.
    ///
    /// # Errors
    ///
    /// Returns error if transition from current status is not allowed.
    pub fn expire(&mut self, now: Timestamp) -> Result<(), DomainError> {
        if self.status == SubscriptionStatus::Expired {
            return Ok(());
        }
        self.transition_to(SubscriptionStatus::Expired)?;
        self.updated_at = now;
        Ok(())
    }

    /// Mark this subscription as suspended. No-op when already suspended.
    ///
    /// # Errors
    ///
    /// Returns error if transition from current status is not allowed.
    pub fn suspend(&mut self, now: Timestamp) -> Result<(), DomainError> {
        if self.status == SubscriptionStatus::Suspended {
            return Ok(());
        }
        self.transition_to(SubscriptionStatus::Suspended)?;
        self.updated_at = now;
        Ok(())
    }

    /// Schedule a switch to a different plan.
    ///
    /// The current plan keeps billing and displaying until
    /// `pending_plan_change_at`, which is the current period end or
    /// `now + PLAN_CHANGE_FALLBACK_DAYS` when no period end is recorded.
    ///
    /// # Errors
    ///
    /// Returns error if `new_plan` equals the current plan or the current
    /// status does not allow plan changes.
    pub fn schedule_plan_change(
        &mut self,
        new_plan: PlanType,
        now: Timestamp,
    ) -> Result<(), DomainError> {
        if new_plan == self.plan_type {
            return Err(DomainError::new(
                ErrorCode::InvalidPlan,
                format!(
                    "Subscription is already on the {} plan",
                    self.plan_type.display_name()
                ),
            ));
        }
        if !self.status.can_change_plan() {
            return Err(DomainError::new(
                ErrorCode::InvalidStateTransition,
                format!(
                    "Cannot change plan while subscription is {:?}",
                    self.status
                ),
            ));
        }

        self.pending_plan_type = Some(new_plan);
        self.pending_plan_change_at = Some(
            self.current_period_end
                .unwrap_or_else(|| now.add_days(PLAN_CHANGE_FALLBACK_DAYS)),
        );
        self.updated_at = now;
        Ok(())
    }

    /// Apply the pending plan change if its effective date has arrived.
    ///
    /// Returns `true` when the change was applied. A call before the
    /// effective date, or with nothing pending, is a no-op returning
    /// `false` - the sweep polls idempotently.
    pub fn apply_pending_plan_change(&mut self, now: Timestamp) -> bool {
        let (new_plan, due_at) = match (self.pending_plan_type, self.pending_plan_change_at) {
            (Some(plan), Some(at)) => (plan, at),
            _ => return false,
        };
        if now.is_before(&due_at) {
            return false;
        }

        self.plan_type = new_plan;
        self.amount_cents = new_plan.price_cents();
        self.pending_plan_type = None;
        self.pending_plan_change_at = None;
        self.updated_at = now;
        true
    }

    /// Evaluate refund eligibility at `now`.
    ///
    /// `days_used` counts from `current_period_start`, falling back to
    /// `created_at`, with a partial day rounding up. Eligible iff
    /// `days_used < REFUND_WINDOW_DAYS` and no refund was processed yet.
    pub fn refund_eligibility(&self, now: Timestamp) -> RefundEligibility {
        let start = self.current_period_start.unwrap_or(self.created_at);
        let days_used = now.days_between_ceil(&start);

        if self.refund_processed_at.is_some() {
            return RefundEligibility::already_processed(days_used);
        }
        if days_used >= REFUND_WINDOW_DAYS {
            return RefundEligibility::window_expired(days_used);
        }
        RefundEligibility::eligible(days_used)
    }

    /// Record an approved refund.
    ///
    /// The side effects are always coupled: the subscription is cancelled
    /// at `now`, `refund_processed_at` is stamped, the refund flags are set
    /// and `days_used` is refreshed.
    ///
    /// # Errors
    ///
    /// Returns error if transition from current status is not allowed.
    pub fn approve_refund(&mut self, now: Timestamp) -> Result<(), DomainError> {
        let eligibility = self.refund_eligibility(now);
        if self.status != SubscriptionStatus::Cancelled {
            self.transition_to(SubscriptionStatus::Cancelled)?;
        }
        self.days_used = eligibility.days_used;
        self.cancelled_at = Some(now);
        self.refund_processed_at = Some(now);
        self.refund_eligible = true;
        self.refund_requested = true;
        self.cancel_at_period_end = false;
        self.updated_at = now;
        Ok(())
    }

    /// Whether the current period ended strictly before `now`.
    fn period_has_ended(&self, now: Timestamp) -> bool {
        match self.current_period_end {
            Some(end) => end.is_before(&now),
            None => false,
        }
    }

    /// Transition to a new status using the state machine.
    fn transition_to(&mut self, target: SubscriptionStatus) -> Result<(), DomainError> {
        use crate::domain::foundation::StateMachine;

        self.status = self.status.transition_to(target).map_err(|_| {
            DomainError::new(
                ErrorCode::InvalidStateTransition,
                format!(
                    "Cannot transition subscription from {:?} to {:?}",
                    self.status, target
                ),
            )
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_subscription_id() -> SubscriptionId {
        SubscriptionId::new()
    }

    fn test_user_id() -> UserId {
        UserId::new("user-123").unwrap()
    }

    fn ts(s: &str) -> Timestamp {
        Timestamp::from_datetime(s.parse().unwrap())
    }

    fn pending_subscription() -> Subscription {
        Subscription::create_pending(
            test_subscription_id(),
            test_user_id(),
            PlanType::Monthly,
            ts("2025-11-15T00:00:00Z"),
        )
    }

    fn active_subscription() -> Subscription {
        let mut subscription = pending_subscription();
        subscription
            .activate(ts("2025-11-15T00:00:00Z"), Some("sub_gw123".to_string()))
            .unwrap();
        subscription
    }

    // Construction tests

    #[test]
    fn create_pending_starts_pending_with_snapshotted_price() {
        let subscription = pending_subscription();

        assert_eq!(subscription.status, SubscriptionStatus::Pending);
        assert_eq!(subscription.plan_type, PlanType::Monthly);
        assert_eq!(subscription.amount_cents, 7_900);
        assert!(subscription.current_period_start.is_none());
        assert!(subscription.current_period_end.is_none());
        assert!(subscription.refund_eligible);
        assert!(!subscription.refund_requested);
        assert_eq!(subscription.version, 1);
    }

    #[test]
    fn create_pending_sets_trial_deadline() {
        let subscription = pending_subscription();

        assert_eq!(
            subscription.trial_ends_at,
            Some(ts("2025-11-22T00:00:00Z"))
        );
    }

    #[test]
    fn start_checkout_rearms_an_expired_row() {
        let mut subscription = active_subscription();
        subscription.expire(ts("2025-12-16T00:00:00Z")).unwrap();

        subscription
            .start_checkout(
                PlanType::Annual,
                "pl_new456".to_string(),
                ts("2026-01-10T00:00:00Z"),
            )
            .unwrap();

        assert_eq!(subscription.status, SubscriptionStatus::Pending);
        assert_eq!(subscription.plan_type, PlanType::Annual);
        assert_eq!(subscription.amount_cents, 69_000);
        assert!(subscription.current_period_start.is_none());
        assert!(subscription.current_period_end.is_none());
        assert_eq!(
            subscription.gateway_subscription_id,
            Some("pl_new456".to_string())
        );
        assert_eq!(
            subscription.trial_ends_at,
            Some(ts("2026-01-17T00:00:00Z"))
        );
    }

    #[test]
    fn start_checkout_clears_refund_state_from_the_previous_run() {
        let mut subscription = active_subscription();
        subscription.approve_refund(ts("2025-11-18T00:00:00Z")).unwrap();
        assert!(subscription.refund_processed_at.is_some());

        subscription
            .start_checkout(
                PlanType::Monthly,
                "pl_new789".to_string(),
                ts("2026-02-01T00:00:00Z"),
            )
            .unwrap();

        assert!(subscription.refund_processed_at.is_none());
        assert!(!subscription.refund_requested);
        assert!(subscription.refund_eligible);
        assert!(subscription.cancelled_at.is_none());
    }

    #[test]
    fn start_checkout_rejected_while_active() {
        let mut subscription = active_subscription();

        let result = subscription.start_checkout(
            PlanType::Annual,
            "pl_new".to_string(),
            ts("2025-12-01T00:00:00Z"),
        );

        assert!(result.is_err());
        assert_eq!(subscription.status, SubscriptionStatus::Active);
        assert_eq!(subscription.plan_type, PlanType::Monthly);
    }

    // Access tests

    #[test]
    fn active_within_period_has_access() {
        let subscription = active_subscription();

        assert!(subscription.has_access(ts("2025-12-01T00:00:00Z")));
    }

    #[test]
    fn access_granted_at_exact_period_end() {
        let subscription = active_subscription();

        // Monthly activation on 2025-11-15 ends 2025-12-15
        assert!(subscription.has_access(ts("2025-12-15T00:00:00Z")));
    }

    #[test]
    fn no_access_after_period_end() {
        let subscription = active_subscription();

        assert!(!subscription.has_access(ts("2025-12-15T00:00:01Z")));
    }

    #[test]
    fn pending_subscription_has_no_paid_access() {
        let subscription = pending_subscription();

        assert!(!subscription.has_access(ts("2025-11-16T00:00:00Z")));
    }

    #[test]
    fn active_without_period_end_has_no_access() {
        let mut subscription = active_subscription();
        subscription.current_period_end = None;

        assert!(!subscription.has_access(ts("2025-11-16T00:00:00Z")));
    }

    #[test]
    fn scheduled_cancellation_does_not_revoke_access() {
        let mut subscription = active_subscription();
        subscription
            .schedule_cancel_at_period_end(ts("2025-11-20T00:00:00Z"))
            .unwrap();

        assert_eq!(subscription.status, SubscriptionStatus::Active);
        assert!(subscription.has_access(ts("2025-12-01T00:00:00Z")));
    }

    #[test]
    fn immediate_cancellation_revokes_access() {
        let mut subscription = active_subscription();
        subscription
            .cancel_immediately(ts("2025-11-20T00:00:00Z"))
            .unwrap();

        assert!(!subscription.has_access(ts("2025-11-21T00:00:00Z")));
    }

    // Trial tests

    #[test]
    fn pending_within_trial_window() {
        let subscription = pending_subscription();

        assert!(subscription.is_in_trial(ts("2025-11-20T00:00:00Z")));
        assert!(subscription.is_in_trial(ts("2025-11-22T00:00:00Z")));
    }

    #[test]
    fn trial_ends_after_deadline() {
        let subscription = pending_subscription();

        assert!(!subscription.is_in_trial(ts("2025-11-22T00:00:01Z")));
    }

    #[test]
    fn active_subscription_is_not_in_trial() {
        let subscription = active_subscription();

        assert!(!subscription.is_in_trial(ts("2025-11-16T00:00:00Z")));
    }

    #[test]
    fn trial_deadline_falls_back_to_created_at() {
        let mut subscription = pending_subscription();
        subscription.trial_ends_at = None;

        assert_eq!(subscription.trial_deadline(), ts("2025-11-22T00:00:00Z"));
    }

    // Days remaining tests

    #[test]
    fn days_remaining_counts_whole_days() {
        let mut subscription = active_subscription();
        subscription.current_period_end = Some(ts("2025-12-13T00:00:00Z"));

        assert_eq!(subscription.days_remaining(ts("2025-11-15T00:00:00Z")), 28);
    }

    #[test]
    fn days_remaining_not_positive_once_period_passed() {
        let subscription = active_subscription();

        assert!(subscription.days_remaining(ts("2025-12-20T00:00:00Z")) <= 0);
    }

    #[test]
    fn days_remaining_zero_without_period_end() {
        let subscription = pending_subscription();

        assert_eq!(subscription.days_remaining(ts("2025-11-16T00:00:00Z")), 0);
    }

    // Activation tests

    #[test]
    fn activate_starts_period_from_plan() {
        let mut subscription = pending_subscription();
        let result = subscription.activate(
            ts("2025-11-15T00:00:00Z"),
            Some("sub_gw123".to_string()),
        );

        assert!(result.is_ok());
        assert_eq!(subscription.status, SubscriptionStatus::Active);
        assert_eq!(
            subscription.current_period_start,
            Some(ts("2025-11-15T00:00:00Z"))
        );
        assert_eq!(
            subscription.current_period_end,
            Some(ts("2025-12-15T00:00:00Z"))
        );
        assert_eq!(
            subscription.gateway_subscription_id,
            Some("sub_gw123".to_string())
        );
    }

    #[test]
    fn activate_keeps_existing_gateway_id_when_none_given() {
        let mut subscription = active_subscription();
        subscription.activate(ts("2025-12-15T00:00:00Z"), None).unwrap();

        assert_eq!(
            subscription.gateway_subscription_id,
            Some("sub_gw123".to_string())
        );
    }

    #[test]
    fn expired_subscription_can_reactivate_on_payment() {
        let mut subscription = active_subscription();
        subscription.expire(ts("2025-12-16T00:00:00Z")).unwrap();

        let result = subscription.activate(ts("2025-12-17T00:00:00Z"), None);
        assert!(result.is_ok());
        assert_eq!(subscription.status, SubscriptionStatus::Active);
    }

    // Cancellation tests

    #[test]
    fn cancel_immediately_records_timestamp() {
        let mut subscription = active_subscription();
        let result = subscription.cancel_immediately(ts("2025-11-20T00:00:00Z"));

        assert!(result.is_ok());
        assert_eq!(subscription.status, SubscriptionStatus::Cancelled);
        assert_eq!(subscription.cancelled_at, Some(ts("2025-11-20T00:00:00Z")));
        assert!(!subscription.cancel_at_period_end);
    }

    #[test]
    fn cancel_immediately_twice_is_rejected() {
        let mut subscription = active_subscription();
        subscription
            .cancel_immediately(ts("2025-11-20T00:00:00Z"))
            .unwrap();

        let result = subscription.cancel_immediately(ts("2025-11-21T00:00:00Z"));
        assert!(result.is_err());
    }

    #[test]
    fn schedule_cancel_records_period_end_as_effective_date() {
        let mut subscription = active_subscription();
        let result = subscription.schedule_cancel_at_period_end(ts("2025-11-20T00:00:00Z"));

        assert!(result.is_ok());
        assert!(subscription.cancel_at_period_end);
        assert_eq!(subscription.cancelled_at, Some(ts("2025-12-15T00:00:00Z")));
        assert_eq!(subscription.status, SubscriptionStatus::Active);
    }

    #[test]
    fn schedule_cancel_requires_active_status() {
        let mut subscription = pending_subscription();
        let result = subscription.schedule_cancel_at_period_end(ts("2025-11-16T00:00:00Z"));

        assert!(result.is_err());
    }

    #[test]
    fn gateway_cancelled_is_idempotent() {
        let mut subscription = active_subscription();
        subscription.gateway_cancelled(ts("2025-11-20T00:00:00Z")).unwrap();
        subscription.gateway_cancelled(ts("2025-11-21T00:00:00Z")).unwrap();

        assert_eq!(subscription.status, SubscriptionStatus::Cancelled);
        assert_eq!(subscription.cancelled_at, Some(ts("2025-11-20T00:00:00Z")));
    }

    // Expiry and suspension tests

    #[test]
    fn pending_expires_on_refused_payment() {
        let mut subscription = pending_subscription();
        let result = subscription.expire(ts("2025-11-16T00:00:00Z"));

        assert!(result.is_ok());
        assert_eq!(subscription.status, SubscriptionStatus::Expired);
    }

    #[test]
    fn expire_twice_is_a_no_op() {
        let mut subscription = active_subscription();
        subscription.expire(ts("2025-12-16T00:00:00Z")).unwrap();
        let result = subscription.expire(ts("2025-12-17T00:00:00Z"));

        assert!(result.is_ok());
        assert_eq!(subscription.status, SubscriptionStatus::Expired);
    }

    #[test]
    fn suspend_twice_is_a_no_op() {
        let mut subscription = active_subscription();
        subscription.suspend(ts("2025-11-20T00:00:00Z")).unwrap();
        let result = subscription.suspend(ts("2025-11-21T00:00:00Z"));

        assert!(result.is_ok());
        assert_eq!(subscription.status, SubscriptionStatus::Suspended);
    }

    // Plan change tests

    #[test]
    fn schedule_plan_change_defers_to_period_end() {
        let mut subscription = active_subscription();
        let result =
            subscription.schedule_plan_change(PlanType::Quarterly, ts("2025-11-20T00:00:00Z"));

        assert!(result.is_ok());
        assert_eq!(subscription.plan_type, PlanType::Monthly);
        assert_eq!(subscription.pending_plan_type, Some(PlanType::Quarterly));
        assert_eq!(
            subscription.pending_plan_change_at,
            Some(ts("2025-12-15T00:00:00Z"))
        );
        assert_eq!(subscription.amount_cents, 7_900);
    }

    #[test]
    fn schedule_plan_change_rejects_same_plan() {
        let mut subscription = active_subscription();
        let result =
            subscription.schedule_plan_change(PlanType::Monthly, ts("2025-11-20T00:00:00Z"));

        assert!(result.is_err());
        assert!(subscription.pending_plan_type.is_none());
    }

    #[test]
    fn schedule_plan_change_rejects_expired_subscription() {
        let mut subscription = active_subscription();
        subscription.expire(ts("2025-12-16T00:00:00Z")).unwrap();

        let result =
            subscription.schedule_plan_change(PlanType::Annual, ts("2025-12-17T00:00:00Z"));
        assert!(result.is_err());
    }

    #[test]
    fn schedule_plan_change_falls_back_to_thirty_days() {
        let mut subscription = pending_subscription();
        subscription
            .cancel_immediately(ts("2025-11-16T00:00:00Z"))
            .unwrap();

        subscription
            .schedule_plan_change(PlanType::Annual, ts("2025-11-17T00:00:00Z"))
            .unwrap();
        assert_eq!(
            subscription.pending_plan_change_at,
            Some(ts("2025-12-17T00:00:00Z"))
        );
    }

    #[test]
    fn apply_pending_change_before_due_date_is_a_no_op() {
        let mut subscription = active_subscription();
        subscription
            .schedule_plan_change(PlanType::Quarterly, ts("2025-11-20T00:00:00Z"))
            .unwrap();

        let applied = subscription.apply_pending_plan_change(ts("2025-12-14T00:00:00Z"));

        assert!(!applied);
        assert_eq!(subscription.plan_type, PlanType::Monthly);
        assert_eq!(subscription.pending_plan_type, Some(PlanType::Quarterly));
    }

    #[test]
    fn apply_pending_change_at_due_date_swaps_plan_and_amount() {
        let mut subscription = active_subscription();
        subscription
            .schedule_plan_change(PlanType::Quarterly, ts("2025-11-20T00:00:00Z"))
            .unwrap();

        let applied = subscription.apply_pending_plan_change(ts("2025-12-15T00:00:00Z"));

        assert!(applied);
        assert_eq!(subscription.plan_type, PlanType::Quarterly);
        assert_eq!(subscription.amount_cents, 19_900);
        assert!(subscription.pending_plan_type.is_none());
        assert!(subscription.pending_plan_change_at.is_none());
    }

    #[test]
    fn apply_pending_change_without_pending_is_a_no_op() {
        let mut subscription = active_subscription();

        assert!(!subscription.apply_pending_plan_change(ts("2025-12-15T00:00:00Z")));
    }

    // Refund eligibility tests

    #[test]
    fn refund_eligible_on_first_day() {
        let subscription = active_subscription();
        let eligibility = subscription.refund_eligibility(ts("2025-11-15T01:00:00Z"));

        assert!(eligibility.eligible);
        assert_eq!(eligibility.days_used, 1);
    }

    #[test]
    fn refund_eligible_at_seven_days() {
        let subscription = active_subscription();
        let eligibility = subscription.refund_eligibility(ts("2025-11-22T00:00:00Z"));

        assert!(eligibility.eligible);
        assert_eq!(eligibility.days_used, 7);
    }

    #[test]
    fn refund_not_eligible_at_eight_days() {
        let subscription = active_subscription();
        let eligibility = subscription.refund_eligibility(ts("2025-11-23T00:00:00Z"));

        assert!(!eligibility.eligible);
        assert_eq!(eligibility.days_used, 8);
    }

    #[test]
    fn partial_eighth_day_counts_as_eight() {
        let subscription = active_subscription();
        let eligibility = subscription.refund_eligibility(ts("2025-11-22T01:00:00Z"));

        assert!(!eligibility.eligible);
        assert_eq!(eligibility.days_used, 8);
    }

    #[test]
    fn refund_window_counts_from_created_at_without_period() {
        let subscription = pending_subscription();
        let eligibility = subscription.refund_eligibility(ts("2025-11-18T00:00:00Z"));

        assert!(eligibility.eligible);
        assert_eq!(eligibility.days_used, 3);
    }

    #[test]
    fn processed_refund_blocks_future_eligibility() {
        let mut subscription = active_subscription();
        subscription.approve_refund(ts("2025-11-16T00:00:00Z")).unwrap();

        let eligibility = subscription.refund_eligibility(ts("2025-11-17T00:00:00Z"));
        assert!(!eligibility.eligible);
    }

    // Refund approval tests

    #[test]
    fn approve_refund_couples_cancellation_and_flags() {
        let mut subscription = active_subscription();
        let result = subscription.approve_refund(ts("2025-11-17T00:00:00Z"));

        assert!(result.is_ok());
        assert_eq!(subscription.status, SubscriptionStatus::Cancelled);
        assert_eq!(subscription.cancelled_at, Some(ts("2025-11-17T00:00:00Z")));
        assert_eq!(
            subscription.refund_processed_at,
            Some(ts("2025-11-17T00:00:00Z"))
        );
        assert!(subscription.refund_eligible);
        assert!(subscription.refund_requested);
        assert_eq!(subscription.days_used, 2);
    }

    #[test]
    fn approve_refund_works_on_cancelled_subscription() {
        let mut subscription = active_subscription();
        subscription
            .cancel_immediately(ts("2025-11-16T00:00:00Z"))
            .unwrap();

        let result = subscription.approve_refund(ts("2025-11-17T00:00:00Z"));
        assert!(result.is_ok());
        assert_eq!(
            subscription.refund_processed_at,
            Some(ts("2025-11-17T00:00:00Z"))
        );
    }

    // Renewal tests

    #[test]
    fn renew_advances_period_under_current_plan() {
        let mut subscription = active_subscription();
        let outcome = subscription
            .renew(ts("2025-12-15T00:00:00Z"), None, None)
            .unwrap();

        assert_eq!(outcome, RenewalOutcome::Renewed);
        assert_eq!(
            subscription.current_period_start,
            Some(ts("2025-12-15T00:00:00Z"))
        );
        assert_eq!(
            subscription.current_period_end,
            Some(ts("2026-01-15T00:00:00Z"))
        );
    }

    #[test]
    fn renew_prefers_gateway_period_bounds() {
        let mut subscription = active_subscription();
        let outcome = subscription
            .renew(
                ts("2025-12-15T02:00:00Z"),
                Some(ts("2025-12-15T00:00:00Z")),
                Some(ts("2026-01-14T00:00:00Z")),
            )
            .unwrap();

        assert_eq!(outcome, RenewalOutcome::Renewed);
        assert_eq!(
            subscription.current_period_start,
            Some(ts("2025-12-15T00:00:00Z"))
        );
        assert_eq!(
            subscription.current_period_end,
            Some(ts("2026-01-14T00:00:00Z"))
        );
    }

    #[test]
    fn renew_computes_end_from_gateway_start_when_end_missing() {
        let mut subscription = active_subscription();
        subscription
            .renew(
                ts("2025-12-16T00:00:00Z"),
                Some(ts("2025-12-15T00:00:00Z")),
                None,
            )
            .unwrap();

        assert_eq!(
            subscription.current_period_end,
            Some(ts("2026-01-15T00:00:00Z"))
        );
    }

    #[test]
    fn renew_applies_due_plan_change_first() {
        let mut subscription = active_subscription();
        subscription
            .schedule_plan_change(PlanType::Quarterly, ts("2025-11-20T00:00:00Z"))
            .unwrap();

        let outcome = subscription
            .renew(ts("2025-12-15T00:00:00Z"), None, None)
            .unwrap();

        assert_eq!(outcome, RenewalOutcome::Renewed);
        assert_eq!(subscription.plan_type, PlanType::Quarterly);
        assert_eq!(subscription.amount_cents, 19_900);
        assert_eq!(
            subscription.current_period_end,
            Some(ts("2026-03-15T00:00:00Z"))
        );
    }

    #[test]
    fn renew_honors_scheduled_cancel_once_period_ended() {
        let mut subscription = active_subscription();
        subscription
            .schedule_cancel_at_period_end(ts("2025-11-20T00:00:00Z"))
            .unwrap();

        let outcome = subscription
            .renew(ts("2025-12-16T00:00:00Z"), None, None)
            .unwrap();

        assert_eq!(outcome, RenewalOutcome::CancellationApplied);
        assert_eq!(subscription.status, SubscriptionStatus::Cancelled);
        assert_eq!(subscription.cancelled_at, Some(ts("2025-12-16T00:00:00Z")));
        assert!(!subscription.cancel_at_period_end);
    }

    #[test]
    fn renew_before_period_end_ignores_scheduled_cancel() {
        let mut subscription = active_subscription();
        subscription
            .schedule_cancel_at_period_end(ts("2025-11-20T00:00:00Z"))
            .unwrap();

        let outcome = subscription
            .renew(ts("2025-12-10T00:00:00Z"), None, None)
            .unwrap();

        assert_eq!(outcome, RenewalOutcome::Renewed);
        assert_eq!(subscription.status, SubscriptionStatus::Active);
    }

    // Gateway activation tests

    #[test]
    fn activate_from_gateway_uses_reported_period() {
        let mut subscription = pending_subscription();
        subscription
            .activate_from_gateway(
                ts("2025-11-15T12:00:00Z"),
                Some(ts("2025-11-15T00:00:00Z")),
                Some(ts("2025-12-15T00:00:00Z")),
            )
            .unwrap();

        assert_eq!(subscription.status, SubscriptionStatus::Active);
        assert_eq!(
            subscription.current_period_start,
            Some(ts("2025-11-15T00:00:00Z"))
        );
        assert_eq!(
            subscription.current_period_end,
            Some(ts("2025-12-15T00:00:00Z"))
        );
        assert!(subscription.gateway_subscription_id.is_none());
    }

    #[test]
    fn activate_from_gateway_falls_back_to_plan_period() {
        let mut subscription = pending_subscription();
        subscription
            .activate_from_gateway(ts("2025-11-15T00:00:00Z"), None, None)
            .unwrap();

        assert_eq!(
            subscription.current_period_end,
            Some(ts("2025-12-15T00:00:00Z"))
        );
    }
}
