//! Subscription status state machine.
//!
//! Defines all possible subscription states and valid transitions
//! according to the billing lifecycle.

use crate::domain::foundation::StateMachine;
use serde::{Deserialize, Serialize};

/// Subscription status.
///
/// Represents the current state of a user's subscription in the
/// payment lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    /// Initial state after checkout, awaiting first payment confirmation.
    /// No paid access until a payment event arrives.
    Pending,

    /// Fully paid subscription. Grants access while the billing period
    /// has not ended.
    Active,

    /// Cancellation recorded. A deferred cancellation keeps the status
    /// Active until the period ends; this state means the cancellation
    /// has taken effect.
    Cancelled,

    /// Billing period ended without renewal, or the first payment was
    /// refused. User must pay again to regain access.
    Expired,

    /// Gateway suspended the subscription (e.g. repeated payment
    /// failures). No access until payment recovers.
    Suspended,
}

impl SubscriptionStatus {
    /// Returns true if this status can grant paid access.
    ///
    /// Only Active qualifies; the aggregate additionally requires the
    /// billing period to not have ended.
    pub fn grants_access(&self) -> bool {
        matches!(self, SubscriptionStatus::Active)
    }

    /// Returns true if a plan change may be scheduled in this status.
    ///
    /// Cancelled is included: a user who cancelled at period end may
    /// still switch the plan that a future resubscription bills.
    pub fn can_change_plan(&self) -> bool {
        matches!(
            self,
            SubscriptionStatus::Active | SubscriptionStatus::Cancelled
        )
    }

    /// Maps a gateway status string to the local enum.
    ///
    /// Unknown strings map to Pending rather than erroring, so a new
    /// gateway status never breaks webhook ingestion.
    pub fn from_gateway(status: &str) -> Self {
        match status {
            "active" => SubscriptionStatus::Active,
            "canceled" | "cancelled" => SubscriptionStatus::Cancelled,
            "expired" => SubscriptionStatus::Expired,
            "suspended" => SubscriptionStatus::Suspended,
            _ => SubscriptionStatus::Pending,
        }
    }
}

impl StateMachine for SubscriptionStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use SubscriptionStatus::*;
        matches!(
            (self, target),
            // From PENDING
            (Pending, Active)
                | (Pending, Cancelled)
                | (Pending, Expired)
                | (Pending, Suspended)
            // From ACTIVE
                | (Active, Active) // Renewal
                | (Active, Cancelled)
                | (Active, Expired)
                | (Active, Suspended)
            // From CANCELLED
                | (Cancelled, Active) // New successful payment
                | (Cancelled, Expired)
                | (Cancelled, Suspended)
            // From EXPIRED
                | (Expired, Active) // New successful payment
                | (Expired, Suspended)
            // From SUSPENDED
                | (Suspended, Active) // Payment recovered
                | (Suspended, Cancelled)
                | (Suspended, Expired)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use SubscriptionStatus::*;
        match self {
            Pending => vec![Active, Cancelled, Expired, Suspended],
            Active => vec![Active, Cancelled, Expired, Suspended],
            Cancelled => vec![Active, Expired, Suspended],
            Expired => vec![Active, Suspended],
            Suspended => vec![Active, Cancelled, Expired],
        }
    }
}
