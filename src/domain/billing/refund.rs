//! Refund eligibility window.
//!
//! AnestEasy grants a full refund during the first days of a paid
//! period. Eligibility is a strict window: once `days_used` reaches the
//! limit, or a refund has already been processed, requests are rejected.

use serde::{Deserialize, Serialize};

/// Number of days during which a refund may be requested.
///
/// `days_used < REFUND_WINDOW_DAYS` is eligible; exactly 8 days is not.
pub const REFUND_WINDOW_DAYS: u32 = 8;

/// Outcome of a refund eligibility check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundEligibility {
    /// Whether a refund may be requested right now.
    pub eligible: bool,

    /// Days elapsed since the period started, partial days rounded up.
    pub days_used: u32,

    /// Human-readable reason when not eligible.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl RefundEligibility {
    /// Builds an eligible result.
    pub fn eligible(days_used: u32) -> Self {
        Self {
            eligible: true,
            days_used,
            reason: None,
        }
    }

    /// Builds an ineligible result because the window has passed.
    pub fn window_expired(days_used: u32) -> Self {
        Self {
            eligible: false,
            days_used,
            reason: Some(format!(
                "Refund window of {} days exceeded ({} days used)",
                REFUND_WINDOW_DAYS, days_used
            )),
        }
    }

    /// Builds an ineligible result because a refund was already processed.
    pub fn already_processed(days_used: u32) -> Self {
        Self {
            eligible: false,
            days_used,
            reason: Some("A refund has already been processed for this subscription".to_string()),
        }
    }
}
