//! Plan catalog.
//!
//! Represents the subscription plans available on AnestEasy. The catalog
//! is fixed (three plans, prices in BRL cents), so it lives on the enum
//! rather than in the database.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::Timestamp;

/// Subscription plan type.
///
/// Determines the billing interval and the price snapshotted onto the
/// subscription at each billing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanType {
    /// Monthly plan - R$ 79,00 per month.
    Monthly,

    /// Quarterly plan - R$ 199,00 every three months.
    Quarterly,

    /// Annual plan - R$ 690,00 per year, best value.
    Annual,
}

impl PlanType {
    /// Returns the plan price in integer cents (BRL).
    pub fn price_cents(&self) -> i64 {
        match self {
            PlanType::Monthly => 7_900,
            PlanType::Quarterly => 19_900,
            PlanType::Annual => 69_000,
        }
    }

    /// Returns the wire identifier for this plan, as used in gateway
    /// metadata and API payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanType::Monthly => "monthly",
            PlanType::Quarterly => "quarterly",
            PlanType::Annual => "annual",
        }
    }

    /// Returns the display name for this plan.
    pub fn display_name(&self) -> &'static str {
        match self {
            PlanType::Monthly => "Mensal",
            PlanType::Quarterly => "Trimestral",
            PlanType::Annual => "Anual",
        }
    }

    /// Returns the billing interval in calendar months.
    pub fn interval_months(&self) -> u32 {
        match self {
            PlanType::Monthly => 1,
            PlanType::Quarterly => 3,
            PlanType::Annual => 12,
        }
    }

    /// Computes the period end for a billing period starting at `start`.
    ///
    /// Uses calendar arithmetic: monthly advances one month, quarterly
    /// three months, annual one year.
    pub fn period_end_from(&self, start: Timestamp) -> Timestamp {
        match self {
            PlanType::Annual => start.add_years(1),
            _ => start.add_calendar_months(self.interval_months()),
        }
    }
}

impl std::fmt::Display for PlanType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}
