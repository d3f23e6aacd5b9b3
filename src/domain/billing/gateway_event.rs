//! Pagar.me webhook event model.
//!
//! Events arrive as a JSON envelope carrying an `id`, a `type` string
//! and a `data` payload whose shape depends on the event family:
//! orders and charges for one-off payments, subscriptions for lifecycle
//! notices, invoices for recurring billing cycles. The envelope is
//! parsed as-is and the payload is extracted into a typed struct by
//! whichever handler needs it, so unknown event families still
//! round-trip cleanly into the processed-events ledger.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::foundation::Timestamp;

/// A webhook event received from Pagar.me.
///
/// The `data` field is kept as raw JSON because its shape varies by
/// event type. Use [`PagarmeEvent::deserialize_data`] to extract a
/// typed payload once the event type is known.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagarmeEvent {
    /// Unique event identifier (hook_xxx format).
    pub id: String,

    /// Event type string (e.g., "order.paid", "subscription.renewed").
    #[serde(rename = "type")]
    pub event_type: String,

    /// When Pagar.me emitted the event, as an RFC 3339 string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,

    /// Event payload. Shape depends on the event type.
    #[serde(default)]
    pub data: Value,
}

impl PagarmeEvent {
    /// Deserializes the data payload into a typed struct.
    pub fn deserialize_data<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.data.clone())
    }

    /// Parses the event type string into a known event type.
    pub fn parsed_type(&self) -> PagarmeEventType {
        PagarmeEventType::from_str(&self.event_type)
    }
}

/// Known Pagar.me event types relevant to subscription billing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PagarmeEventType {
    /// A one-off order was paid (initial checkout).
    OrderPaid,
    /// A charge settled (delivered alongside order.paid).
    ChargePaid,
    /// A one-off order failed to collect.
    OrderPaymentFailed,
    /// A charge was refused or failed.
    ChargeFailed,
    /// A recurring subscription became active at the gateway.
    SubscriptionActivated,
    /// A recurring payment settled.
    SubscriptionPaymentSucceeded,
    /// A recurring payment failed to collect.
    SubscriptionPaymentFailed,
    /// The subscription was cancelled at the gateway.
    SubscriptionCanceled,
    /// The subscription expired at the gateway.
    SubscriptionExpired,
    /// The subscription was suspended at the gateway.
    SubscriptionSuspended,
    /// The subscription rolled over into a new billing period.
    SubscriptionRenewed,
    /// An invoice for a billing cycle was paid.
    InvoicePaymentSucceeded,
    /// An invoice for a billing cycle failed to collect.
    InvoicePaymentFailed,
    /// Any event type we don't handle.
    Unknown,
}

impl PagarmeEventType {
    /// Parses an event type string.
    ///
    /// Pagar.me has shipped both "subscription.canceled" and
    /// "subscription.cancelled" spellings; both are accepted.
    pub fn from_str(s: &str) -> Self {
        match s {
            "order.paid" => PagarmeEventType::OrderPaid,
            "charge.paid" => PagarmeEventType::ChargePaid,
            "order.payment_failed" => PagarmeEventType::OrderPaymentFailed,
            "charge.failed" => PagarmeEventType::ChargeFailed,
            "subscription.activated" => PagarmeEventType::SubscriptionActivated,
            "subscription.payment_succeeded" => PagarmeEventType::SubscriptionPaymentSucceeded,
            "subscription.payment_failed" => PagarmeEventType::SubscriptionPaymentFailed,
            "subscription.canceled" | "subscription.cancelled" => {
                PagarmeEventType::SubscriptionCanceled
            }
            "subscription.expired" => PagarmeEventType::SubscriptionExpired,
            "subscription.suspended" => PagarmeEventType::SubscriptionSuspended,
            "subscription.renewed" => PagarmeEventType::SubscriptionRenewed,
            "invoice.payment_succeeded" => PagarmeEventType::InvoicePaymentSucceeded,
            "invoice.payment_failed" => PagarmeEventType::InvoicePaymentFailed,
            _ => PagarmeEventType::Unknown,
        }
    }

    /// Returns the canonical event type string.
    pub fn as_str(&self) -> &'static str {
        match self {
            PagarmeEventType::OrderPaid => "order.paid",
            PagarmeEventType::ChargePaid => "charge.paid",
            PagarmeEventType::OrderPaymentFailed => "order.payment_failed",
            PagarmeEventType::ChargeFailed => "charge.failed",
            PagarmeEventType::SubscriptionActivated => "subscription.activated",
            PagarmeEventType::SubscriptionPaymentSucceeded => "subscription.payment_succeeded",
            PagarmeEventType::SubscriptionPaymentFailed => "subscription.payment_failed",
            PagarmeEventType::SubscriptionCanceled => "subscription.canceled",
            PagarmeEventType::SubscriptionExpired => "subscription.expired",
            PagarmeEventType::SubscriptionSuspended => "subscription.suspended",
            PagarmeEventType::SubscriptionRenewed => "subscription.renewed",
            PagarmeEventType::InvoicePaymentSucceeded => "invoice.payment_succeeded",
            PagarmeEventType::InvoicePaymentFailed => "invoice.payment_failed",
            PagarmeEventType::Unknown => "unknown",
        }
    }
}

/// Metadata stamped onto orders and subscriptions at checkout time.
///
/// The checkout flow records the platform user behind each gateway
/// object here, which is how order events are linked back to a
/// subscription row before a gateway subscription id exists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CheckoutMetadata {
    /// Platform user the gateway object belongs to.
    #[serde(default)]
    pub user_id: Option<String>,

    /// Plan the user checked out with.
    #[serde(default)]
    pub plan_id: Option<String>,
}

/// A charge nested inside an order or delivered as event data itself.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChargeData {
    /// Charge identifier (ch_xxx format).
    pub id: String,

    /// Gateway charge status.
    #[serde(default)]
    pub status: Option<String>,

    /// Charged amount in centavos.
    #[serde(default)]
    pub amount: Option<i64>,

    /// Payment method used (e.g., "credit_card", "pix").
    #[serde(default)]
    pub payment_method: Option<String>,
}

/// Payload for `order.*` and `charge.*` events.
///
/// Charge events deliver a charge object rather than an order, but the
/// fields read here (id and metadata) are present on both shapes, so a
/// single struct covers the family. The `charges` array is only
/// populated for order payloads.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OrderData {
    /// Order identifier (or_xxx) or charge identifier (ch_xxx).
    pub id: String,

    /// Gateway order status.
    #[serde(default)]
    pub status: Option<String>,

    /// Order total in centavos.
    #[serde(default)]
    pub amount: Option<i64>,

    /// Checkout metadata linking the order to a platform user.
    #[serde(default)]
    pub metadata: CheckoutMetadata,

    /// Charges collected against the order.
    #[serde(default)]
    pub charges: Vec<ChargeData>,
}

impl OrderData {
    /// Returns the id of the first charge, if any.
    pub fn first_charge_id(&self) -> Option<&str> {
        self.charges.first().map(|charge| charge.id.as_str())
    }

    /// Returns the payment method of the first charge, if any.
    pub fn payment_method(&self) -> Option<&str> {
        self.charges
            .iter()
            .find_map(|charge| charge.payment_method.as_deref())
    }
}

/// Payload for `subscription.*` events.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SubscriptionData {
    /// Gateway subscription identifier (sub_xxx format).
    pub id: String,

    /// Gateway subscription status.
    #[serde(default)]
    pub status: Option<String>,

    /// Start of the current billing period, as an RFC 3339 string.
    #[serde(default)]
    pub current_period_start: Option<String>,

    /// End of the current billing period, as an RFC 3339 string.
    #[serde(default)]
    pub current_period_end: Option<String>,

    /// Checkout metadata linking the subscription to a platform user.
    #[serde(default)]
    pub metadata: CheckoutMetadata,
}

impl SubscriptionData {
    /// Parses the period start date. Returns `None` when absent or unparseable.
    pub fn period_start(&self) -> Option<Timestamp> {
        parse_rfc3339(self.current_period_start.as_deref())
    }

    /// Parses the period end date. Returns `None` when absent or unparseable.
    pub fn period_end(&self) -> Option<Timestamp> {
        parse_rfc3339(self.current_period_end.as_deref())
    }
}

/// Payload for `invoice.*` events.
///
/// Invoices embed the subscription they bill, which is where the
/// gateway subscription id and the new period dates come from.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InvoiceData {
    /// Invoice identifier (in_xxx format).
    pub id: String,

    /// Invoiced amount in centavos.
    #[serde(default)]
    pub amount: Option<i64>,

    /// Gateway invoice status.
    #[serde(default)]
    pub status: Option<String>,

    /// Payment method used to settle the invoice.
    #[serde(default)]
    pub payment_method: Option<String>,

    /// The subscription this invoice bills.
    #[serde(default)]
    pub subscription: Option<SubscriptionData>,
}

fn parse_rfc3339(value: Option<&str>) -> Option<Timestamp> {
    let parsed = value?.parse::<DateTime<Utc>>().ok()?;
    Some(Timestamp::from_datetime(parsed))
}

/// Builder for constructing test events.
#[cfg(test)]
pub struct PagarmeEventBuilder {
    id: String,
    event_type: String,
    created_at: Option<String>,
    data: Value,
}

#[cfg(test)]
impl Default for PagarmeEventBuilder {
    fn default() -> Self {
        Self {
            id: "hook_test_123".to_string(),
            event_type: "order.paid".to_string(),
            created_at: Some("2025-11-15T00:00:00Z".to_string()),
            data: serde_json::json!({}),
        }
    }
}

#[cfg(test)]
impl PagarmeEventBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = event_type.into();
        self
    }

    pub fn data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }

    pub fn build(self) -> PagarmeEvent {
        PagarmeEvent {
            id: self.id,
            event_type: self.event_type,
            created_at: self.created_at,
            data: self.data,
        }
    }
}
