//! Pagar.me payment gateway adapter.
//!
//! Implements the `PaymentGateway` trait against the Pagar.me core v5 API.
//! Covers the three outbound calls this service makes: creating a hosted
//! payment link for checkout, cancelling a recurring subscription and
//! refunding a settled charge. Webhook verification does not live here;
//! inbound events are verified in the domain layer.
//!
//! # Security
//!
//! - API key handled via `secrecy::SecretString`
//! - Authenticated with HTTP Basic auth as `{api_key}:` (empty password)
//!
//! # Configuration
//!
//! ```ignore
//! let config = PagarmeConfig::new(api_key);
//! let adapter = PagarmeGatewayAdapter::new(config);
//! ```

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

use crate::ports::{
    CancellationOutcome, CheckoutRequest, CheckoutSession, PaymentError, PaymentGateway,
};

/// How long a hosted payment link stays open, in seconds.
const PAYMENT_LINK_EXPIRES_SECONDS: u32 = 30 * 60;

/// Pagar.me API configuration.
#[derive(Clone)]
pub struct PagarmeConfig {
    /// Pagar.me secret API key (sk_live_... or sk_test_...).
    api_key: SecretString,

    /// Base URL for the Pagar.me API. Sandbox and production share it;
    /// the key prefix decides the environment.
    api_base_url: String,
}

impl PagarmeConfig {
    /// Create a new Pagar.me configuration.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::new(api_key.into()),
            api_base_url: "https://api.pagar.me/core/v5".to_string(),
        }
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    /// Whether the configured key targets the Pagar.me sandbox.
    pub fn is_test_mode(&self) -> bool {
        let key = self.api_key.expose_secret();
        key.starts_with("sk_test_") || key.starts_with("ak_test_")
    }
}

/// Pagar.me payment gateway adapter.
///
/// Implements `PaymentGateway` for the Pagar.me core v5 API.
pub struct PagarmeGatewayAdapter {
    config: PagarmeConfig,
    http_client: reqwest::Client,
}

#[derive(Serialize)]
struct PaymentLinkRequest<'a> {
    items: [PaymentLinkItem<'a>; 1],
    customer: PaymentLinkCustomer<'a>,
    payment_config: PaymentConfig,
    expires_in: u32,
    metadata: PaymentLinkMetadata<'a>,
}

#[derive(Serialize)]
struct PaymentLinkItem<'a> {
    amount: i64,
    description: &'a str,
    quantity: u32,
    code: &'a str,
}

#[derive(Serialize)]
struct PaymentLinkCustomer<'a> {
    name: &'a str,
    email: &'a str,
    document: &'a str,
    #[serde(rename = "type")]
    customer_type: &'static str,
    document_type: &'static str,
}

#[derive(Serialize)]
struct PaymentConfig {
    credit_card: CreditCardConfig,
    boleto: MethodToggle,
    pix: MethodToggle,
}

#[derive(Serialize)]
struct CreditCardConfig {
    enabled: bool,
    installments: [Installment; 1],
}

#[derive(Serialize)]
struct Installment {
    number: u32,
    total: i64,
}

#[derive(Serialize)]
struct MethodToggle {
    enabled: bool,
}

#[derive(Serialize)]
struct PaymentLinkMetadata<'a> {
    plan_id: &'a str,
    user_id: &'a str,
}

#[derive(Serialize)]
struct RefundRequest<'a> {
    amount: i64,
    metadata: RefundMetadata<'a>,
}

#[derive(Serialize)]
struct RefundMetadata<'a> {
    reason: &'a str,
}

impl PagarmeGatewayAdapter {
    /// Create a new Pagar.me adapter with the given configuration.
    pub fn new(config: PagarmeConfig) -> Self {
        Self {
            config,
            http_client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl PaymentGateway for PagarmeGatewayAdapter {
    async fn create_checkout(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutSession, PaymentError> {
        let url = format!("{}/paymentlinks", self.config.api_base_url);

        let body = PaymentLinkRequest {
            items: [PaymentLinkItem {
                amount: request.amount_cents,
                description: &request.description,
                quantity: 1,
                code: &request.plan_code,
            }],
            customer: PaymentLinkCustomer {
                name: &request.customer.name,
                email: &request.customer.email,
                document: &request.customer.document,
                customer_type: "individual",
                document_type: "CPF",
            },
            payment_config: PaymentConfig {
                credit_card: CreditCardConfig {
                    enabled: true,
                    installments: [Installment {
                        number: 1,
                        total: request.amount_cents,
                    }],
                },
                boleto: MethodToggle { enabled: false },
                pix: MethodToggle { enabled: false },
            },
            expires_in: PAYMENT_LINK_EXPIRES_SECONDS,
            metadata: PaymentLinkMetadata {
                plan_id: &request.plan_code,
                user_id: &request.user_id,
            },
        };

        let response = self
            .http_client
            .post(&url)
            .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
            .json(&body)
            .send()
            .await
            .map_err(|e| PaymentError::network(e.to_string()))?;

        let status = response.status();

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            let message = extract_error_message(&error_text);

            if status == reqwest::StatusCode::UNAUTHORIZED
                || status == reqwest::StatusCode::FORBIDDEN
            {
                return Err(PaymentError::authentication(message));
            }

            tracing::error!(
                status = status.as_u16(),
                error = %message,
                "Pagar.me create_checkout failed"
            );
            return Err(PaymentError::provider(format!(
                "Pagar.me API error ({}): {}",
                status.as_u16(),
                message
            )));
        }

        let value: serde_json::Value = response.json().await.map_err(|e| {
            PaymentError::provider(format!("unreadable payment link response: {}", e))
        })?;
        parse_payment_link(&value)
    }

    async fn cancel_subscription(
        &self,
        gateway_subscription_id: &str,
    ) -> Result<CancellationOutcome, PaymentError> {
        let url = format!(
            "{}/subscriptions/{}",
            self.config.api_base_url, gateway_subscription_id
        );

        let response = self
            .http_client
            .delete(&url)
            .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
            .send()
            .await
            .map_err(|e| PaymentError::network(e.to_string()))?;

        let status = response.status();

        if status.is_success() {
            // Pagar.me answers a successful DELETE with an empty body
            return Ok(CancellationOutcome::Cancelled);
        }

        let error_text = response.text().await.unwrap_or_default();
        let message = extract_error_message(&error_text);

        // Cancelling twice comes back as an error; the caller treats it
        // as success
        if is_already_cancelled(&message) {
            tracing::info!(
                subscription_id = %gateway_subscription_id,
                "Pagar.me reports subscription already cancelled"
            );
            return Ok(CancellationOutcome::AlreadyCancelled);
        }

        if status == reqwest::StatusCode::UNAUTHORIZED
            || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(PaymentError::authentication(message));
        }

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(PaymentError::not_found("Subscription"));
        }

        tracing::error!(
            status = status.as_u16(),
            error = %message,
            "Pagar.me cancel_subscription failed"
        );
        Err(PaymentError::provider(format!(
            "Pagar.me API error ({}): {}",
            status.as_u16(),
            message
        )))
    }

    async fn refund_transaction(
        &self,
        gateway_transaction_id: &str,
        amount_cents: i64,
    ) -> Result<(), PaymentError> {
        let url = format!(
            "{}/transactions/{}/refund",
            self.config.api_base_url, gateway_transaction_id
        );

        let body = RefundRequest {
            amount: amount_cents,
            metadata: RefundMetadata {
                reason: "Refund requested within the 8 day usage window",
            },
        };

        let response = self
            .http_client
            .post(&url)
            .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
            .json(&body)
            .send()
            .await
            .map_err(|e| PaymentError::network(e.to_string()))?;

        let status = response.status();

        if status.is_success() {
            return Ok(());
        }

        let error_text = response.text().await.unwrap_or_default();
        let message = extract_error_message(&error_text);

        if status == reqwest::StatusCode::UNAUTHORIZED
            || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(PaymentError::authentication(message));
        }

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(PaymentError::not_found("Transaction"));
        }

        tracing::error!(
            status = status.as_u16(),
            error = %message,
            "Pagar.me refund_transaction failed"
        );
        Err(PaymentError::provider(format!(
            "Pagar.me API error ({}): {}",
            status.as_u16(),
            message
        )))
    }
}

/// Pulls the link id and checkout URL out of a payment link response.
///
/// The id has been observed both as a string and as a number, and the URL
/// has moved between fields across API revisions, so the known spots are
/// checked in order.
fn parse_payment_link(value: &serde_json::Value) -> Result<CheckoutSession, PaymentError> {
    let gateway_link_id = match value.get("id") {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(serde_json::Value::Number(n)) => n.to_string(),
        _ => {
            return Err(PaymentError::provider(
                "payment link response carries no id",
            ))
        }
    };

    let checkout_url = ["url", "payment_url", "checkout_url"]
        .iter()
        .find_map(|key| value.get(key).and_then(|v| v.as_str()))
        .ok_or_else(|| PaymentError::provider("payment link response carries no URL"))?
        .to_string();

    Ok(CheckoutSession {
        gateway_link_id,
        checkout_url,
    })
}

/// Pulls a human-readable message out of a Pagar.me error body.
///
/// The API is not consistent about where it puts the message, so the known
/// spots are checked in order before falling back to the raw body.
fn extract_error_message(body: &str) -> String {
    if body.trim().is_empty() {
        return "empty response body".to_string();
    }

    let value: serde_json::Value = match serde_json::from_str(body) {
        Ok(v) => v,
        Err(_) => return truncate(body),
    };

    if let Some(message) = value.get("message").and_then(|m| m.as_str()) {
        return message.to_string();
    }

    if let Some(error) = value.get("error") {
        if let Some(s) = error.as_str() {
            return s.to_string();
        }
        if let Some(s) = error.get("message").and_then(|m| m.as_str()) {
            return s.to_string();
        }
    }

    for key in ["detail", "title"] {
        if let Some(s) = value.get(key).and_then(|v| v.as_str()) {
            return s.to_string();
        }
    }

    if let Some(first) = value
        .get("errors")
        .and_then(|e| e.as_array())
        .and_then(|a| a.first())
    {
        if let Some(s) = first.as_str() {
            return s.to_string();
        }
        if let Some(s) = first.get("message").and_then(|m| m.as_str()) {
            return s.to_string();
        }
    }

    truncate(body)
}

/// A repeat cancel comes back as an error whose message says the
/// subscription is already canceled, in English or Portuguese depending
/// on the endpoint.
fn is_already_cancelled(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("canceled") || lower.contains("cancelada")
}

fn truncate(body: &str) -> String {
    body.chars().take(200).collect()
}
