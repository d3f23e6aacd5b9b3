//! Pagar.me payment gateway adapter.
//!
//! Implements the `PaymentGateway` port against the Pagar.me core v5 API:
//! - Subscription cancellation (always immediate at the gateway)
//! - Full refunds against settled charges
//!
//! Inbound webhooks are verified and parsed in the domain layer; this module
//! only covers outbound calls.
//!
//! # Security
//!
//! - API key handled via `secrecy::SecretString`
//! - Basic auth as `{api_key}:` per the Pagar.me v5 convention

mod mock_gateway;
mod pagarme_adapter;

pub use mock_gateway::{MockPaymentGateway, RefundCall};
pub use pagarme_adapter::{PagarmeConfig, PagarmeGatewayAdapter};
