//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `auth` - Supabase JWT token verification
//! - `events` - Event bus implementations (in-memory broadcast)
//! - `http` - Axum HTTP surface (routes, handlers, middleware)
//! - `pagarme` - Pagar.me payment gateway client
//! - `postgres` - PostgreSQL repositories

pub mod auth;
pub mod events;
pub mod http;
pub mod pagarme;
pub mod postgres;

pub use auth::{MockTokenVerifier, SupabaseConfig, SupabaseTokenVerifier};
pub use events::InMemoryEventBus;
pub use pagarme::{MockPaymentGateway, PagarmeConfig, PagarmeGatewayAdapter};
pub use postgres::{
    PostgresSubscriptionRepository, PostgresTransactionRepository, PostgresWebhookEventRepository,
};
