//! HTTP adapters - REST API implementations.
//!
//! The billing module carries the subscription API and the Pagar.me
//! webhook endpoint; middleware holds the authentication layer.

pub mod billing;
pub mod middleware;

// Re-export key types for convenience
pub use billing::billing_router;
pub use billing::BillingAppState;
pub use middleware::{auth_middleware, AuthState, RequireAuth};
