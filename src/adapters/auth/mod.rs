//! Authentication adapters.
//!
//! Implementations of the `TokenVerifier` port:
//!
//! - `supabase` - Production Supabase HS256 token validation
//! - `mock` - Test implementation that doesn't require real tokens

mod mock;
mod supabase;

pub use mock::MockTokenVerifier;
pub use supabase::{SupabaseConfig, SupabaseTokenVerifier};
