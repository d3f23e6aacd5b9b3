//! Authenticated-caller types shared by the auth port and adapters.
//!
//! `AuthenticatedUser` carries the claims this service actually reads
//! from a verified Supabase access token. The type has no provider
//! dependencies; any `TokenVerifier` implementation can populate it.

use super::UserId;
use thiserror::Error;

/// Caller identity extracted from a verified access token.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    /// Subject claim, the owning user id for all billing rows.
    pub id: UserId,

    /// Email address from the token claims.
    pub email: String,

    /// Display name, when the token metadata carries one.
    pub display_name: Option<String>,

    /// Whether the provider has verified the email address.
    pub email_verified: bool,
}

impl AuthenticatedUser {
    pub fn new(
        id: UserId,
        email: impl Into<String>,
        display_name: Option<String>,
        email_verified: bool,
    ) -> Self {
        Self {
            id,
            email: email.into(),
            display_name,
            email_verified,
        }
    }
}

/// Why token verification failed.
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    /// Malformed token, bad signature, or wrong audience.
    #[error("Invalid token")]
    InvalidToken,

    /// The token's `exp` claim has passed. Kept separate from
    /// `InvalidToken` so clients can refresh instead of re-login.
    #[error("Token expired")]
    TokenExpired,

    /// The verifier itself failed (config, key material).
    #[error("Auth service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl AuthError {
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::ServiceUnavailable(message.into())
    }
}
