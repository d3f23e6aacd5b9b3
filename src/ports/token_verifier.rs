//! Token verification port for JWT validation.
//!
//! This port defines the contract for validating access tokens and extracting
//! user identity. It is provider-agnostic - implementations exist for Supabase
//! and mock testing, and could be added for Auth0, Keycloak, etc.
//!
//! # Security Requirements
//!
//! All implementations MUST validate:
//! - **Signature**: Token must be signed with the configured secret
//! - **Audience (aud)**: Token must be intended for this application
//! - **Expiry (exp)**: Token must not be expired
//!
//! # Example Implementation
//!
//! ```ignore
//! pub struct SupabaseTokenVerifier { ... }
//!
//! #[async_trait]
//! impl TokenVerifier for SupabaseTokenVerifier {
//!     async fn verify(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
//!         // 1. Decode and validate the JWT with the shared secret
//!         // 2. Validate aud and exp claims
//!         // 3. Map claims to AuthenticatedUser
//!     }
//! }
//! ```

use async_trait::async_trait;

use crate::domain::foundation::{AuthError, AuthenticatedUser};

/// Validates access tokens and extracts user identity.
///
/// This is the primary port for authentication. HTTP middleware uses this
/// to validate Bearer tokens and extract the authenticated user.
///
/// # Contract
///
/// Implementations must:
/// - Validate the token signature
/// - Validate audience and expiry claims
/// - Return `AuthError::InvalidToken` for malformed/bad signature tokens
/// - Return `AuthError::TokenExpired` for expired tokens
/// - Return `AuthError::ServiceUnavailable` for transient errors
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    /// Verify a JWT access token and return the authenticated user.
    ///
    /// # Arguments
    ///
    /// * `token` - The raw JWT token (without "Bearer " prefix)
    ///
    /// # Returns
    ///
    /// * `Ok(AuthenticatedUser)` - Token is valid, user extracted from claims
    /// * `Err(AuthError::InvalidToken)` - Token is malformed or signature invalid
    /// * `Err(AuthError::TokenExpired)` - Token signature valid but expired
    /// * `Err(AuthError::ServiceUnavailable)` - Auth provider unreachable
    async fn verify(&self, token: &str) -> Result<AuthenticatedUser, AuthError>;
}
