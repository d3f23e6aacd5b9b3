//! Supabase JWT adapter for token validation.
//!
//! This adapter implements the `TokenVerifier` port for Supabase Auth.
//! Supabase signs access tokens with a shared HS256 secret, so validation
//! is local: no network call and no key discovery.
//!
//! 1. Validating the JWT signature against the shared secret
//! 2. Validating audience and expiry claims
//! 3. Mapping claims to the domain `AuthenticatedUser` type
//!
//! # Security
//!
//! - **Audience (aud)**: Must be `authenticated` (Supabase's logged-in role)
//! - **Expiry (exp)**: Must be in the future
//! - The JWT secret is handled via `secrecy::SecretString`
//!
//! # Example
//!
//! ```ignore
//! use anesteasy_billing::adapters::auth::{SupabaseConfig, SupabaseTokenVerifier};
//! use anesteasy_billing::ports::TokenVerifier;
//!
//! let config = SupabaseConfig::new(jwt_secret);
//! let verifier = SupabaseTokenVerifier::new(config);
//! let user = verifier.verify("eyJ...").await?;
//! ```

use async_trait::async_trait;
use jsonwebtoken::{decode, Algorithm, DecodingKey, TokenData, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{AuthError, AuthenticatedUser, UserId};
use crate::ports::TokenVerifier;

/// Configuration for the Supabase JWT adapter.
#[derive(Clone)]
pub struct SupabaseConfig {
    /// Shared JWT secret from the Supabase project settings.
    jwt_secret: SecretString,

    /// Expected audience claim. Supabase issues `authenticated` for
    /// logged-in users.
    audience: String,
}

impl SupabaseConfig {
    /// Create a new configuration with the shared JWT secret.
    pub fn new(jwt_secret: impl Into<String>) -> Self {
        Self {
            jwt_secret: SecretString::new(jwt_secret.into()),
            audience: "authenticated".to_string(),
        }
    }

    /// Override the expected audience claim.
    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = audience.into();
        self
    }
}

/// JWT claims structure for Supabase access tokens.
#[derive(Debug, Serialize, Deserialize)]
struct SupabaseClaims {
    /// Subject - the user ID assigned by Supabase Auth
    sub: String,

    /// Audience - single string or array
    #[serde(default)]
    aud: Audience,

    /// Expiry timestamp (Unix epoch seconds)
    exp: i64,

    /// User's email address
    #[serde(default)]
    email: Option<String>,

    /// Postgres role the token maps to
    #[serde(default)]
    role: Option<String>,

    /// Free-form metadata; display name and verification flag live here
    #[serde(default)]
    user_metadata: UserMetadata,
}

/// User-editable metadata embedded in Supabase tokens.
#[derive(Debug, Default, Serialize, Deserialize)]
struct UserMetadata {
    #[serde(default)]
    name: Option<String>,

    #[serde(default)]
    full_name: Option<String>,

    #[serde(default)]
    email_verified: Option<bool>,
}

/// Audience can be a single string or array of strings in JWTs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(untagged)]
enum Audience {
    #[default]
    None,
    Single(String),
    Multiple(Vec<String>),
}

impl Audience {
    fn contains(&self, expected: &str) -> bool {
        match self {
            Audience::None => false,
            Audience::Single(s) => s == expected,
            Audience::Multiple(v) => v.iter().any(|s| s == expected),
        }
    }
}

/// Supabase token verifier.
///
/// Validates JWTs against the project's shared secret and extracts user
/// information. This is the production implementation of `TokenVerifier`.
pub struct SupabaseTokenVerifier {
    config: SupabaseConfig,
    decoding_key: DecodingKey,
}

impl SupabaseTokenVerifier {
    /// Create a new Supabase verifier.
    pub fn new(config: SupabaseConfig) -> Self {
        let decoding_key = DecodingKey::from_secret(config.jwt_secret.expose_secret().as_bytes());

        Self {
            config,
            decoding_key,
        }
    }

    /// Validate a JWT and extract claims.
    fn decode_token(&self, token: &str) -> Result<TokenData<SupabaseClaims>, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);

        // SECURITY: Validate audience
        validation.set_audience(&[&self.config.audience]);

        // SECURITY: Validate expiry (enabled by default)
        validation.validate_exp = true;

        // Require these claims to be present
        validation.set_required_spec_claims(&["exp", "sub", "aud"]);

        decode::<SupabaseClaims>(token, &self.decoding_key, &validation).map_err(|e| {
            use jsonwebtoken::errors::ErrorKind;
            match e.kind() {
                ErrorKind::ExpiredSignature => {
                    tracing::debug!("Token expired");
                    AuthError::TokenExpired
                }
                ErrorKind::InvalidAudience => {
                    tracing::warn!("Invalid audience in token");
                    AuthError::InvalidToken
                }
                _ => {
                    tracing::warn!("Token validation failed: {}", e);
                    AuthError::InvalidToken
                }
            }
        })
    }
}

#[async_trait]
impl TokenVerifier for SupabaseTokenVerifier {
    async fn verify(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        let token_data = self.decode_token(token)?;
        let claims = token_data.claims;

        // SECURITY: Double-check audience (defense in depth)
        if !claims.aud.contains(&self.config.audience) {
            tracing::warn!(
                "Audience mismatch after validation: expected '{}', got '{:?}'",
                self.config.audience,
                claims.aud
            );
            return Err(AuthError::InvalidToken);
        }

        // Extract email - required for our domain
        let email = claims.email.ok_or_else(|| {
            tracing::warn!("Token missing email claim");
            AuthError::InvalidToken
        })?;

        // Create user ID from subject
        let user_id = UserId::new(&claims.sub).map_err(|_| {
            tracing::warn!("Invalid user ID in token: {}", claims.sub);
            AuthError::InvalidToken
        })?;

        let display_name = claims
            .user_metadata
            .name
            .clone()
            .or(claims.user_metadata.full_name.clone());

        Ok(AuthenticatedUser::new(
            user_id,
            email,
            display_name,
            claims.user_metadata.email_verified.unwrap_or(false),
        ))
    }
}

impl std::fmt::Debug for SupabaseTokenVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseTokenVerifier")
            .field("audience", &self.config.audience)
            .finish_non_exhaustive()
    }
}
