//! In-memory `TokenVerifier` for tests.
//!
//! Maps literal token strings to users so HTTP and handler tests can
//! authenticate without minting real Supabase JWTs.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::domain::foundation::{AuthError, AuthenticatedUser, UserId};
use crate::ports::TokenVerifier;

/// Token verifier backed by a fixed token-to-user map.
///
/// Unknown tokens fail with `InvalidToken`; a forced error (set via
/// [`with_error`](Self::with_error)) takes precedence over the map.
#[derive(Debug, Default)]
pub struct MockTokenVerifier {
    tokens: HashMap<String, AuthenticatedUser>,
    force_error: Option<AuthError>,
}

impl MockTokenVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept `token` as `user`.
    pub fn with_user(mut self, token: impl Into<String>, user: AuthenticatedUser) -> Self {
        self.tokens.insert(token.into(), user);
        self
    }

    /// Accept `token` as a synthetic verified user derived from `user_id`.
    pub fn with_test_user(self, token: impl Into<String>, user_id: impl Into<String>) -> Self {
        let user_id = user_id.into();
        let user = AuthenticatedUser::new(
            UserId::new(&user_id).unwrap(),
            format!("{}@test.example.com", user_id),
            Some(format!("Test User {}", user_id)),
            true,
        );
        self.with_user(token, user)
    }

    /// Fail every verification with `error`, regardless of the token map.
    pub fn with_error(mut self, error: AuthError) -> Self {
        self.force_error = Some(error);
        self
    }
}

#[async_trait]
impl TokenVerifier for MockTokenVerifier {
    async fn verify(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        if let Some(error) = &self.force_error {
            return Err(error.clone());
        }
        self.tokens
            .get(token)
            .cloned()
            .ok_or(AuthError::InvalidToken)
    }
}
