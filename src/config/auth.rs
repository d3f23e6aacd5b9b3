//! Authentication configuration

use serde::Deserialize;

use super::error::ValidationError;
use super::server::Environment;

/// Authentication configuration (Supabase JWT)
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Shared HS256 secret from the Supabase project settings
    pub supabase_jwt_secret: String,

    /// Expected audience claim
    #[serde(default = "default_audience")]
    pub supabase_audience: String,
}

impl AuthConfig {
    /// Validate authentication configuration
    ///
    /// In production, requires a full-length JWT secret. Development
    /// allows shorter secrets for local Supabase instances.
    pub fn validate(&self, environment: &Environment) -> Result<(), ValidationError> {
        if self.supabase_jwt_secret.is_empty() {
            return Err(ValidationError::MissingRequired("SUPABASE_JWT_SECRET"));
        }
        if self.supabase_audience.is_empty() {
            return Err(ValidationError::MissingRequired("SUPABASE_AUDIENCE"));
        }

        if *environment == Environment::Production && self.supabase_jwt_secret.len() < 32 {
            return Err(ValidationError::JwtSecretTooShort);
        }

        Ok(())
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            supabase_jwt_secret: String::new(),
            supabase_audience: default_audience(),
        }
    }
}

fn default_audience() -> String {
    // Supabase issues `authenticated` for logged-in users
    "authenticated".to_string()
}
