//! Payment gateway configuration

use serde::Deserialize;

use super::error::ValidationError;

/// Payment gateway configuration (Pagar.me)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GatewayConfig {
    /// Pagar.me secret API key
    pub pagarme_api_key: String,

    /// Shared secret for webhook HMAC signatures
    pub pagarme_webhook_secret: String,

    /// Override for the Pagar.me API base URL (testing only)
    pub api_base_url: Option<String>,
}

impl GatewayConfig {
    /// Check if using the Pagar.me sandbox
    pub fn is_test_mode(&self) -> bool {
        self.pagarme_api_key.starts_with("sk_test_")
            || self.pagarme_api_key.starts_with("ak_test_")
    }

    /// Check if using the Pagar.me live environment
    pub fn is_live_mode(&self) -> bool {
        self.pagarme_api_key.starts_with("sk_live_")
            || self.pagarme_api_key.starts_with("ak_live_")
    }

    /// Validate gateway configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.pagarme_api_key.is_empty() {
            return Err(ValidationError::MissingRequired("PAGARME_API_KEY"));
        }
        if self.pagarme_webhook_secret.is_empty() {
            return Err(ValidationError::MissingRequired("PAGARME_WEBHOOK_SECRET"));
        }

        // Pagar.me secret keys use sk_ (v5) or ak_ (legacy) prefixes
        if !self.pagarme_api_key.starts_with("sk_") && !self.pagarme_api_key.starts_with("ak_") {
            return Err(ValidationError::InvalidPagarmeKey);
        }
        // The webhook secret is operator-chosen; enforce a minimum length
        // so a truncated value fails fast instead of rejecting every event
        if self.pagarme_webhook_secret.len() < 16 {
            return Err(ValidationError::WebhookSecretTooShort);
        }

        Ok(())
    }
}
