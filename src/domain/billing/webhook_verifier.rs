//! Pagar.me webhook signature verification.
//!
//! Pagar.me signs webhook deliveries with HMAC-SHA256 over the raw
//! request body and sends the hex digest in the `X-Pagarme-Signature`
//! header. There is no timestamp component, so verification is a
//! constant-time digest comparison followed by payload parsing.

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use super::gateway_event::PagarmeEvent;
use super::webhook_errors::WebhookError;

/// Verifies webhook signatures and parses event payloads.
#[derive(Clone)]
pub struct PagarmeWebhookVerifier {
    secret: SecretString,
}

impl PagarmeWebhookVerifier {
    pub fn new(secret: SecretString) -> Self {
        Self { secret }
    }

    /// Verifies the signature and parses the payload into an event.
    ///
    /// The payload must be the raw request body bytes, before any JSON
    /// parsing, since the digest is computed over the exact bytes sent.
    pub fn verify_and_parse(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> Result<PagarmeEvent, WebhookError> {
        let provided = hex::decode(signature.trim())
            .map_err(|_| WebhookError::ParseError("signature is not valid hex".to_string()))?;

        let expected = self.compute_signature(payload);

        if !constant_time_compare(&provided, &expected) {
            return Err(WebhookError::InvalidSignature);
        }

        let event: PagarmeEvent = serde_json::from_slice(payload)
            .map_err(|e| WebhookError::ParseError(format!("invalid event payload: {}", e)))?;

        Ok(event)
    }

    fn compute_signature(&self, payload: &[u8]) -> Vec<u8> {
        let mut mac = Hmac::<Sha256>::new_from_slice(self.secret.expose_secret().as_bytes())
            .expect("HMAC accepts any key length");
        mac.update(payload);
        mac.finalize().into_bytes().to_vec()
    }
}

/// Constant-time comparison of two byte slices.
fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

/// Computes a valid signature for test payloads.
#[cfg(test)]
pub fn compute_test_signature(secret: &str, payload: &[u8]) -> String {
    let mut mac =
        Hmac::<Sha256>::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}
