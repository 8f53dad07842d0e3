//! HMAC-SHA256 request signing: a digital signature built over
//! `api_key + method + params_str + nonce`, the composition common to
//! REST and websocket auth frames alike.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::auth::{AuthStrategy, SignableRequest, Signature};
use crate::config::VenueId;
use crate::error::{ApiError, ErrorCategory};

type HmacSha256 = Hmac<Sha256>;

/// Signs requests with `HMAC-SHA256(secret, api_key + method + params + nonce)`,
/// hex-encoded, the shape used by most CEX-style perpetuals venues.
pub struct HmacStrategy {
    venue: VenueId,
    api_key: String,
    secret: String,
}

impl std::fmt::Debug for HmacStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HmacStrategy")
            .field("venue", &self.venue)
            .field("api_key", &"***")
            .finish()
    }
}

impl HmacStrategy {
    /// Construct a strategy from a venue's API key/secret pair.
    #[must_use]
    pub fn new(venue: VenueId, api_key: String, secret: String) -> Self {
        Self {
            venue,
            api_key,
            secret,
        }
    }
}

impl AuthStrategy for HmacStrategy {
    fn sign(&self, request: &SignableRequest) -> Result<Signature, ApiError> {
        let payload = format!(
            "{}{}{}{}",
            self.api_key, request.method, request.params, request.nonce
        );

        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes()).map_err(|e| {
            ApiError::new(self.venue, ErrorCategory::InvalidSignature, e.to_string())
        })?;
        mac.update(payload.as_bytes());
        let signature = hex::encode(mac.finalize().into_bytes());

        let mut signature_result = Signature::default();
        signature_result
            .headers
            .insert("X-API-KEY".to_string(), self.api_key.clone());
        signature_result
            .headers
            .insert("X-SIGNATURE".to_string(), signature.clone());
        signature_result
            .headers
            .insert("X-NONCE".to_string(), request.nonce.to_string());
        signature_result
            .fields
            .insert("api_key".to_string(), self.api_key.clone());
        signature_result.fields.insert("sig".to_string(), signature);
        signature_result
            .fields
            .insert("nonce".to_string(), request.nonce.to_string());

        Ok(signature_result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signing_is_deterministic_for_the_same_request() {
        let strategy = HmacStrategy::new(VenueId::Reference, "key".into(), "secret".into());
        let request = SignableRequest {
            method: "private/create-order".into(),
            path: "/v1/order".into(),
            params: "symbol=BTC-PERPside=buy".into(),
            nonce: 1_700_000_000_000,
        };

        let a = strategy.sign(&request).unwrap();
        let b = strategy.sign(&request).unwrap();
        assert_eq!(a.headers.get("X-SIGNATURE"), b.headers.get("X-SIGNATURE"));
    }

    #[test]
    fn different_secrets_produce_different_signatures() {
        let request = SignableRequest {
            method: "private/create-order".into(),
            path: "/v1/order".into(),
            params: "symbol=BTC-PERP".into(),
            nonce: 1,
        };

        let a = HmacStrategy::new(VenueId::Reference, "key".into(), "secret-a".into())
            .sign(&request)
            .unwrap();
        let b = HmacStrategy::new(VenueId::Reference, "key".into(), "secret-b".into())
            .sign(&request)
            .unwrap();

        assert_ne!(a.headers.get("X-SIGNATURE"), b.headers.get("X-SIGNATURE"));
    }
}
