//! Ed25519 request signing, for venues (typically on-chain or
//! chain-adjacent) that authenticate with a raw Ed25519 keypair rather
//! than an HMAC secret. Signs over the same canonical param string shape
//! as [`crate::auth::hmac::HmacStrategy`].

use ed25519_dalek::{Signer, SigningKey};

use crate::auth::{AuthStrategy, SignableRequest, Signature};
use crate::config::VenueId;
use crate::error::{ApiError, ErrorCategory};

/// Signs requests with a raw Ed25519 keypair, hex-encoding the resulting
/// signature into a `signature` field.
pub struct Ed25519Strategy {
    venue: VenueId,
    signing_key: SigningKey,
}

impl std::fmt::Debug for Ed25519Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ed25519Strategy")
            .field("venue", &self.venue)
            .field("public_key", &hex::encode(self.signing_key.verifying_key().to_bytes()))
            .finish()
    }
}

impl Ed25519Strategy {
    /// Construct a strategy from a 32-byte Ed25519 private key.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorCategory::MissingCredentials`] if `private_key` is
    /// not exactly 32 bytes.
    pub fn new(venue: VenueId, private_key: &[u8]) -> Result<Self, ApiError> {
        let bytes: [u8; 32] = private_key.try_into().map_err(|_| {
            ApiError::new(
                venue,
                ErrorCategory::MissingCredentials,
                "ed25519 private key must be exactly 32 bytes",
            )
        })?;
        Ok(Self {
            venue,
            signing_key: SigningKey::from_bytes(&bytes),
        })
    }
}

impl AuthStrategy for Ed25519Strategy {
    fn sign(&self, request: &SignableRequest) -> Result<Signature, ApiError> {
        let payload = format!("{}{}{}", request.method, request.params, request.nonce);
        let signature = self.signing_key.sign(payload.as_bytes());

        let mut signature_result = Signature::default();
        signature_result
            .fields
            .insert("signature".to_string(), hex::encode(signature.to_bytes()));
        signature_result.fields.insert(
            "public_key".to_string(),
            hex::encode(self.signing_key.verifying_key().to_bytes()),
        );
        signature_result
            .fields
            .insert("nonce".to_string(), request.nonce.to_string());

        Ok(signature_result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> [u8; 32] {
        let mut bytes = [0u8; 32];
        bytes[0] = 7;
        bytes
    }

    #[test]
    fn rejects_a_key_of_the_wrong_length() {
        let err = Ed25519Strategy::new(VenueId::Reference, &[1, 2, 3]).unwrap_err();
        assert_eq!(err.category, ErrorCategory::MissingCredentials);
    }

    #[test]
    fn signing_is_deterministic_and_verifiable() {
        let strategy = Ed25519Strategy::new(VenueId::Reference, &key()).unwrap();
        let request = SignableRequest {
            method: "order.place".into(),
            path: String::new(),
            params: "symbol=BTC-PERP".into(),
            nonce: 42,
        };

        let signed = strategy.sign(&request).unwrap();
        let signature_hex = signed.fields.get("signature").unwrap();
        let public_key_hex = signed.fields.get("public_key").unwrap();

        let signature_bytes = hex::decode(signature_hex).unwrap();
        let public_key_bytes = hex::decode(public_key_hex).unwrap();
        let verifying_key = ed25519_dalek::VerifyingKey::from_bytes(
            &public_key_bytes.try_into().unwrap(),
        )
        .unwrap();
        let signature = ed25519_dalek::Signature::from_bytes(
            &signature_bytes.try_into().unwrap(),
        );

        let payload = format!("{}{}{}", request.method, request.params, request.nonce);
        assert!(verifying_key.verify_strict(payload.as_bytes(), &signature).is_ok());
    }
}
