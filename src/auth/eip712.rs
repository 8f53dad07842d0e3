//! EIP-712 signing seam.
//!
//! Venue signers are treated as black boxes that turn a canonical
//! request into signed bytes. This module is that seam, not an
//! implementation — an embedder wires in their own wallet/HSM-backed
//! signer. No `alloy`/`ethers` dependency is introduced because this
//! crate never needs to construct or hash a typed-data struct itself.

use crate::auth::{AuthStrategy, SignableRequest, Signature};
use crate::error::ApiError;

/// Produces an EIP-712 signature over an already-typed-hashed payload.
/// Implementations own wallet or hardware-signer integration; this crate
/// only calls through the trait.
pub trait Eip712Signer: Send + Sync + std::fmt::Debug {
    /// Sign `typed_data_hash`, returning a 65-byte `r || s || v` signature.
    fn sign_typed_data(&self, typed_data_hash: &[u8; 32]) -> Result<[u8; 65], ApiError>;
}

/// Adapts an [`Eip712Signer`] into an [`AuthStrategy`] for venues whose
/// REST/WS auth is "hash the canonical request, sign it with your
/// wallet." Hashing the request into a `[u8; 32]` digest is left to the
/// venue adapter, which knows its own EIP-712 domain/type layout; this
/// wrapper only carries the signer through the generic pipeline.
pub struct Eip712Strategy<H> {
    signer: Box<dyn Eip712Signer>,
    hash_request: H,
}

impl<H> std::fmt::Debug for Eip712Strategy<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Eip712Strategy").finish_non_exhaustive()
    }
}

impl<H> Eip712Strategy<H>
where
    H: Fn(&SignableRequest) -> [u8; 32] + Send + Sync,
{
    /// Construct a strategy from a signer and a venue-supplied hashing
    /// function that turns a [`SignableRequest`] into its EIP-712 digest.
    pub fn new(signer: Box<dyn Eip712Signer>, hash_request: H) -> Self {
        Self {
            signer,
            hash_request,
        }
    }
}

impl<H> AuthStrategy for Eip712Strategy<H>
where
    H: Fn(&SignableRequest) -> [u8; 32] + Send + Sync,
{
    fn sign(&self, request: &SignableRequest) -> Result<Signature, ApiError> {
        let digest = (self.hash_request)(request);
        let signature = self.signer.sign_typed_data(&digest)?;

        let mut signature_result = Signature::default();
        signature_result
            .fields
            .insert("signature".to_string(), format!("0x{}", hex::encode(signature)));
        Ok(signature_result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VenueId;

    #[derive(Debug)]
    struct FixedSigner;

    impl Eip712Signer for FixedSigner {
        fn sign_typed_data(&self, typed_data_hash: &[u8; 32]) -> Result<[u8; 65], ApiError> {
            let mut out = [0u8; 65];
            out[..32].copy_from_slice(typed_data_hash);
            out[64] = 27;
            Ok(out)
        }
    }

    #[test]
    fn wraps_an_embedder_signer_into_an_auth_strategy() {
        let strategy = Eip712Strategy::new(Box::new(FixedSigner), |_req| [9u8; 32]);
        let request = SignableRequest {
            method: "order.place".into(),
            path: String::new(),
            params: String::new(),
            nonce: 0,
        };
        let signed = strategy.sign(&request).unwrap();
        let signature_hex = signed.fields.get("signature").unwrap();
        assert!(signature_hex.starts_with("0x0909090909"));
        let _ = VenueId::Reference;
    }
}
