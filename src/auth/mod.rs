//! Signing strategies. Every strategy turns a canonical request into the
//! bytes a venue expects attached to the request, without the rest of
//! the crate knowing which signature scheme is in use.

pub mod ed25519;
pub mod eip712;
pub mod hmac;

pub use ed25519::Ed25519Strategy;
pub use eip712::Eip712Signer;
pub use hmac::HmacStrategy;

use std::collections::HashMap;

/// A request awaiting a signature: method, path, canonical param string,
/// and a nonce.
#[derive(Clone, Debug)]
pub struct SignableRequest {
    /// HTTP method or websocket method name being signed.
    pub method: String,
    /// Request path, empty for websocket auth frames.
    pub path: String,
    /// Canonicalized parameter string, see [`params_to_str`].
    pub params: String,
    /// Nonce/timestamp in milliseconds since the epoch.
    pub nonce: u64,
}

/// The result of signing a [`SignableRequest`]: headers/fields to merge
/// into the outgoing request.
#[derive(Clone, Debug, Default)]
pub struct Signature {
    /// Extra HTTP headers to attach (HMAC strategies).
    pub headers: HashMap<String, String>,
    /// Extra JSON body/query fields to attach (HMAC and Ed25519 strategies
    /// that sign over an assembled payload rather than transport headers).
    pub fields: HashMap<String, String>,
}

/// Something that can sign a [`SignableRequest`]. Implementations must be
/// `Send + Sync` since one strategy instance is shared across every
/// concurrent request an adapter issues.
pub trait AuthStrategy: Send + Sync + std::fmt::Debug {
    /// Produce the signature fields/headers for `request`.
    fn sign(&self, request: &SignableRequest) -> Result<Signature, crate::error::ApiError>;
}

/// Canonicalize a JSON value into a flat, deterministic string for
/// strategies that sign over assembled parameter strings rather than
/// raw bytes.
#[must_use]
pub fn params_to_str(value: &serde_json::Value) -> String {
    use serde_json::Value;

    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(params_to_str).collect(),
        Value::Object(map) => {
            let mut out = String::new();
            for (k, v) in map {
                out.push_str(k);
                out.push_str(&params_to_str(v));
            }
            out
        }
    }
}

/// Milliseconds since the UNIX epoch, used as a nonce.
#[must_use]
pub fn epoch_ms() -> u64 {
    let since_epoch = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("system clock is before the epoch");
    since_epoch.as_secs() * 1000 + u64::from(since_epoch.subsec_millis())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_to_str_flattens_nested_objects_into_one_string() {
        let value = serde_json::json!({ "symbol": "BTC-PERP", "size": 1.5 });
        let out = params_to_str(&value);
        assert!(out.contains("symbol"));
        assert!(out.contains("BTC-PERP"));
        assert!(out.contains("size"));
        assert!(out.contains("1.5"));
    }

    #[test]
    fn epoch_ms_is_monotonic_nondecreasing_across_calls() {
        let a = epoch_ms();
        let b = epoch_ms();
        assert!(b >= a);
    }
}
