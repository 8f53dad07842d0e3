//! Crate config module: per-adapter configuration, the closed venue
//! registry, and the `createExchange` construction entry point.

use std::collections::HashMap;
use std::sync::OnceLock;

use url::Url;

use crate::adapter::VenueAdapter;
use crate::error::{ApiError, ErrorCategory};

/// The closed set of venues this crate knows how to construct.
///
/// New venues are added here and registered in [`registry`]; callers never
/// construct an adapter by any other means than [`create_exchange`].
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum VenueId {
    /// The bundled reference adapter, a generic JSON perpetuals venue used
    /// to exercise the adapter framework end to end.
    Reference,
}

impl std::fmt::Display for VenueId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VenueId::Reference => write!(f, "reference"),
        }
    }
}

/// Rate-limiter overrides, mirrors `config.rateLimit` on [`ExchangeConfig`].
#[derive(Clone, Debug, Default)]
pub struct RateLimitOverrides {
    /// Bucket capacity in tokens.
    pub max_tokens: Option<u32>,
    /// Refill window in milliseconds.
    pub window_ms: Option<u64>,
    /// Per-operation token weights.
    pub weights: HashMap<String, u32>,
}

/// The config passed to [`create_exchange`].
#[derive(Clone, Debug, Default)]
pub struct ExchangeConfig {
    /// Select test vs production URLs.
    pub testnet: bool,
    /// REST/HMAC API key.
    pub api_key: Option<String>,
    /// REST/HMAC API secret.
    pub api_secret: Option<String>,
    /// Ed25519 or chain signer private key material (opaque bytes).
    pub private_key: Option<Vec<u8>>,
    /// Wallet signer handle, venue-interpreted.
    pub wallet: Option<String>,
    /// On-chain wallet address.
    pub wallet_address: Option<String>,
    /// Per-request millisecond budget.
    pub timeout_ms: Option<u64>,
    /// Rate-limiter overrides.
    pub rate_limit: RateLimitOverrides,
    /// Chain RPC endpoint, for chain-backed venues.
    pub rpc_endpoint: Option<String>,
    /// Revenue-share tag attached to orders where the venue supports it.
    pub builder_code: Option<String>,
    /// Revenue-share tag, alternate name some venues use.
    pub referral_code: Option<String>,
    /// Verbose logging flag.
    pub debug: bool,
}

impl ExchangeConfig {
    /// True if enough material was supplied to sign authenticated requests.
    /// Individual [`crate::auth::AuthStrategy`] implementations apply their
    /// own, stricter checks in `require_auth`; this is the coarse gate used
    /// before an adapter is even constructed.
    #[must_use]
    pub fn has_credentials(&self) -> bool {
        (self.api_key.is_some() && self.api_secret.is_some())
            || self.private_key.is_some()
            || self.wallet.is_some()
    }
}

type Constructor = fn(ExchangeConfig) -> Box<dyn VenueAdapter>;

fn registry() -> &'static HashMap<VenueId, Constructor> {
    static REGISTRY: OnceLock<HashMap<VenueId, Constructor>> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        let mut map: HashMap<VenueId, Constructor> = HashMap::new();
        map.insert(VenueId::Reference, |config| {
            Box::new(crate::venues::reference::ReferenceAdapter::new(config))
        });
        map
    })
}

/// Construct an adapter for `venue_id`. The registry is a static table,
/// read-only after first use — no global state lives anywhere beyond
/// each adapter instance's own fields.
///
/// # Errors
///
/// Returns `NotSupported` if `venue_id` is not registered (unreachable for
/// the closed enum today, but kept for forward compatibility with a
/// string-keyed registry variant).
pub fn create_exchange(
    venue_id: VenueId,
    config: ExchangeConfig,
) -> Result<Box<dyn VenueAdapter>, ApiError> {
    match registry().get(&venue_id) {
        Some(constructor) => Ok(constructor(config)),
        None => Err(ApiError::new(
            venue_id,
            ErrorCategory::NotSupported,
            "venue is not registered",
        )),
    }
}
