//! Shared plumbing every [`crate::adapter::VenueAdapter`] composes by
//! holding one [`AdapterCore`] rather than reimplementing lifecycle,
//! capability gating, and caching per venue.
//!
//! Wraps an inner HTTP/WebSocket pair with circuit-breaker/rate-limit
//! composition, and composes market/user websocket halves behind one
//! owning struct rather than duplicating socket plumbing per consumer.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::sync::{Mutex, OnceCell};

use crate::auth::AuthStrategy;
use crate::config::VenueId;
use crate::error::{ApiError, ErrorCategory};
use crate::http::HttpClient;
use crate::rate_limiter::RateLimiter;
use crate::types::Market;
use crate::ws::{WsClientConfig, WsManager};

use super::symbol::SymbolTable;

/// Whether a venue supports an operation.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Capability {
    /// Fully supported, dispatched as a normal request.
    Supported,
    /// Not supported; callers get `NotSupported` without network traffic.
    Unsupported,
    /// Supported via a client-side workaround rather than a native venue
    /// endpoint (e.g. synthesizing OHLCV from trades).
    Emulated,
}

/// Fixed-key record from operation name to [`Capability`].
#[derive(Clone, Debug, Default)]
pub struct CapabilityMap(HashMap<&'static str, Capability>);

impl CapabilityMap {
    /// An empty map; every operation defaults to [`Capability::Unsupported`]
    /// until explicitly set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare `operation`'s support level. Chainable for concise adapter
    /// constructors.
    #[must_use]
    pub fn set(mut self, operation: &'static str, capability: Capability) -> Self {
        self.0.insert(operation, capability);
        self
    }

    /// Current support level for `operation`; unknown operations are
    /// [`Capability::Unsupported`] rather than panicking.
    #[must_use]
    pub fn get(&self, operation: &str) -> Capability {
        self.0.get(operation).copied().unwrap_or(Capability::Unsupported)
    }

    /// Fail with `NotSupported` if `operation` is unsupported; a no-op
    /// otherwise. Must run before any network I/O.
    pub fn check(&self, venue: VenueId, operation: &str) -> Result<(), ApiError> {
        if self.get(operation) == Capability::Unsupported {
            Err(ApiError::not_supported(venue, operation))
        } else {
            Ok(())
        }
    }
}

/// Adapter lifecycle state: `Uninitialized → Ready → Disconnected`.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum AdapterState {
    /// Constructed, not yet `initialize`d.
    Uninitialized,
    /// `initialize` succeeded; normal operation.
    Ready,
    /// `disconnect`ed; terminal, operations other than `disconnect` fail.
    Disconnected,
}

/// A cache with an explicit TTL and single-flight refresh discipline: at
/// most one concurrent refresh per key, readers during a refresh see the
/// prior value or wait for the new one, never a partial write.
pub struct TtlCache<T> {
    ttl: Duration,
    entries: DashMap<String, (Instant, T)>,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl<T: Clone> TtlCache<T> {
    /// A cache that treats every entry as stale after `ttl`.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: DashMap::new(),
            locks: DashMap::new(),
        }
    }

    /// Return the cached value for `key` if fresh; otherwise run `refresh`
    /// exactly once even if called concurrently from many tasks, and
    /// repopulate the cache with its result.
    pub async fn get_or_refresh<F, Fut>(&self, key: &str, refresh: F) -> Result<T, ApiError>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T, ApiError>>,
    {
        if let Some(fresh) = self.fresh_entry(key) {
            return Ok(fresh);
        }

        let lock = self
            .locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        if let Some(fresh) = self.fresh_entry(key) {
            return Ok(fresh);
        }

        let value = refresh().await?;
        self.entries
            .insert(key.to_string(), (Instant::now(), value.clone()));
        Ok(value)
    }

    fn fresh_entry(&self, key: &str) -> Option<T> {
        self.entries.get(key).and_then(|entry| {
            if entry.0.elapsed() < self.ttl {
                Some(entry.1.clone())
            } else {
                None
            }
        })
    }

    /// Drop every cached entry, e.g. on `disconnect`.
    pub fn clear(&self) {
        self.entries.clear();
    }
}

/// Markets change rarely; ≈1 minute is long enough to avoid hammering
/// the venue without ever serving a listing from yesterday.
pub const MARKETS_CACHE_TTL: Duration = Duration::from_secs(60);
/// Price snapshots go stale fast; ≈5 seconds keeps `fetchTicker` fresh
/// enough for order sizing without a round trip on every call.
pub const PRICE_CACHE_TTL: Duration = Duration::from_secs(5);

const MARKETS_CACHE_KEY: &str = "markets";

/// The shared composition every concrete [`crate::adapter::VenueAdapter`]
/// holds one of: one HTTP client, one lazily-initialized WebSocket
/// manager, one rate limiter, one auth strategy, a symbol table, and the
/// TTL caches market data and price snapshots need.
pub struct AdapterCore {
    pub venue: VenueId,
    pub http: HttpClient,
    pub rate_limiter: RateLimiter,
    pub auth: Arc<dyn AuthStrategy>,
    pub capabilities: CapabilityMap,
    ws_config: WsClientConfig,
    ws: OnceCell<WsManager>,
    state: Mutex<AdapterState>,
    symbols: Mutex<SymbolTable>,
    markets_cache: TtlCache<Vec<Market>>,
    price_cache: TtlCache<serde_json::Value>,
}

impl std::fmt::Debug for AdapterCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterCore")
            .field("venue", &self.venue)
            .finish_non_exhaustive()
    }
}

impl AdapterCore {
    /// Construct the shared composition for one adapter instance.
    #[must_use]
    pub fn new(
        venue: VenueId,
        http: HttpClient,
        rate_limiter: RateLimiter,
        auth: Arc<dyn AuthStrategy>,
        capabilities: CapabilityMap,
        ws_config: WsClientConfig,
    ) -> Self {
        Self {
            venue,
            http,
            rate_limiter,
            auth,
            capabilities,
            ws_config,
            ws: OnceCell::new(),
            state: Mutex::new(AdapterState::Uninitialized),
            symbols: Mutex::new(SymbolTable::new()),
            markets_cache: TtlCache::new(MARKETS_CACHE_TTL),
            price_cache: TtlCache::new(PRICE_CACHE_TTL),
        }
    }

    /// Current lifecycle state.
    pub async fn state(&self) -> AdapterState {
        *self.state.lock().await
    }

    /// Fail with `NotInitialized` unless the adapter is `Ready`.
    pub async fn require_ready(&self) -> Result<(), ApiError> {
        if *self.state.lock().await == AdapterState::Ready {
            Ok(())
        } else {
            Err(ApiError::not_initialized(self.venue))
        }
    }

    /// Transition `Uninitialized → Ready`. Idempotent: calling this again
    /// while already `Ready` is a no-op.
    pub async fn mark_ready(&self) {
        let mut state = self.state.lock().await;
        if *state == AdapterState::Uninitialized {
            *state = AdapterState::Ready;
        }
    }

    /// Transition to `Disconnected`, clear caches, and tear down the
    /// WebSocket manager if one was ever created. Safe to call
    /// repeatedly.
    pub async fn mark_disconnected(&self) {
        *self.state.lock().await = AdapterState::Disconnected;
        self.markets_cache.clear();
        self.price_cache.clear();
        self.symbols.lock().await.clear();
        if let Some(ws) = self.ws.get() {
            ws.disconnect();
        }
        self.http.abort_all();
    }

    /// Fail with `MissingCredentials` unless the auth strategy was
    /// constructed with signing material, without making a request.
    pub fn require_auth(&self, has_credentials: bool) -> Result<(), ApiError> {
        if has_credentials {
            Ok(())
        } else {
            Err(ApiError::missing_credentials(self.venue))
        }
    }

    /// Get-or-refresh the markets cache. The venue adapter's `fetch`
    /// closure is responsible for calling [`Self::register_symbol`] for
    /// each market as it parses the raw response, since only the adapter
    /// knows both the unified and venue-native spelling at parse time.
    pub async fn markets<F, Fut>(&self, fetch: F) -> Result<Vec<Market>, ApiError>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<Vec<Market>, ApiError>>,
    {
        self.markets_cache
            .get_or_refresh(MARKETS_CACHE_KEY, fetch)
            .await
    }

    /// Get-or-refresh an arbitrary JSON price snapshot, keyed by symbol.
    pub async fn price_snapshot<F, Fut>(
        &self,
        symbol: &str,
        fetch: F,
    ) -> Result<serde_json::Value, ApiError>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<serde_json::Value, ApiError>>,
    {
        self.price_cache.get_or_refresh(symbol, fetch).await
    }

    /// Translate a unified symbol to its venue-native spelling.
    pub async fn to_venue(&self, unified: &str) -> Result<String, ApiError> {
        self.symbols.lock().await.to_venue(self.venue, unified)
    }

    /// Translate a venue-native symbol to its unified spelling.
    pub async fn from_venue(&self, venue_symbol: &str) -> Result<String, ApiError> {
        self.symbols.lock().await.from_venue(self.venue, venue_symbol)
    }

    /// Register one unified ⇄ venue symbol pair directly, e.g. from a
    /// venue response that didn't go through `markets()`.
    pub async fn register_symbol(&self, unified: impl Into<String>, venue_symbol: impl Into<String>) {
        self.symbols.lock().await.insert(unified, venue_symbol);
    }

    /// The lazily-initialized WebSocket manager, dialing on first access.
    pub async fn ws(&self) -> &WsManager {
        self.ws
            .get_or_init(|| async { WsManager::connect(self.venue, self.ws_config.clone()) })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capability_map_defaults_unknown_operations_to_unsupported() {
        let caps = CapabilityMap::new().set("fetchMarkets", Capability::Supported);
        assert_eq!(caps.get("fetchMarkets"), Capability::Supported);
        assert_eq!(caps.get("createOrder"), Capability::Unsupported);
    }

    #[test]
    fn capability_check_fails_closed() {
        let caps = CapabilityMap::new();
        let err = caps.check(VenueId::Reference, "createOrder").unwrap_err();
        assert_eq!(err.category, ErrorCategory::NotSupported);
    }

    #[tokio::test]
    async fn ttl_cache_refreshes_only_once_under_concurrent_callers() {
        use std::sync::atomic::{AtomicU32, Ordering};

        let cache: Arc<TtlCache<u32>> = Arc::new(TtlCache::new(Duration::from_millis(50)));
        let calls = Arc::new(AtomicU32::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = Arc::clone(&cache);
            let calls = Arc::clone(&calls);
            handles.push(async move {
                cache
                    .get_or_refresh("k", || async {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                        Ok::<_, ApiError>(42)
                    })
                    .await
            });
        }

        let results = futures_util::future::join_all(handles).await;
        for result in results {
            assert_eq!(result.unwrap(), 42);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
