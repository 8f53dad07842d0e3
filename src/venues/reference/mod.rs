//! `ReferenceAdapter`: the one concrete [`VenueAdapter`] this crate ships
//! to prove the trait is satisfiable, over a generic JSON REST/WebSocket
//! perpetuals venue.
//!
//! Composed the way a market/user websocket split composes its two
//! halves: one [`AdapterCore`] held and delegated to, with this module
//! supplying only venue-specific wire paths and normalization.

pub mod wire;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::mpsc;
use url::Url;

use crate::adapter::{
    AdapterCore, AdapterState, Capability, CapabilityMap, CreateOrderRequest, VenueAdapter,
    WatchStream,
};
use crate::auth::hmac::HmacStrategy;
use crate::auth::AuthStrategy;
use crate::config::{ExchangeConfig, VenueId};
use crate::error::{ApiError, ErrorCategory};
use crate::http::{HttpClient, HttpClientConfig, RequestOptions};
use crate::normalize::Normalizer;
use crate::rate_limiter::{RateLimiter, RateLimiterConfig};
use crate::types::{Balance, Candle, FundingRate, Market, Order, OrderBook, Position, Ticker, Trade};
use crate::ws::WsClientConfig;

use self::wire::{unified_to_venue_symbol, venue_symbol_to_unified, ReferenceNormalizer};

const PRODUCTION_URL: &str = "https://api.reference-perp.example/";
const TESTNET_URL: &str = "https://testnet-api.reference-perp.example/";
const PRODUCTION_WS_URL: &str = "wss://ws.reference-perp.example/";
const TESTNET_WS_URL: &str = "wss://testnet-ws.reference-perp.example/";

fn default_capabilities() -> CapabilityMap {
    CapabilityMap::new()
        .set("fetchMarkets", Capability::Supported)
        .set("fetchTicker", Capability::Supported)
        .set("fetchOrderBook", Capability::Supported)
        .set("fetchTrades", Capability::Supported)
        .set("fetchOHLCV", Capability::Supported)
        .set("fetchFundingRate", Capability::Supported)
        .set("fetchFundingRateHistory", Capability::Supported)
        .set("fetchPositions", Capability::Supported)
        .set("fetchBalance", Capability::Supported)
        .set("fetchOpenOrders", Capability::Supported)
        .set("fetchOrderHistory", Capability::Supported)
        .set("fetchMyTrades", Capability::Supported)
        .set("createOrder", Capability::Supported)
        .set("cancelOrder", Capability::Supported)
        .set("cancelAllOrders", Capability::Supported)
        .set("setLeverage", Capability::Supported)
        .set("watchTicker", Capability::Supported)
        .set("watchOrderBook", Capability::Supported)
        .set("watchTrades", Capability::Supported)
        .set("watchPositions", Capability::Supported)
        .set("watchOrders", Capability::Supported)
        .set("watchBalance", Capability::Supported)
}

/// A reference [`VenueAdapter`] over a generic JSON perpetuals venue.
pub struct ReferenceAdapter {
    core: AdapterCore,
    has_credentials: bool,
    normalizer: ReferenceNormalizer,
}

impl std::fmt::Debug for ReferenceAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReferenceAdapter").finish_non_exhaustive()
    }
}

impl ReferenceAdapter {
    /// Construct (but do not `initialize`) an adapter instance from
    /// `config`. Matches `fn(ExchangeConfig) -> Box<dyn VenueAdapter>`
    /// so it can live in [`crate::config::create_exchange`]'s registry —
    /// this must never fail; missing credentials only surface once a
    /// signed operation is actually called.
    #[must_use]
    pub fn new(config: ExchangeConfig) -> Self {
        let base_url = if config.testnet { TESTNET_URL } else { PRODUCTION_URL };
        let ws_url = if config.testnet { TESTNET_WS_URL } else { PRODUCTION_WS_URL };

        let mut http_config = HttpClientConfig::new(Url::parse(base_url).expect("static url"));
        if let Some(timeout_ms) = config.timeout_ms {
            http_config.timeout = std::time::Duration::from_millis(timeout_ms);
        }

        let has_credentials = config.api_key.is_some() && config.api_secret.is_some();
        let auth: Arc<dyn AuthStrategy> = Arc::new(HmacStrategy::new(
            VenueId::Reference,
            config.api_key.clone().unwrap_or_default(),
            config.api_secret.clone().unwrap_or_default(),
        ));

        let mut rate_limit_config = RateLimiterConfig::default();
        if let Some(max_tokens) = config.rate_limit.max_tokens {
            rate_limit_config.max_tokens = f64::from(max_tokens);
        }
        if let Some(window_ms) = config.rate_limit.window_ms {
            #[allow(clippy::cast_precision_loss)]
            {
                rate_limit_config.window_ms = window_ms as f64;
            }
        }
        for (operation, weight) in &config.rate_limit.weights {
            rate_limit_config.weights.insert(operation.clone(), f64::from(*weight));
        }

        let ws_config = WsClientConfig {
            url: Url::parse(ws_url).expect("static url"),
            ..WsClientConfig::default()
        };

        let core = AdapterCore::new(
            VenueId::Reference,
            HttpClient::new(VenueId::Reference, http_config),
            RateLimiter::new(rate_limit_config),
            auth,
            default_capabilities(),
            ws_config,
        );

        Self {
            core,
            has_credentials,
            normalizer: ReferenceNormalizer,
        }
    }

    fn gate(&self, operation: &str) -> Result<(), ApiError> {
        self.core.capabilities.check(VenueId::Reference, operation)
    }

    async fn acquire(&self, operation: &str) {
        self.core.rate_limiter.acquire(operation, None).await;
    }

    /// Build signed [`RequestOptions`] for a private endpoint: canonicalize
    /// `params` into a deterministic string, stamp a nonce, and merge the
    /// resulting headers on top of the call.
    fn signed_options(&self, method: &str, params: &serde_json::Value) -> Result<RequestOptions, ApiError> {
        let signature = self.core.auth.sign(&crate::auth::SignableRequest {
            method: method.to_string(),
            path: String::new(),
            params: crate::auth::params_to_str(params),
            nonce: crate::auth::epoch_ms(),
        })?;
        Ok(RequestOptions {
            headers: signature.headers,
            ..RequestOptions::default()
        })
    }

    async fn watch_channel<T, F>(
        &self,
        key: String,
        subscribe: serde_json::Value,
        unsubscribe: Option<serde_json::Value>,
        normalize: F,
    ) -> Result<WatchStream<T>, ApiError>
    where
        F: Fn(&serde_json::Value) -> Result<T, ApiError> + Send + Sync + 'static,
        T: Send + 'static,
    {
        let ws = self.core.ws().await;
        let mut subscription = ws.watch(key, subscribe, unsubscribe).await?;
        let (tx, rx) = mpsc::channel(256);

        tokio::spawn(async move {
            while let Some(raw) = subscription.receiver.recv().await {
                match normalize(&raw) {
                    Ok(value) => {
                        if tx.send(value).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => log::warn!("dropping unparseable streamed frame: {e}"),
                }
            }
        });

        Ok(rx)
    }
}

#[async_trait]
impl VenueAdapter for ReferenceAdapter {
    fn venue_id(&self) -> VenueId {
        VenueId::Reference
    }

    fn capabilities(&self) -> &CapabilityMap {
        &self.core.capabilities
    }

    async fn state(&self) -> AdapterState {
        self.core.state().await
    }

    async fn initialize(&self) -> Result<(), ApiError> {
        // Bypasses the `require_ready` gate deliberately: this is the
        // connectivity check that earns `Ready` in the first place, so it
        // must run while the adapter is still `Uninitialized`.
        self.fetch_markets_inner().await.map_err(|e| {
            ApiError::new(
                VenueId::Reference,
                ErrorCategory::ExchangeUnavailable,
                format!("initialize failed while priming markets: {e}"),
            )
        })?;
        self.core.mark_ready().await;
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), ApiError> {
        self.core.mark_disconnected().await;
        Ok(())
    }

    fn to_venue(&self, unified: &str) -> Result<String, ApiError> {
        unified_to_venue_symbol(unified)
    }

    fn from_venue(&self, venue_symbol: &str) -> Result<String, ApiError> {
        venue_symbol_to_unified(venue_symbol).map(|(_, unified)| unified)
    }

    async fn fetch_markets(&self) -> Result<Vec<Market>, ApiError> {
        self.gate("fetchMarkets")?;
        self.core.require_ready().await?;
        self.fetch_markets_inner().await
    }

    async fn fetch_ticker(&self, symbol: &str) -> Result<Ticker, ApiError> {
        self.gate("fetchTicker")?;
        self.core.require_ready().await?;
        self.acquire("fetchTicker").await;

        let venue_symbol = self.core.to_venue(symbol).await?;
        let path = format!("v1/ticker?symbol={venue_symbol}");
        let body = self
            .core
            .price_snapshot(symbol, || async {
                self.core.http.get(&path, RequestOptions::default()).await
            })
            .await?;
        self.normalizer.normalize_ticker(symbol, &body)
    }

    async fn fetch_order_book(&self, symbol: &str, depth: Option<u32>) -> Result<OrderBook, ApiError> {
        self.gate("fetchOrderBook")?;
        self.core.require_ready().await?;
        self.acquire("fetchOrderBook").await;

        let venue_symbol = self.core.to_venue(symbol).await?;
        let mut path = format!("v1/orderbook?symbol={venue_symbol}");
        if let Some(depth) = depth {
            path.push_str(&format!("&depth={depth}"));
        }
        let body = self.core.http.get(&path, RequestOptions::default()).await?;
        self.normalizer.normalize_order_book(symbol, &body)
    }

    async fn fetch_trades(&self, symbol: &str, limit: Option<u32>) -> Result<Vec<Trade>, ApiError> {
        self.gate("fetchTrades")?;
        self.core.require_ready().await?;
        self.acquire("fetchTrades").await;

        let venue_symbol = self.core.to_venue(symbol).await?;
        let mut path = format!("v1/trades?symbol={venue_symbol}");
        if let Some(limit) = limit {
            path.push_str(&format!("&limit={limit}"));
        }
        let body = self.core.http.get(&path, RequestOptions::default()).await?;
        let entries = body
            .as_array()
            .ok_or_else(|| ApiError::bad_response(VenueId::Reference, "trades response is not an array"))?;

        entries
            .iter()
            .map(|raw| self.normalizer.normalize_trade(symbol, raw))
            .collect()
    }

    async fn fetch_ohlcv(
        &self,
        symbol: &str,
        interval: &str,
        limit: Option<u32>,
    ) -> Result<Vec<Candle>, ApiError> {
        self.gate("fetchOHLCV")?;
        self.core.require_ready().await?;
        self.acquire("fetchOHLCV").await;

        let venue_symbol = self.core.to_venue(symbol).await?;
        let mut path = format!("v1/candles?symbol={venue_symbol}&interval={interval}");
        if let Some(limit) = limit {
            path.push_str(&format!("&limit={limit}"));
        }
        let body = self.core.http.get(&path, RequestOptions::default()).await?;
        let entries = body
            .as_array()
            .ok_or_else(|| ApiError::bad_response(VenueId::Reference, "candles response is not an array"))?;

        entries.iter().map(|raw| self.normalizer.normalize_candle(raw)).collect()
    }

    async fn fetch_funding_rate(&self, symbol: &str) -> Result<FundingRate, ApiError> {
        self.gate("fetchFundingRate")?;
        self.core.require_ready().await?;
        self.acquire("fetchFundingRate").await;

        let venue_symbol = self.core.to_venue(symbol).await?;
        let path = format!("v1/funding?symbol={venue_symbol}");
        let body = self.core.http.get(&path, RequestOptions::default()).await?;
        self.normalizer.normalize_funding_rate(symbol, &body)
    }

    async fn fetch_funding_rate_history(
        &self,
        symbol: &str,
        limit: Option<u32>,
    ) -> Result<Vec<FundingRate>, ApiError> {
        self.gate("fetchFundingRateHistory")?;
        self.core.require_ready().await?;
        self.acquire("fetchFundingRateHistory").await;

        let venue_symbol = self.core.to_venue(symbol).await?;
        let mut path = format!("v1/funding/history?symbol={venue_symbol}");
        if let Some(limit) = limit {
            path.push_str(&format!("&limit={limit}"));
        }
        let body = self.core.http.get(&path, RequestOptions::default()).await?;
        let history = body
            .get("fundingHistory")
            .and_then(serde_json::Value::as_array)
            .ok_or_else(|| ApiError::bad_response(VenueId::Reference, "missing `fundingHistory` array"))?;

        history
            .iter()
            .map(|entry| {
                self.normalizer
                    .normalize_funding_rate(symbol, &json!({ "fundingHistory": [entry] }))
            })
            .collect()
    }

    async fn fetch_positions(&self, symbols: Option<&[String]>) -> Result<Vec<Position>, ApiError> {
        self.gate("fetchPositions")?;
        self.core.require_ready().await?;
        self.core.require_auth(self.has_credentials)?;
        self.acquire("fetchPositions").await;

        let opts = self.signed_options("fetchPositions", &json!({}))?;
        let body = self.core.http.get("v1/positions", opts).await?;
        let entries = body
            .as_array()
            .ok_or_else(|| ApiError::bad_response(VenueId::Reference, "positions response is not an array"))?;

        let mut positions = Vec::new();
        for raw in entries {
            let venue_symbol = raw
                .get("coin")
                .and_then(serde_json::Value::as_str)
                .ok_or_else(|| ApiError::bad_response(VenueId::Reference, "position missing `coin`"))?;
            let symbol = self
                .core
                .from_venue(&format!("{venue_symbol}-PERP"))
                .await
                .unwrap_or_else(|_| format!("{venue_symbol}/USDT:USDT"));

            if let Some(filter) = symbols {
                if !filter.iter().any(|s| s == &symbol) {
                    continue;
                }
            }
            positions.push(self.normalizer.normalize_position(&symbol, raw)?);
        }
        Ok(positions)
    }

    async fn fetch_balance(&self) -> Result<Vec<Balance>, ApiError> {
        self.gate("fetchBalance")?;
        self.core.require_ready().await?;
        self.core.require_auth(self.has_credentials)?;
        self.acquire("fetchBalance").await;

        let opts = self.signed_options("fetchBalance", &json!({}))?;
        let body = self.core.http.get("v1/balance", opts).await?;
        let entries = body
            .as_array()
            .ok_or_else(|| ApiError::bad_response(VenueId::Reference, "balance response is not an array"))?;

        entries.iter().map(|raw| self.normalizer.normalize_balance(raw)).collect()
    }

    async fn fetch_open_orders(&self, symbol: Option<&str>) -> Result<Vec<Order>, ApiError> {
        self.gate("fetchOpenOrders")?;
        self.core.require_ready().await?;
        self.core.require_auth(self.has_credentials)?;
        self.acquire("fetchOpenOrders").await;
        self.fetch_order_list("fetchOpenOrders", "v1/orders/open", symbol).await
    }

    async fn fetch_order_history(&self, symbol: Option<&str>) -> Result<Vec<Order>, ApiError> {
        self.gate("fetchOrderHistory")?;
        self.core.require_ready().await?;
        self.core.require_auth(self.has_credentials)?;
        self.acquire("fetchOrderHistory").await;
        self.fetch_order_list("fetchOrderHistory", "v1/orders/history", symbol).await
    }

    async fn fetch_my_trades(&self, symbol: Option<&str>) -> Result<Vec<Trade>, ApiError> {
        self.gate("fetchMyTrades")?;
        self.core.require_ready().await?;
        self.core.require_auth(self.has_credentials)?;
        self.acquire("fetchMyTrades").await;

        let mut path = "v1/trades/mine".to_string();
        if let Some(symbol) = symbol {
            let venue_symbol = self.core.to_venue(symbol).await?;
            path.push_str(&format!("?symbol={venue_symbol}"));
        }
        let opts = self.signed_options("fetchMyTrades", &json!({ "symbol": symbol }))?;
        let body = self.core.http.get(&path, opts).await?;
        let entries = body
            .as_array()
            .ok_or_else(|| ApiError::bad_response(VenueId::Reference, "trades response is not an array"))?;

        entries
            .iter()
            .map(|raw| {
                let symbol = symbol.unwrap_or("UNKNOWN/USDT:USDT");
                self.normalizer.normalize_trade(symbol, raw)
            })
            .collect()
    }

    async fn create_order(&self, request: CreateOrderRequest) -> Result<Order, ApiError> {
        self.gate("createOrder")?;
        self.core.require_ready().await?;
        self.core.require_auth(self.has_credentials)?;
        self.acquire("createOrder").await;

        let venue_symbol = self.core.to_venue(&request.symbol).await?;
        let body = json!({
            "symbol": &request.symbol,
            "coin": venue_symbol,
            "side": matches!(request.side, crate::types::OrderSide::Buy).then_some("buy").unwrap_or("sell"),
            "amount": request.amount.to_string(),
            "price": request.price.map(|p| p.to_string()),
            "postOnly": request.post_only,
            "reduceOnly": request.reduce_only,
            "clientOrderId": request.client_order_id,
        });

        let opts = self.signed_options("createOrder", &body)?;
        let response = self.core.http.post("v1/orders", body, opts).await?;

        let mut order = self.normalizer.normalize_order(&response)?;
        order.requested_amount = request.amount;
        order.remaining_amount = request.amount - order.filled_amount;
        order.price = request.price;
        order.side = request.side;
        order.order_type = request.order_type;
        order.time_in_force = request.time_in_force;
        order.post_only = request.post_only;
        order.reduce_only = request.reduce_only;
        order.client_order_id = request.client_order_id;
        Ok(order)
    }

    async fn cancel_order(&self, id: &str, symbol: Option<&str>) -> Result<(), ApiError> {
        self.gate("cancelOrder")?;
        self.core.require_ready().await?;
        self.core.require_auth(self.has_credentials)?;
        self.acquire("cancelOrder").await;

        let mut path = format!("v1/orders/{id}");
        if let Some(symbol) = symbol {
            let venue_symbol = self.core.to_venue(symbol).await?;
            path.push_str(&format!("?symbol={venue_symbol}"));
        }
        let opts = self.signed_options("cancelOrder", &json!({ "id": id, "symbol": symbol }))?;
        self.core.http.delete(&path, None, opts).await?;
        Ok(())
    }

    async fn cancel_all_orders(&self, symbol: Option<&str>) -> Result<(), ApiError> {
        self.gate("cancelAllOrders")?;
        self.core.require_ready().await?;
        self.core.require_auth(self.has_credentials)?;
        self.acquire("cancelAllOrders").await;

        let mut path = "v1/orders".to_string();
        if let Some(symbol) = symbol {
            let venue_symbol = self.core.to_venue(symbol).await?;
            path.push_str(&format!("?symbol={venue_symbol}"));
        }
        let opts = self.signed_options("cancelAllOrders", &json!({ "symbol": symbol }))?;
        self.core.http.delete(&path, None, opts).await?;
        Ok(())
    }

    async fn set_leverage(&self, symbol: &str, leverage: u32) -> Result<(), ApiError> {
        self.gate("setLeverage")?;
        self.core.require_ready().await?;
        self.core.require_auth(self.has_credentials)?;
        self.acquire("setLeverage").await;

        let venue_symbol = self.core.to_venue(symbol).await?;
        let body = json!({ "coin": venue_symbol, "leverage": leverage });
        let opts = self.signed_options("setLeverage", &body)?;
        self.core.http.post("v1/leverage", body, opts).await?;
        Ok(())
    }

    async fn watch_ticker(&self, symbol: &str) -> Result<WatchStream<Ticker>, ApiError> {
        self.gate("watchTicker")?;
        self.core.require_ready().await?;
        let venue_symbol = self.core.to_venue(symbol).await?;
        let key = format!("ticker.{venue_symbol}");
        let symbol = symbol.to_string();
        let normalizer = ReferenceNormalizer;
        self.watch_channel(
            key.clone(),
            json!({ "method": "subscribe", "channel": "ticker", "symbol": venue_symbol }),
            Some(json!({ "method": "unsubscribe", "channel": "ticker", "symbol": venue_symbol })),
            move |raw| normalizer.normalize_ticker(&symbol, raw),
        )
        .await
    }

    async fn watch_order_book(&self, symbol: &str) -> Result<WatchStream<OrderBook>, ApiError> {
        self.gate("watchOrderBook")?;
        self.core.require_ready().await?;
        let venue_symbol = self.core.to_venue(symbol).await?;
        let key = format!("orderbook.{venue_symbol}");
        let symbol = symbol.to_string();
        let normalizer = ReferenceNormalizer;
        self.watch_channel(
            key.clone(),
            json!({ "method": "subscribe", "channel": "orderbook", "symbol": venue_symbol }),
            Some(json!({ "method": "unsubscribe", "channel": "orderbook", "symbol": venue_symbol })),
            move |raw| normalizer.normalize_order_book(&symbol, raw),
        )
        .await
    }

    async fn watch_trades(&self, symbol: &str) -> Result<WatchStream<Trade>, ApiError> {
        self.gate("watchTrades")?;
        self.core.require_ready().await?;
        let venue_symbol = self.core.to_venue(symbol).await?;
        let key = format!("trades.{venue_symbol}");
        let symbol = symbol.to_string();
        let normalizer = ReferenceNormalizer;
        self.watch_channel(
            key.clone(),
            json!({ "method": "subscribe", "channel": "trades", "symbol": venue_symbol }),
            Some(json!({ "method": "unsubscribe", "channel": "trades", "symbol": venue_symbol })),
            move |raw| normalizer.normalize_trade(&symbol, raw),
        )
        .await
    }

    async fn watch_positions(&self) -> Result<WatchStream<Vec<Position>>, ApiError> {
        self.gate("watchPositions")?;
        self.core.require_ready().await?;
        self.core.require_auth(self.has_credentials)?;
        let normalizer = ReferenceNormalizer;
        self.watch_channel(
            "positions".to_string(),
            json!({ "method": "subscribe", "channel": "positions" }),
            None,
            move |raw| {
                let entries = raw
                    .as_array()
                    .ok_or_else(|| ApiError::bad_response(VenueId::Reference, "positions frame is not an array"))?;
                entries
                    .iter()
                    .map(|entry| {
                        let coin = entry.get("coin").and_then(serde_json::Value::as_str).unwrap_or("UNKNOWN");
                        normalizer.normalize_position(&format!("{coin}/USDT:USDT"), entry)
                    })
                    .collect()
            },
        )
        .await
    }

    async fn watch_orders(&self) -> Result<WatchStream<Order>, ApiError> {
        self.gate("watchOrders")?;
        self.core.require_ready().await?;
        self.core.require_auth(self.has_credentials)?;
        let normalizer = ReferenceNormalizer;
        self.watch_channel(
            "orders".to_string(),
            json!({ "method": "subscribe", "channel": "orders" }),
            None,
            move |raw| normalizer.normalize_order(raw),
        )
        .await
    }

    async fn watch_balance(&self) -> Result<WatchStream<Vec<Balance>>, ApiError> {
        self.gate("watchBalance")?;
        self.core.require_ready().await?;
        self.core.require_auth(self.has_credentials)?;
        let normalizer = ReferenceNormalizer;
        self.watch_channel(
            "balance".to_string(),
            json!({ "method": "subscribe", "channel": "balance" }),
            None,
            move |raw| {
                let entries = raw
                    .as_array()
                    .ok_or_else(|| ApiError::bad_response(VenueId::Reference, "balance frame is not an array"))?;
                entries.iter().map(|entry| normalizer.normalize_balance(entry)).collect()
            },
        )
        .await
    }
}

impl ReferenceAdapter {
    /// The body of `fetchMarkets`, without the `require_ready` gate: the
    /// one place that gate must not apply is `initialize()`, which calls
    /// this directly to earn `Ready` in the first place.
    async fn fetch_markets_inner(&self) -> Result<Vec<Market>, ApiError> {
        self.acquire("fetchMarkets").await;

        let normalizer = &self.normalizer;
        let core = &self.core;
        core.markets(|| async {
            let body = self
                .core
                .http
                .get("v1/markets", RequestOptions::default())
                .await?;
            let universe = body
                .get("universe")
                .and_then(serde_json::Value::as_array)
                .ok_or_else(|| ApiError::bad_response(VenueId::Reference, "missing `universe` array"))?;

            let mut markets = Vec::with_capacity(universe.len());
            for raw in universe {
                let market = normalizer.normalize_market(raw)?;
                core.register_symbol(market.symbol.clone(), wire::unified_to_venue_symbol(&market.symbol)?)
                    .await;
                markets.push(market);
            }
            Ok(markets)
        })
        .await
    }

    async fn fetch_order_list(
        &self,
        operation: &str,
        path: &str,
        symbol: Option<&str>,
    ) -> Result<Vec<Order>, ApiError> {
        let mut path = path.to_string();
        if let Some(symbol) = symbol {
            let venue_symbol = self.core.to_venue(symbol).await?;
            path.push_str(&format!("?symbol={venue_symbol}"));
        }
        let opts = self.signed_options(operation, &json!({ "symbol": symbol }))?;
        let body = self.core.http.get(&path, opts).await?;
        let entries = body
            .as_array()
            .ok_or_else(|| ApiError::bad_response(VenueId::Reference, "orders response is not an array"))?;
        entries.iter().map(|raw| self.normalizer.normalize_order(raw)).collect()
    }
}
