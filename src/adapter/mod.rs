//! The polymorphic adapter contract every venue implements, plus the
//! shared composition ([`AdapterCore`]) instances are built from.
//!
//! One `#[async_trait] trait`, many venue implementations, rather than a
//! sum type with a dispatch method — keeps adding a new venue an
//! additive, out-of-tree operation.

pub mod core;
pub mod symbol;

pub use core::{AdapterCore, AdapterState, Capability, CapabilityMap};
pub use symbol::SymbolTable;

use async_trait::async_trait;
use rust_decimal::Decimal;
use tokio::sync::mpsc;

use crate::config::VenueId;
use crate::error::ApiError;
use crate::types::{
    Balance, Candle, FundingRate, Market, Order, OrderBook, OrderSide, OrderType, Position,
    TimeInForce, Ticker, Trade,
};

/// Input to `createOrder`; not a unified output record, so it lives here
/// rather than in [`crate::types`].
#[derive(Clone, Debug)]
pub struct CreateOrderRequest {
    /// Unified symbol, e.g. `"BTC/USDT:USDT"`.
    pub symbol: String,
    /// Order type.
    pub order_type: OrderType,
    /// Buy or sell.
    pub side: OrderSide,
    /// Requested size in base units.
    pub amount: Decimal,
    /// Limit price; required for limit-family order types.
    pub price: Option<Decimal>,
    /// Caller-assigned correlation id, echoed back where the venue
    /// supports client order ids.
    pub client_order_id: Option<String>,
    /// Reject instead of crossing the spread.
    pub post_only: bool,
    /// Only permitted to reduce an existing position.
    pub reduce_only: bool,
    /// Time-in-force.
    pub time_in_force: TimeInForce,
}

/// The channel a `watch*` call hands back to its caller: a lazy,
/// infinite, non-restartable sequence of unified records. Dropping the
/// receiver is the sole unsubscribe trigger.
pub type WatchStream<T> = mpsc::Receiver<T>;

/// The uniform operational contract every venue adapter satisfies.
/// Object-safe: every method either takes `&self` with concrete
/// argument/return types, or is a plain getter, so this trait can be
/// stored as `Box<dyn VenueAdapter>` in the venue registry
/// ([`crate::config::create_exchange`]).
#[async_trait]
pub trait VenueAdapter: Send + Sync {
    /// Which venue this instance talks to.
    fn venue_id(&self) -> VenueId;

    /// This instance's capability map.
    fn capabilities(&self) -> &CapabilityMap;

    /// Current lifecycle state.
    async fn state(&self) -> AdapterState;

    /// Idempotent. Verifies connectivity by fetching markets, constructs
    /// dependent components, transitions `Uninitialized → Ready`. Fails
    /// fast with `ExchangeUnavailable` on connectivity failure.
    async fn initialize(&self) -> Result<(), ApiError>;

    /// Releases all streams, closes sockets, clears caches, transitions
    /// to `Disconnected`. Safe to call repeatedly.
    async fn disconnect(&self) -> Result<(), ApiError>;

    /// Translate a unified symbol into this venue's native spelling.
    fn to_venue(&self, unified: &str) -> Result<String, ApiError>;

    /// Translate a venue-native symbol into the unified format.
    fn from_venue(&self, venue_symbol: &str) -> Result<String, ApiError>;

    // --- Market data ---

    /// All markets this venue lists, cached with a ≈1 minute TTL.
    async fn fetch_markets(&self) -> Result<Vec<Market>, ApiError>;
    /// Current ticker snapshot for `symbol`.
    async fn fetch_ticker(&self, symbol: &str) -> Result<Ticker, ApiError>;
    /// Current order book for `symbol`, at most `depth` levels per side.
    async fn fetch_order_book(&self, symbol: &str, depth: Option<u32>) -> Result<OrderBook, ApiError>;
    /// Most recent public trades for `symbol`.
    async fn fetch_trades(&self, symbol: &str, limit: Option<u32>) -> Result<Vec<Trade>, ApiError>;
    /// OHLCV candles for `symbol` at `interval` (venue-native interval
    /// spelling, e.g. `"1m"`).
    async fn fetch_ohlcv(
        &self,
        symbol: &str,
        interval: &str,
        limit: Option<u32>,
    ) -> Result<Vec<Candle>, ApiError>;
    /// Current funding rate for `symbol`.
    async fn fetch_funding_rate(&self, symbol: &str) -> Result<FundingRate, ApiError>;
    /// Historical funding rates for `symbol`.
    async fn fetch_funding_rate_history(
        &self,
        symbol: &str,
        limit: Option<u32>,
    ) -> Result<Vec<FundingRate>, ApiError>;

    // --- Account ---

    /// Open positions, optionally filtered to `symbols`.
    async fn fetch_positions(&self, symbols: Option<&[String]>) -> Result<Vec<Position>, ApiError>;
    /// Account balances across all currencies.
    async fn fetch_balance(&self) -> Result<Vec<Balance>, ApiError>;
    /// Currently-open orders, optionally filtered to one symbol.
    async fn fetch_open_orders(&self, symbol: Option<&str>) -> Result<Vec<Order>, ApiError>;
    /// Historical (closed/canceled) orders, optionally filtered to one
    /// symbol.
    async fn fetch_order_history(&self, symbol: Option<&str>) -> Result<Vec<Order>, ApiError>;
    /// This account's own fills, optionally filtered to one symbol.
    async fn fetch_my_trades(&self, symbol: Option<&str>) -> Result<Vec<Trade>, ApiError>;

    // --- Trading ---

    /// Place an order.
    async fn create_order(&self, request: CreateOrderRequest) -> Result<Order, ApiError>;
    /// Cancel one order by id.
    async fn cancel_order(&self, id: &str, symbol: Option<&str>) -> Result<(), ApiError>;
    /// Cancel every open order, optionally filtered to one symbol.
    async fn cancel_all_orders(&self, symbol: Option<&str>) -> Result<(), ApiError>;
    /// Set leverage for `symbol`. Some venues implement this as a no-op:
    /// a venue may return `Ok(())` without issuing a request when it
    /// manages leverage differently.
    async fn set_leverage(&self, symbol: &str, leverage: u32) -> Result<(), ApiError>;

    // --- Streams ---

    /// Lazy sequence of ticker updates for `symbol`.
    async fn watch_ticker(&self, symbol: &str) -> Result<WatchStream<Ticker>, ApiError>;
    /// Lazy sequence of order book snapshots for `symbol` (streamed books
    /// replace, never merge).
    async fn watch_order_book(&self, symbol: &str) -> Result<WatchStream<OrderBook>, ApiError>;
    /// Lazy sequence of public trades for `symbol`.
    async fn watch_trades(&self, symbol: &str) -> Result<WatchStream<Trade>, ApiError>;
    /// Lazy sequence of this account's position snapshots.
    async fn watch_positions(&self) -> Result<WatchStream<Vec<Position>>, ApiError>;
    /// Lazy sequence of this account's order updates.
    async fn watch_orders(&self) -> Result<WatchStream<Order>, ApiError>;
    /// Lazy sequence of this account's balance snapshots.
    async fn watch_balance(&self) -> Result<WatchStream<Vec<Balance>>, ApiError>;
}
