//! Bidirectional venue-native ⇄ unified-record mapping.
//!
//! Pure, deterministic, total functions: no I/O, no state beyond
//! injected static lookups. Malformed input raises `BadResponse` rather
//! than fabricating a value — a missing funding rate field means the
//! call fails, not that a zero rate gets reported.

use rust_decimal::Decimal;
use serde_json::Value;

use crate::config::VenueId;
use crate::error::ApiError;
use crate::types::{Balance, Candle, FundingRate, Market, Order, OrderBook, Position, Ticker, Trade};

/// Per-venue implementation of the normalize* family. Each adapter owns
/// exactly one. Implementations are pure aside from reading their own
/// injected symbol/precision tables.
pub trait Normalizer: Send + Sync + std::fmt::Debug {
    /// Parse one venue-native market descriptor into a [`Market`].
    fn normalize_market(&self, raw: &Value) -> Result<Market, ApiError>;
    /// Parse a venue-native ticker payload into a [`Ticker`].
    fn normalize_ticker(&self, symbol: &str, raw: &Value) -> Result<Ticker, ApiError>;
    /// Parse venue-native order book levels into an [`OrderBook`].
    fn normalize_order_book(&self, symbol: &str, raw: &Value) -> Result<OrderBook, ApiError>;
    /// Parse a venue-native trade into a [`Trade`].
    fn normalize_trade(&self, symbol: &str, raw: &Value) -> Result<Trade, ApiError>;
    /// Parse a venue-native OHLCV candle into a [`Candle`].
    fn normalize_candle(&self, raw: &Value) -> Result<Candle, ApiError>;
    /// Parse a venue-native funding rate payload into a [`FundingRate`].
    fn normalize_funding_rate(&self, symbol: &str, raw: &Value) -> Result<FundingRate, ApiError>;
    /// Parse a venue-native order-placement/order-status payload into an
    /// [`Order`].
    fn normalize_order(&self, raw: &Value) -> Result<Order, ApiError>;
    /// Parse a venue-native position payload into a [`Position`].
    fn normalize_position(&self, symbol: &str, raw: &Value) -> Result<Position, ApiError>;
    /// Parse a venue-native balance payload into a [`Balance`].
    fn normalize_balance(&self, raw: &Value) -> Result<Balance, ApiError>;
}

/// Read a required string field, or fail with `BadResponse`.
pub fn require_str<'a>(venue: VenueId, raw: &'a Value, field: &str) -> Result<&'a str, ApiError> {
    raw.get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| ApiError::bad_response(venue, format!("missing or non-string field `{field}`")))
}

/// Read a required field and parse it as a [`Decimal`], accepting either
/// a JSON string or a JSON number — venues are inconsistent about which
/// they use for size/price fields, and both must parse without losing
/// precision.
pub fn require_decimal(venue: VenueId, raw: &Value, field: &str) -> Result<Decimal, ApiError> {
    let value = raw
        .get(field)
        .ok_or_else(|| ApiError::bad_response(venue, format!("missing field `{field}`")))?;

    let text = match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => {
            return Err(ApiError::bad_response(
                venue,
                format!("field `{field}` is neither a string nor a number"),
            ))
        }
    };

    text.parse::<Decimal>().map_err(|e| {
        ApiError::bad_response(venue, format!("field `{field}` is not a valid decimal: {e}"))
    })
}

/// Read a required u64 field.
pub fn require_u64(venue: VenueId, raw: &Value, field: &str) -> Result<u64, ApiError> {
    raw.get(field)
        .and_then(Value::as_u64)
        .ok_or_else(|| ApiError::bad_response(venue, format!("missing or non-integer field `{field}`")))
}
