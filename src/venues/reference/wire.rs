//! Wire-shape parsing for the reference adapter's generic JSON perpetuals
//! venue.
//!
//! The shapes (`universe`/`szDecimals`/`maxLeverage`, `szi`/`entryPx`/
//! `leverage.type`, `resting.oid`) read as a Hyperliquid-style wire
//! vocabulary, parsed with a `TryFrom<Raw...>`-conversion style: each
//! wire struct deserializes straight off the venue payload, then
//! converts fallibly into the unified record.

use rust_decimal::Decimal;
use serde_json::Value;

use crate::config::VenueId;
use crate::error::{ApiError, ErrorCategory};
use crate::normalize::{require_decimal, require_str, require_u64, Normalizer};
use crate::types::{
    Balance, Candle, FundingRate, Market, MarginMode, Order, OrderBook, OrderSide, OrderStatus,
    Position, PositionSide, Ticker, Trade,
};

/// Settlement currency every reference-venue perpetual is quoted and
/// margined in; this reference venue only lists USDT-margined markets.
const SETTLEMENT: &str = "USDT";

/// Translate a venue-native `BASE-PERP` spelling to this crate's unified
/// `BASE/QUOTE:SETTLE` symbol. Returns `(base, unified)` since callers
/// that parse market descriptors need the bare base currency too.
pub fn venue_symbol_to_unified(venue_symbol: &str) -> Result<(String, String), ApiError> {
    let base = venue_symbol.strip_suffix("-PERP").ok_or_else(|| {
        ApiError::bad_response(
            VenueId::Reference,
            format!("venue symbol {venue_symbol} is not a `-PERP` market"),
        )
    })?;
    Ok((base.to_string(), format!("{base}/{SETTLEMENT}:{SETTLEMENT}")))
}

/// Translate a unified `BASE/QUOTE:SETTLE` symbol back to this venue's
/// `BASE-PERP` spelling.
pub fn unified_to_venue_symbol(unified: &str) -> Result<String, ApiError> {
    let base = unified.split('/').next().ok_or_else(|| {
        ApiError::bad_response(VenueId::Reference, format!("malformed unified symbol {unified}"))
    })?;
    Ok(format!("{base}-PERP"))
}

/// The reference venue's [`Normalizer`].
#[derive(Debug, Default)]
pub struct ReferenceNormalizer;

impl Normalizer for ReferenceNormalizer {
    fn normalize_market(&self, raw: &Value) -> Result<Market, ApiError> {
        let venue = VenueId::Reference;
        let name = require_str(venue, raw, "name")?;
        let (base, symbol) = venue_symbol_to_unified(name)?;
        let size_decimals = require_u64(venue, raw, "szDecimals")?;
        let max_leverage = require_decimal(venue, raw, "maxLeverage")?;

        let step_size = Decimal::new(1, u32::try_from(size_decimals).unwrap_or(0));

        Ok(Market {
            symbol,
            base,
            quote: SETTLEMENT.to_string(),
            settlement: Some(SETTLEMENT.to_string()),
            active: true,
            tick_size: Decimal::new(1, 2),
            step_size,
            amount_precision: u32::try_from(size_decimals).unwrap_or(0),
            price_precision: 2,
            max_leverage,
            funding_interval_hours: Some(8),
        })
    }

    fn normalize_ticker(&self, symbol: &str, raw: &Value) -> Result<Ticker, ApiError> {
        let venue = VenueId::Reference;
        Ok(Ticker {
            symbol: symbol.to_string(),
            last: require_decimal(venue, raw, "last")?,
            bid: require_decimal(venue, raw, "bid")?,
            ask: require_decimal(venue, raw, "ask")?,
            high: require_decimal(venue, raw, "high")?,
            low: require_decimal(venue, raw, "low")?,
            volume: require_decimal(venue, raw, "volume")?,
            timestamp: require_u64(venue, raw, "timestamp")?,
        })
    }

    fn normalize_order_book(&self, symbol: &str, raw: &Value) -> Result<OrderBook, ApiError> {
        let venue = VenueId::Reference;
        let levels = raw
            .get("levels")
            .and_then(Value::as_array)
            .ok_or_else(|| ApiError::bad_response(venue, "missing `levels` array"))?;

        if levels.len() != 2 {
            return Err(ApiError::bad_response(
                venue,
                "`levels` must contain exactly two sides: [bids, asks]",
            ));
        }

        let parse_side = |side: &Value| -> Result<Vec<(Decimal, Decimal)>, ApiError> {
            let entries = side
                .as_array()
                .ok_or_else(|| ApiError::bad_response(venue, "order book side is not an array"))?;
            entries
                .iter()
                .map(|level| {
                    let pair = level.as_array().ok_or_else(|| {
                        ApiError::bad_response(venue, "order book level is not a [price, size] pair")
                    })?;
                    let (Some(price), Some(size)) = (pair.first(), pair.get(1)) else {
                        return Err(ApiError::bad_response(
                            venue,
                            "order book level missing price or size",
                        ));
                    };
                    let price = price
                        .as_str()
                        .ok_or_else(|| ApiError::bad_response(venue, "order book price is not a string"))?
                        .parse::<Decimal>()
                        .map_err(|e| ApiError::bad_response(venue, e.to_string()))?;
                    let size = size
                        .as_str()
                        .ok_or_else(|| ApiError::bad_response(venue, "order book size is not a string"))?
                        .parse::<Decimal>()
                        .map_err(|e| ApiError::bad_response(venue, e.to_string()))?;
                    Ok((price, size))
                })
                .collect()
        };

        let bids = parse_side(&levels[0])?;
        let asks = parse_side(&levels[1])?;

        Ok(OrderBook {
            symbol: symbol.to_string(),
            bids,
            asks,
            timestamp: raw.get("timestamp").and_then(Value::as_u64).unwrap_or(0),
            venue,
        })
    }

    fn normalize_trade(&self, symbol: &str, raw: &Value) -> Result<Trade, ApiError> {
        let venue = VenueId::Reference;
        let price = require_decimal(venue, raw, "px")?;
        let amount = require_decimal(venue, raw, "sz")?;
        let side = match require_str(venue, raw, "side")? {
            "B" | "buy" => OrderSide::Buy,
            "A" | "sell" => OrderSide::Sell,
            other => {
                return Err(ApiError::bad_response(venue, format!("unknown trade side `{other}`")))
            }
        };
        Ok(Trade::new(
            require_str(venue, raw, "tid")?.to_string(),
            symbol.to_string(),
            side,
            price,
            amount,
            require_u64(venue, raw, "time")?,
            raw.get("oid").and_then(Value::as_str).map(str::to_string),
        ))
    }

    fn normalize_candle(&self, raw: &Value) -> Result<Candle, ApiError> {
        let venue = VenueId::Reference;
        Ok(Candle {
            timestamp: require_u64(venue, raw, "t")?,
            open: require_decimal(venue, raw, "o")?,
            high: require_decimal(venue, raw, "h")?,
            low: require_decimal(venue, raw, "l")?,
            close: require_decimal(venue, raw, "c")?,
            volume: require_decimal(venue, raw, "v")?,
        })
    }

    fn normalize_funding_rate(&self, symbol: &str, raw: &Value) -> Result<FundingRate, ApiError> {
        let venue = VenueId::Reference;
        let history = raw
            .get("fundingHistory")
            .and_then(Value::as_array)
            .ok_or_else(|| ApiError::bad_response(venue, "missing `fundingHistory` array"))?;

        let latest = history.last().ok_or_else(|| {
            ApiError::bad_response(venue, "empty funding rate history, cannot derive current rate")
        })?;

        Ok(FundingRate {
            symbol: symbol.to_string(),
            rate: require_decimal(venue, latest, "fundingRate")?,
            funding_timestamp: require_u64(venue, latest, "time")?,
            next_funding_timestamp: require_u64(venue, latest, "time")? + 8 * 3_600_000,
            mark_price: require_decimal(venue, latest, "markPx")?,
            index_price: require_decimal(venue, latest, "oraclePx")?,
            interval_hours: 8,
        })
    }

    fn normalize_order(&self, raw: &Value) -> Result<Order, ApiError> {
        let venue = VenueId::Reference;

        if let Some(id) = raw
            .pointer("/response/data/statuses/0/resting/oid")
            .and_then(|v| v.as_u64().map(|n| n.to_string()).or_else(|| v.as_str().map(str::to_string)))
        {
            return Ok(Order {
                id,
                client_order_id: None,
                symbol: raw
                    .get("symbol")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                order_type: crate::types::OrderType::Limit,
                side: OrderSide::Buy,
                requested_amount: raw
                    .get("amount")
                    .and_then(Value::as_str)
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(Decimal::ZERO),
                price: None,
                filled_amount: Decimal::ZERO,
                remaining_amount: raw
                    .get("amount")
                    .and_then(Value::as_str)
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(Decimal::ZERO),
                average_fill_price: None,
                status: OrderStatus::Open,
                post_only: false,
                reduce_only: false,
                time_in_force: crate::types::TimeInForce::Gtc,
                timestamp: 0,
            });
        }

        Err(ApiError::new(
            venue,
            ErrorCategory::OrderRejected,
            format!("order response had no resting/filled status: {raw}"),
        ))
    }

    fn normalize_position(&self, symbol: &str, raw: &Value) -> Result<Position, ApiError> {
        let venue = VenueId::Reference;
        let signed_size = require_decimal(venue, raw, "szi")?;
        let side = if signed_size.is_sign_negative() {
            PositionSide::Short
        } else {
            PositionSide::Long
        };

        let margin_mode = match raw.pointer("/leverage/type").and_then(Value::as_str) {
            Some("isolated") => MarginMode::Isolated,
            Some("cross") => MarginMode::Cross,
            _ => {
                return Err(ApiError::bad_response(venue, "missing or unknown `leverage.type`"))
            }
        };

        let leverage = raw
            .pointer("/leverage/value")
            .and_then(Value::as_u64)
            .ok_or_else(|| ApiError::bad_response(venue, "missing `leverage.value`"))?;

        Ok(Position {
            symbol: symbol.to_string(),
            side,
            size: signed_size.abs(),
            entry_price: require_decimal(venue, raw, "entryPx")?,
            mark_price: raw
                .get("markPx")
                .and_then(Value::as_str)
                .and_then(|s| s.parse().ok())
                .unwrap_or(Decimal::ZERO),
            liquidation_price: raw
                .get("liquidationPx")
                .and_then(Value::as_str)
                .and_then(|s| s.parse().ok()),
            unrealized_pnl: raw
                .get("unrealizedPnl")
                .and_then(Value::as_str)
                .and_then(|s| s.parse().ok())
                .unwrap_or(Decimal::ZERO),
            leverage: Decimal::from(leverage),
            margin_mode,
        })
    }

    fn normalize_balance(&self, raw: &Value) -> Result<Balance, ApiError> {
        let venue = VenueId::Reference;
        let total = require_decimal(venue, raw, "total")?;
        let used = require_decimal(venue, raw, "used")?;
        Ok(Balance {
            currency: require_str(venue, raw, "coin")?.to_string(),
            total,
            free: total - used,
            used,
            usd_value: raw
                .get("usdValue")
                .and_then(Value::as_str)
                .and_then(|s| s.parse().ok()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn normalizes_hyperliquid_shaped_universe_entry() {
        let raw = json!({ "name": "BTC-PERP", "szDecimals": 3, "maxLeverage": 50 });
        let market = ReferenceNormalizer.normalize_market(&raw).unwrap();
        assert_eq!(market.symbol, "BTC/USDT:USDT");
        assert_eq!(market.base, "BTC");
        assert_eq!(market.amount_precision, 3);
        assert_eq!(market.max_leverage, Decimal::from(50));
    }

    #[test]
    fn normalizes_order_book_levels() {
        let raw = json!({ "levels": [[["50000", "0.5"]], [["50100", "0.3"]]] });
        let book = ReferenceNormalizer.normalize_order_book("BTC/USDT:USDT", &raw).unwrap();
        assert_eq!(book.bids, vec![(Decimal::new(50000, 0), Decimal::new(5, 1))]);
        assert_eq!(book.asks, vec![(Decimal::new(50100, 0), Decimal::new(3, 1))]);
    }

    #[test]
    fn normalizes_resting_order_response() {
        let raw = json!({
            "status": "ok",
            "symbol": "BTC/USDT:USDT",
            "amount": "0.1",
            "response": { "data": { "statuses": [ { "resting": { "oid": 12345 } } ] } }
        });
        let order = ReferenceNormalizer.normalize_order(&raw).unwrap();
        assert_eq!(order.id, "12345");
        assert_eq!(order.status, OrderStatus::Open);
        assert_eq!(order.filled_amount, Decimal::ZERO);
        assert_eq!(order.remaining_amount, Decimal::new(1, 1));
    }

    #[test]
    fn normalizes_short_isolated_position() {
        let raw = json!({
            "szi": "-2.5",
            "entryPx": "3000",
            "leverage": { "type": "isolated", "value": 5 }
        });
        let position = ReferenceNormalizer.normalize_position("ETH/USDT:USDT", &raw).unwrap();
        assert_eq!(position.side, PositionSide::Short);
        assert_eq!(position.size, Decimal::new(25, 1));
        assert_eq!(position.margin_mode, MarginMode::Isolated);
        assert_eq!(position.leverage, Decimal::from(5));
    }

    #[test]
    fn empty_funding_history_is_a_bad_response_not_a_fabricated_rate() {
        let raw = json!({ "fundingHistory": [] });
        let err = ReferenceNormalizer
            .normalize_funding_rate("BTC/USDT:USDT", &raw)
            .unwrap_err();
        assert_eq!(err.category, ErrorCategory::BadResponse);
    }
}
