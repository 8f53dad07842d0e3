use rust_decimal::Decimal;

use crate::types::order::OrderSide;

/// A single executed trade, either public tape data or one of the caller's
/// own fills (`fetchMyTrades`).
#[derive(Clone, PartialEq, Debug)]
pub struct Trade {
    /// Venue-native trade id.
    pub id: String,
    /// Unified symbol.
    pub symbol: String,
    /// Taker side.
    pub side: OrderSide,
    /// Execution price.
    pub price: Decimal,
    /// Execution size.
    pub amount: Decimal,
    /// `price * amount`, computed rather than trusted from the wire.
    pub cost: Decimal,
    /// Venue server timestamp, milliseconds since epoch.
    pub timestamp: u64,
    /// Id of the order this trade filled, if the venue links them.
    pub order_id: Option<String>,
}

impl Trade {
    /// Build a trade, deriving `cost` from `price * amount` so callers never
    /// have to trust (or recompute) a venue-supplied cost field.
    #[must_use]
    pub fn new(
        id: String,
        symbol: String,
        side: OrderSide,
        price: Decimal,
        amount: Decimal,
        timestamp: u64,
        order_id: Option<String>,
    ) -> Self {
        Self {
            id,
            symbol,
            side,
            cost: price * amount,
            price,
            amount,
            timestamp,
            order_id,
        }
    }
}
