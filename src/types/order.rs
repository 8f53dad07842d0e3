use rust_decimal::Decimal;

/// Order side.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum OrderSide {
    /// Buy / long-opening / short-closing.
    Buy,
    /// Sell / short-opening / long-closing.
    Sell,
}

/// Order type.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum OrderType {
    /// Executes immediately at the best available price.
    Market,
    /// Rests on the book at a specified price until filled or canceled.
    Limit,
    /// Converts to a market order once the stop price trades.
    StopMarket,
    /// Converts to a limit order once the stop price trades.
    StopLimit,
    /// Closes a position once it reaches a specified profit level.
    TakeProfit,
}

/// Order status.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum OrderStatus {
    /// Resting on the book, unfilled.
    Open,
    /// Resting on the book, partially filled.
    PartiallyFilled,
    /// Fully filled.
    Filled,
    /// Canceled before being fully filled.
    Canceled,
    /// Rejected by the venue before resting.
    Rejected,
}

/// Time-in-force instruction.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum TimeInForce {
    /// Good-til-canceled.
    Gtc,
    /// Immediate-or-cancel.
    Ioc,
    /// Fill-or-kill.
    Fok,
    /// Post-only (reject rather than take liquidity).
    PostOnly,
}

/// A unified order, normalized from whatever shape the venue returns.
///
/// Invariant: `remaining == requested - filled` within rounding tolerance,
/// and `status == Filled` implies `remaining == 0`.
#[derive(Clone, PartialEq, Debug)]
pub struct Order {
    /// Venue-assigned order id.
    pub id: String,
    /// Caller-assigned correlation id, echoed back by venues that support it.
    pub client_order_id: Option<String>,
    /// Unified symbol.
    pub symbol: String,
    /// Order type.
    pub order_type: OrderType,
    /// Order side.
    pub side: OrderSide,
    /// Originally requested size.
    pub requested_amount: Decimal,
    /// Limit price; `None` for market orders.
    pub price: Option<Decimal>,
    /// Cumulative filled size.
    pub filled_amount: Decimal,
    /// `requested_amount - filled_amount`.
    pub remaining_amount: Decimal,
    /// Size-weighted average fill price; `None` if unfilled.
    pub average_fill_price: Option<Decimal>,
    /// Current status.
    pub status: OrderStatus,
    /// Whether the order was placed as post-only.
    pub post_only: bool,
    /// Whether the order can only reduce an existing position.
    pub reduce_only: bool,
    /// Time-in-force instruction.
    pub time_in_force: TimeInForce,
    /// Venue server timestamp, milliseconds since epoch.
    pub timestamp: u64,
}

impl Order {
    /// True if the invariant `filled + remaining == requested` holds within
    /// `tolerance` (rounding slack the venue's own precision may introduce).
    #[must_use]
    pub fn amounts_consistent(&self, tolerance: Decimal) -> bool {
        let sum = self.filled_amount + self.remaining_amount;
        (sum - self.requested_amount).abs() <= tolerance
    }
}
