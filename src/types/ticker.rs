use rust_decimal::Decimal;

/// A point-in-time snapshot of a market's best prices and recent activity.
/// Transient: not cached beyond the adapter's short-TTL price cache.
#[derive(Clone, PartialEq, Debug)]
pub struct Ticker {
    /// Unified symbol this snapshot belongs to.
    pub symbol: String,
    /// Last traded price.
    pub last: Decimal,
    /// Best bid price.
    pub bid: Decimal,
    /// Best ask price.
    pub ask: Decimal,
    /// 24h high.
    pub high: Decimal,
    /// 24h low.
    pub low: Decimal,
    /// 24h base-asset volume.
    pub volume: Decimal,
    /// Venue server timestamp, milliseconds since epoch.
    pub timestamp: u64,
}
