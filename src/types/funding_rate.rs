use rust_decimal::Decimal;

/// A unified perpetual funding rate snapshot.
#[derive(Clone, PartialEq, Debug)]
pub struct FundingRate {
    /// Unified symbol.
    pub symbol: String,
    /// Current funding rate (e.g. `0.0001` for 1bp).
    pub rate: Decimal,
    /// Timestamp this rate was (or will be) applied, milliseconds since epoch.
    pub funding_timestamp: u64,
    /// Timestamp of the next scheduled funding, milliseconds since epoch.
    pub next_funding_timestamp: u64,
    /// Mark price at snapshot time.
    pub mark_price: Decimal,
    /// Index price at snapshot time.
    pub index_price: Decimal,
    /// Hours between funding settlements.
    pub interval_hours: u32,
}
