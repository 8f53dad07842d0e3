use rust_decimal::Decimal;

/// A single OHLCV candle, returned in sequence by `fetchOHLCV`.
///
/// The return shape for `fetchOHLCV`.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Candle {
    /// Candle open time, milliseconds since epoch.
    pub timestamp: u64,
    /// Opening price.
    pub open: Decimal,
    /// Highest price in the interval.
    pub high: Decimal,
    /// Lowest price in the interval.
    pub low: Decimal,
    /// Closing price.
    pub close: Decimal,
    /// Base-asset volume traded in the interval.
    pub volume: Decimal,
}
