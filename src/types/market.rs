use rust_decimal::Decimal;

/// A perpetual (or spot) market, created once per venue on preload and
/// cached immutable thereafter.
///
/// The unified symbol format is `BASE/QUOTE:SETTLE` for perpetuals (e.g.
/// `BTC/USDT:USDT`) and `BASE/QUOTE` for spot where applicable.
#[derive(Clone, PartialEq, Debug)]
pub struct Market {
    /// Unified symbol, e.g. `BTC/USDT:USDT`.
    pub symbol: String,
    /// Base asset, e.g. `BTC`.
    pub base: String,
    /// Quote asset, e.g. `USDT`.
    pub quote: String,
    /// Settlement asset for perpetuals; `None` for spot markets.
    pub settlement: Option<String>,
    /// Whether the venue currently accepts orders for this market.
    pub active: bool,
    /// Smallest price increment.
    pub tick_size: Decimal,
    /// Smallest size increment.
    pub step_size: Decimal,
    /// Decimal places the venue reports amounts with.
    pub amount_precision: u32,
    /// Decimal places the venue reports prices with.
    pub price_precision: u32,
    /// Maximum leverage the venue allows for this market.
    pub max_leverage: Decimal,
    /// Funding interval, in hours, for perpetuals.
    pub funding_interval_hours: Option<u32>,
}

impl Market {
    /// Whether this market settles to a perpetual contract rather than spot.
    #[must_use]
    pub fn is_perpetual(&self) -> bool {
        self.settlement.is_some()
    }
}
