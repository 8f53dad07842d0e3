use rust_decimal::Decimal;

/// A unified account balance for a single currency.
///
/// Invariant: `abs(total - (free + used)) < epsilon`.
#[derive(Clone, PartialEq, Debug)]
pub struct Balance {
    /// Currency code, e.g. `USDT`.
    pub currency: String,
    /// Total balance.
    pub total: Decimal,
    /// Withdrawable portion.
    pub free: Decimal,
    /// Margin/reserved portion.
    pub used: Decimal,
    /// Mark-to-USD valuation, if the venue or adapter computes one.
    pub usd_value: Option<Decimal>,
}

impl Balance {
    /// True if `total` and `free + used` agree within `epsilon`.
    #[must_use]
    pub fn is_consistent(&self, epsilon: Decimal) -> bool {
        (self.total - (self.free + self.used)).abs() < epsilon
    }
}
