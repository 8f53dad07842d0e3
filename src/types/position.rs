use rust_decimal::Decimal;

/// Position side.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum PositionSide {
    /// Long (net bought).
    Long,
    /// Short (net sold).
    Short,
}

/// Margin mode.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum MarginMode {
    /// Margin shared across all positions on the account.
    Cross,
    /// Margin segregated to this position alone.
    Isolated,
}

/// A unified leveraged position.
///
/// Invariant: `size >= 0`; side carries the direction separately rather
/// than via a signed size.
#[derive(Clone, PartialEq, Debug)]
pub struct Position {
    /// Unified symbol.
    pub symbol: String,
    /// Position direction.
    pub side: PositionSide,
    /// Absolute position size (always non-negative).
    pub size: Decimal,
    /// Average entry price.
    pub entry_price: Decimal,
    /// Current mark price used for PnL/liquidation math.
    pub mark_price: Decimal,
    /// Liquidation price; `None` if the venue doesn't report one (e.g. no
    /// leverage, or fully cross-collateralized with no single trigger).
    pub liquidation_price: Option<Decimal>,
    /// Unrealized profit/loss in quote terms.
    pub unrealized_pnl: Decimal,
    /// Effective leverage.
    pub leverage: Decimal,
    /// Margin mode.
    pub margin_mode: MarginMode,
}

impl Position {
    /// True if `size` satisfies the non-negative invariant.
    #[must_use]
    pub fn size_valid(&self) -> bool {
        self.size >= Decimal::ZERO
    }
}
