use rust_decimal::Decimal;

/// An order book snapshot: bids descending by price, asks ascending.
///
/// Transient. Streamed order books *replace* the previous snapshot; this
/// crate does not merge incremental deltas into a running book.
#[derive(Clone, PartialEq, Debug)]
pub struct OrderBook {
    /// Unified symbol.
    pub symbol: String,
    /// Bid levels, sorted highest price first.
    pub bids: Vec<(Decimal, Decimal)>,
    /// Ask levels, sorted lowest price first.
    pub asks: Vec<(Decimal, Decimal)>,
    /// Venue server timestamp, milliseconds since epoch.
    pub timestamp: u64,
    /// Which venue produced this snapshot.
    pub venue: crate::config::VenueId,
}

impl OrderBook {
    /// Best bid, if the book is non-empty on that side.
    #[must_use]
    pub fn best_bid(&self) -> Option<(Decimal, Decimal)> {
        self.bids.first().copied()
    }

    /// Best ask, if the book is non-empty on that side.
    #[must_use]
    pub fn best_ask(&self) -> Option<(Decimal, Decimal)> {
        self.asks.first().copied()
    }
}
