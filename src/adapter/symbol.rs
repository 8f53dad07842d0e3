//! Bijective unified-symbol ⇄ venue-symbol translation.
//!
//! Built once per adapter from the market list `fetchMarkets` returns, not
//! hand-maintained per venue; this keeps `toVenue`/`fromVenue` stable
//! across calls and trivially bijective for every market the venue
//! actually offers, as the contract requires.

use std::collections::HashMap;

use crate::config::VenueId;
use crate::error::{ApiError, ErrorCategory};

/// Two-way lookup between the unified `BASE/QUOTE:SETTLE` symbol format
/// and a venue's native symbol spelling.
#[derive(Clone, Debug, Default)]
pub struct SymbolTable {
    to_venue: HashMap<String, String>,
    from_venue: HashMap<String, String>,
}

impl SymbolTable {
    /// An empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one unified ⇄ venue symbol pair. Last write for either
    /// side wins, matching "rebuilt on every `fetchMarkets` refresh".
    pub fn insert(&mut self, unified: impl Into<String>, venue: impl Into<String>) {
        let unified = unified.into();
        let venue = venue.into();
        self.to_venue.insert(unified.clone(), venue.clone());
        self.from_venue.insert(venue, unified);
    }

    /// Drop every registered pair, e.g. ahead of a markets-cache refresh.
    pub fn clear(&mut self) {
        self.to_venue.clear();
        self.from_venue.clear();
    }

    /// Translate a unified symbol into the venue's native spelling.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorCategory::BadRequest`] if `unified` names a market
    /// this venue does not offer.
    pub fn to_venue(&self, venue: VenueId, unified: &str) -> Result<String, ApiError> {
        self.to_venue.get(unified).cloned().ok_or_else(|| {
            ApiError::new(
                venue,
                ErrorCategory::BadRequest,
                format!("unknown unified symbol {unified}"),
            )
        })
    }

    /// Translate a venue-native symbol into the unified format.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorCategory::BadResponse`] if the venue symbol was
    /// never registered from a `fetchMarkets` response — the venue sent
    /// something this adapter does not recognize.
    pub fn from_venue(&self, venue: VenueId, venue_symbol: &str) -> Result<String, ApiError> {
        self.from_venue.get(venue_symbol).cloned().ok_or_else(|| {
            ApiError::bad_response(venue, format!("unrecognized venue symbol {venue_symbol}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_in_both_directions() {
        let mut table = SymbolTable::new();
        table.insert("BTC/USDT:USDT", "BTC-PERP");

        let venue_symbol = table.to_venue(VenueId::Reference, "BTC/USDT:USDT").unwrap();
        assert_eq!(venue_symbol, "BTC-PERP");

        let unified = table.from_venue(VenueId::Reference, &venue_symbol).unwrap();
        assert_eq!(unified, "BTC/USDT:USDT");
    }

    #[test]
    fn unknown_unified_symbol_is_a_bad_request() {
        let table = SymbolTable::new();
        let err = table.to_venue(VenueId::Reference, "ETH/USDT:USDT").unwrap_err();
        assert_eq!(err.category, ErrorCategory::BadRequest);
    }

    #[test]
    fn unrecognized_venue_symbol_is_a_bad_response() {
        let table = SymbolTable::new();
        let err = table.from_venue(VenueId::Reference, "ETH-PERP").unwrap_err();
        assert_eq!(err.category, ErrorCategory::BadResponse);
    }
}
