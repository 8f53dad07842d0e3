//! Symbol translation is bijective end to end: every market the wire
//! normalizer produces round-trips through `SymbolTable::to_venue` /
//! `from_venue` back to its original unified spelling.

use perp_unify::adapter::SymbolTable;
use perp_unify::config::VenueId;
use perp_unify::normalize::Normalizer;
use perp_unify::venues::reference::wire::{unified_to_venue_symbol, ReferenceNormalizer};
use serde_json::json;

#[test]
fn fetch_markets_style_payload_round_trips_through_the_symbol_table() {
    let universe = vec![
        json!({"name": "BTC-PERP", "szDecimals": 3, "maxLeverage": 50}),
        json!({"name": "ETH-PERP", "szDecimals": 2, "maxLeverage": 25}),
        json!({"name": "SOL-PERP", "szDecimals": 1, "maxLeverage": 10}),
    ];

    let mut table = SymbolTable::new();
    let normalizer = ReferenceNormalizer;
    let mut unified_symbols = Vec::new();

    for raw in &universe {
        let market = normalizer.normalize_market(raw).unwrap();
        let venue_symbol = unified_to_venue_symbol(&market.symbol).unwrap();
        table.insert(market.symbol.clone(), venue_symbol);
        unified_symbols.push(market.symbol);
    }

    for unified in unified_symbols {
        let venue_symbol = table.to_venue(VenueId::Reference, &unified).unwrap();
        let round_tripped = table.from_venue(VenueId::Reference, &venue_symbol).unwrap();
        assert_eq!(round_tripped, unified);
    }
}

#[test]
fn unknown_unified_symbol_never_fabricates_a_venue_spelling() {
    let table = SymbolTable::new();
    let err = table
        .to_venue(VenueId::Reference, "DOGE/USDT:USDT")
        .unwrap_err();
    assert_eq!(err.category, perp_unify::ErrorCategory::BadRequest);
}
