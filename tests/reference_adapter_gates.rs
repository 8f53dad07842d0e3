//! Gate ordering on the shipped reference adapter: every operation must
//! check capability, then lifecycle state, then credentials, all before
//! any network attempt. None of these tests require network access — a
//! gate failure must resolve immediately.

use std::time::Duration;

use perp_unify::config::{create_exchange, ExchangeConfig, VenueId};
use perp_unify::{ApiError, ErrorCategory};

#[tokio::test]
async fn uninitialized_adapter_rejects_private_calls_before_touching_the_network() {
    let adapter = create_exchange(VenueId::Reference, ExchangeConfig::default()).unwrap();

    let result = tokio::time::timeout(Duration::from_millis(200), adapter.fetch_balance()).await;
    let err = result
        .expect("a NotInitialized rejection must not wait on any network round trip")
        .unwrap_err();
    assert_eq!(err.category, ErrorCategory::NotInitialized);
}

#[tokio::test]
async fn uninitialized_adapter_rejects_create_order_before_touching_the_network() {
    use perp_unify::adapter::CreateOrderRequest;
    use perp_unify::types::{OrderSide, OrderType, TimeInForce};
    use rust_decimal_macros::dec;

    let adapter = create_exchange(VenueId::Reference, ExchangeConfig::default()).unwrap();
    let request = CreateOrderRequest {
        symbol: "BTC/USDT:USDT".to_string(),
        order_type: OrderType::Limit,
        side: OrderSide::Buy,
        amount: dec!(0.1),
        price: Some(dec!(50000)),
        client_order_id: None,
        post_only: false,
        reduce_only: false,
        time_in_force: TimeInForce::Gtc,
    };

    let result = tokio::time::timeout(Duration::from_millis(200), adapter.create_order(request)).await;
    let err = result.expect("gate must fail before any I/O").unwrap_err();
    assert_eq!(err.category, ErrorCategory::NotInitialized);
}

#[tokio::test]
async fn uninitialized_adapter_rejects_fetch_markets_before_touching_the_network() {
    let adapter = create_exchange(VenueId::Reference, ExchangeConfig::default()).unwrap();

    let result = tokio::time::timeout(Duration::from_millis(200), adapter.fetch_markets()).await;
    let err = result
        .expect("a NotInitialized rejection must not wait on any network round trip")
        .unwrap_err();
    assert_eq!(err.category, ErrorCategory::NotInitialized);
}

#[test]
fn unsupported_operation_is_rejected_by_the_capability_map_alone() {
    use perp_unify::adapter::{Capability, CapabilityMap};

    let caps = CapabilityMap::new().set("fetchMarkets", Capability::Supported);
    let err: ApiError = caps.check(VenueId::Reference, "createOrder").unwrap_err();
    assert_eq!(err.category, ErrorCategory::NotSupported);
}
