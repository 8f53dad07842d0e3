//! End-to-end exercise of `HttpClient`'s retry/circuit-breaker pipeline
//! against a real (mock) server, since the unit tests in `http::retry`
//! and `http::circuit_breaker` only verify the two pieces in isolation.

use std::time::Duration;

use perp_unify::config::VenueId;
use perp_unify::http::{
    BackoffConfig, CircuitBreakerConfig, HttpClient, HttpClientConfig, RequestOptions,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fast_retry_config(base_url: url::Url) -> HttpClientConfig {
    let mut config = HttpClientConfig::new(base_url);
    config.retry = BackoffConfig {
        max_attempts: 5,
        initial_delay: Duration::from_millis(5),
        max_delay: Duration::from_millis(50),
        multiplier: 2.0,
        jitter: 0.0,
    };
    config.circuit_breaker = CircuitBreakerConfig {
        failure_threshold: 3,
        reset_timeout: Duration::from_millis(200),
        success_threshold: 1,
    };
    config
}

#[tokio::test]
async fn retries_server_errors_until_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/markets"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/markets"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"universe": []})))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpClient::new(
        VenueId::Reference,
        fast_retry_config(server.uri().parse().unwrap()),
    );

    let body = client.get("v1/markets", RequestOptions::default()).await.unwrap();
    assert_eq!(body, serde_json::json!({"universe": []}));
}

#[tokio::test]
async fn does_not_retry_a_bad_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/markets"))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad symbol"))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpClient::new(
        VenueId::Reference,
        fast_retry_config(server.uri().parse().unwrap()),
    );

    let err = client
        .get("v1/markets", RequestOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.category, perp_unify::ErrorCategory::BadRequest);
}

#[tokio::test]
async fn honors_retry_after_header_on_rate_limit() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/ticker"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("Retry-After", "0")
                .set_body_string("slow down"),
        )
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/ticker"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"last": "1"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpClient::new(
        VenueId::Reference,
        fast_retry_config(server.uri().parse().unwrap()),
    );

    let start = std::time::Instant::now();
    let body = client.get("v1/ticker", RequestOptions::default()).await.unwrap();
    assert_eq!(body, serde_json::json!({"last": "1"}));
    // Retry-After: 0 should be honored rather than the (larger) default backoff.
    assert!(start.elapsed() < Duration::from_millis(500));
}

#[tokio::test]
async fn circuit_opens_after_consecutive_failures_and_rejects_without_a_network_call() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/markets"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let mut config = fast_retry_config(server.uri().parse().unwrap());
    config.retry.max_attempts = 1; // isolate each `get` call to a single dispatch
    let client = HttpClient::new(VenueId::Reference, config);

    for _ in 0..3 {
        let err = client
            .get("v1/markets", RequestOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.category, perp_unify::ErrorCategory::ServerError);
    }

    let before = server.received_requests().await.unwrap().len();
    let err = client
        .get("v1/markets", RequestOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.category, perp_unify::ErrorCategory::CircuitOpen);
    let after = server.received_requests().await.unwrap().len();
    assert_eq!(before, after, "a rejected call must not reach the network");
}

#[tokio::test]
async fn skip_retry_makes_exactly_one_attempt_on_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/markets"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpClient::new(
        VenueId::Reference,
        fast_retry_config(server.uri().parse().unwrap()),
    );

    let opts = RequestOptions {
        skip_retry: true,
        ..RequestOptions::default()
    };
    let err = client.get("v1/markets", opts).await.unwrap_err();
    assert_eq!(err.category, perp_unify::ErrorCategory::ServerError);
}
