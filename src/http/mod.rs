//! HTTP request pipeline: retries, backoff+jitter, circuit breaking,
//! per-request cancellation, and error classification.

pub mod circuit_breaker;
pub mod client;
pub mod retry;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use client::{ErrorMapper, HttpClient, HttpClientConfig, HttpMethod, RequestOptions};
pub use retry::BackoffConfig;
