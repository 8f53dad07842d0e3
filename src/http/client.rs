//! Request execution: retries, circuit breaking, error classification.
//!
//! One adapter owns a single `HttpClient` instance shared across every
//! request it issues, rather than constructing a fresh `reqwest::Client`
//! per call.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use url::Url;

use crate::config::VenueId;
use crate::error::{ApiError, ErrorCategory};
use crate::http::circuit_breaker::{Admission, CircuitBreaker, CircuitBreakerConfig};
use crate::http::retry::BackoffConfig;

/// HTTP method for a request.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum HttpMethod {
    /// GET.
    Get,
    /// POST.
    Post,
    /// PUT.
    Put,
    /// DELETE.
    Delete,
}

impl HttpMethod {
    fn as_reqwest(self) -> reqwest::Method {
        match self {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

/// Per-call overrides accepted by every [`HttpClient`] method.
#[derive(Clone, Debug, Default)]
pub struct RequestOptions {
    /// Headers merged on top of the client's default headers for this call.
    pub headers: HashMap<String, String>,
    /// Per-call timeout, overriding the client default.
    pub timeout: Option<Duration>,
    /// Skip retry entirely and make a single attempt.
    pub skip_retry: bool,
}

/// Maps a venue's error response body to a typed category. The default
/// mapper recognizes common substrings; a venue adapter supplies its own
/// for venue-specific codes.
pub trait ErrorMapper: Send + Sync {
    /// Inspect a non-2xx response body and optionally override the
    /// status-derived category.
    fn map(&self, status: u16, body: &str) -> Option<ErrorCategory>;
}

/// Substring-matching default error mapper.
#[derive(Debug, Default)]
pub struct DefaultErrorMapper;

impl ErrorMapper for DefaultErrorMapper {
    fn map(&self, _status: u16, body: &str) -> Option<ErrorCategory> {
        let lower = body.to_ascii_lowercase();
        if lower.contains("insufficient margin") {
            Some(ErrorCategory::InsufficientMargin)
        } else if lower.contains("insufficient balance") || lower.contains("insufficient funds") {
            Some(ErrorCategory::InsufficientBalance)
        } else if lower.contains("invalid signature") {
            Some(ErrorCategory::InvalidSignature)
        } else if lower.contains("order not found") {
            Some(ErrorCategory::OrderNotFound)
        } else if lower.contains("minimum order") || lower.contains("min size") {
            Some(ErrorCategory::MinimumOrderSize)
        } else {
            None
        }
    }
}

fn classify_status(status: u16) -> ErrorCategory {
    match status {
        400 => ErrorCategory::BadRequest,
        401 => ErrorCategory::Unauthorized,
        403 => ErrorCategory::Forbidden,
        404 => ErrorCategory::NotFound,
        408 | 504 => ErrorCategory::Timeout,
        429 => ErrorCategory::RateLimit,
        500..=503 => ErrorCategory::ServerError,
        _ => ErrorCategory::BadResponse,
    }
}

/// Configuration for an [`HttpClient`].
#[derive(Clone, Debug)]
pub struct HttpClientConfig {
    /// Base URL every path is resolved against.
    pub base_url: Url,
    /// Headers applied to every request before per-call overrides.
    pub default_headers: HashMap<String, String>,
    /// Default per-call timeout.
    pub timeout: Duration,
    /// Retry policy.
    pub retry: BackoffConfig,
    /// Circuit breaker policy.
    pub circuit_breaker: CircuitBreakerConfig,
}

impl HttpClientConfig {
    /// Construct a config with the default retry/breaker settings and an
    /// empty header set.
    #[must_use]
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            default_headers: HashMap::new(),
            timeout: Duration::from_secs(10),
            retry: BackoffConfig::default(),
            circuit_breaker: CircuitBreakerConfig::default(),
        }
    }
}

/// A pooled HTTP client shared across every request from one adapter.
pub struct HttpClient {
    venue: VenueId,
    client: reqwest::Client,
    config: HttpClientConfig,
    breaker: CircuitBreaker,
    error_mapper: Arc<dyn ErrorMapper>,
    cancellation: CancellationToken,
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("venue", &self.venue)
            .field("base_url", &self.config.base_url)
            .finish()
    }
}

impl HttpClient {
    /// Construct a client with the default substring error mapper.
    #[must_use]
    pub fn new(venue: VenueId, config: HttpClientConfig) -> Self {
        Self::with_error_mapper(venue, config, Arc::new(DefaultErrorMapper))
    }

    /// Construct a client with a venue-supplied error mapper.
    #[must_use]
    pub fn with_error_mapper(
        venue: VenueId,
        config: HttpClientConfig,
        error_mapper: Arc<dyn ErrorMapper>,
    ) -> Self {
        let breaker = CircuitBreaker::new(config.circuit_breaker.clone());
        Self {
            venue,
            client: reqwest::Client::new(),
            config,
            breaker,
            error_mapper,
            cancellation: CancellationToken::new(),
        }
    }

    /// Abort every in-flight request issued by this client. Safe to call
    /// repeatedly; this is what an adapter's `disconnect()` calls to tear
    /// down outstanding work.
    pub fn abort_all(&self) {
        self.cancellation.cancel();
    }

    /// `GET path`.
    pub async fn get(
        &self,
        path: &str,
        opts: RequestOptions,
    ) -> Result<serde_json::Value, ApiError> {
        self.execute(HttpMethod::Get, path, None, opts).await
    }

    /// `POST path` with a JSON body.
    pub async fn post(
        &self,
        path: &str,
        body: serde_json::Value,
        opts: RequestOptions,
    ) -> Result<serde_json::Value, ApiError> {
        self.execute(HttpMethod::Post, path, Some(body), opts).await
    }

    /// `PUT path` with a JSON body.
    pub async fn put(
        &self,
        path: &str,
        body: serde_json::Value,
        opts: RequestOptions,
    ) -> Result<serde_json::Value, ApiError> {
        self.execute(HttpMethod::Put, path, Some(body), opts).await
    }

    /// `DELETE path`, optionally with a JSON body.
    pub async fn delete(
        &self,
        path: &str,
        body: Option<serde_json::Value>,
        opts: RequestOptions,
    ) -> Result<serde_json::Value, ApiError> {
        self.execute(HttpMethod::Delete, path, body, opts).await
    }

    /// Run the full pipeline: merge headers, attach cancellation+timeout,
    /// dispatch, classify, retry.
    async fn execute(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<serde_json::Value>,
        opts: RequestOptions,
    ) -> Result<serde_json::Value, ApiError> {
        let url = self
            .config
            .base_url
            .join(path)
            .map_err(|e| ApiError::bad_response(self.venue, format!("invalid path {path}: {e}")))?;

        let mut headers = self.config.default_headers.clone();
        headers.extend(opts.headers.clone());

        let timeout = opts.timeout.unwrap_or(self.config.timeout);
        let max_attempts = if opts.skip_retry {
            1
        } else {
            self.config.retry.max_attempts
        };

        let mut attempt = 1u32;
        loop {
            match self.breaker.admit() {
                Admission::Rejected => {
                    return Err(ApiError::new(
                        self.venue,
                        ErrorCategory::CircuitOpen,
                        "circuit breaker is open",
                    ));
                }
                Admission::Allowed | Admission::AllowedAsProbe => {}
            }

            let outcome = self
                .dispatch_once(method, url.clone(), body.clone(), &headers, timeout)
                .await;

            match outcome {
                Ok(value) => {
                    self.breaker.record_success();
                    return Ok(value);
                }
                Err(err) => {
                    self.breaker.record_failure();

                    if err.category == ErrorCategory::Canceled {
                        return Err(err);
                    }

                    let should_retry =
                        !opts.skip_retry && err.retryable() && attempt < max_attempts;

                    if !should_retry {
                        return Err(err);
                    }

                    let delay = err
                        .retry_after
                        .unwrap_or_else(|| self.config.retry.delay_for_attempt(attempt));

                    tokio::select! {
                        () = tokio::time::sleep(delay) => {}
                        () = self.cancellation.cancelled() => {
                            return Err(ApiError::canceled(self.venue));
                        }
                    }

                    attempt += 1;
                }
            }
        }
    }

    async fn dispatch_once(
        &self,
        method: HttpMethod,
        url: Url,
        body: Option<serde_json::Value>,
        headers: &HashMap<String, String>,
        timeout: Duration,
    ) -> Result<serde_json::Value, ApiError> {
        let mut builder = self.client.request(method.as_reqwest(), url);
        for (key, value) in headers {
            builder = builder.header(key, value);
        }
        if let Some(ref body) = body {
            builder = builder.json(body);
        }

        let send = builder.send();

        let response = tokio::select! {
            result = tokio::time::timeout(timeout, send) => match result {
                Ok(Ok(response)) => response,
                Ok(Err(e)) => {
                    let category = if e.is_timeout() {
                        ErrorCategory::Timeout
                    } else {
                        ErrorCategory::Network
                    };
                    return Err(ApiError::new(self.venue, category, e.to_string()).with_source(e));
                }
                Err(_elapsed) => {
                    return Err(ApiError::new(self.venue, ErrorCategory::Timeout, "request timed out"));
                }
            },
            () = self.cancellation.cancelled() => {
                return Err(ApiError::canceled(self.venue));
            }
        };

        let status = response.status();
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs);

        if status.is_success() {
            let text = response
                .text()
                .await
                .map_err(|e| ApiError::new(self.venue, ErrorCategory::Network, e.to_string()))?;
            return Ok(serde_json::from_str(&text)
                .unwrap_or_else(|_| serde_json::Value::String(text)));
        }

        let body_text = response.text().await.unwrap_or_default();
        let category = self
            .error_mapper
            .map(status.as_u16(), &body_text)
            .unwrap_or_else(|| classify_status(status.as_u16()));

        let mut err = ApiError::new(
            self.venue,
            category,
            format!("venue returned HTTP {status}: {body_text}"),
        )
        .with_code(status.as_u16().to_string());

        if let Some(retry_after) = retry_after {
            err = err.with_retry_after(retry_after);
        }

        Err(err)
    }
}
