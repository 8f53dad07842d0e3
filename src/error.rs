//! Main crate error.

use std::time::Duration;

use crate::config::VenueId;

/// The category of an [`ApiError`], matching the taxonomy table in the
/// crate docs and used for retry-advice decisions.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum ErrorCategory {
    /// Operation called before `initialize()` completed.
    NotInitialized,
    /// Capability map marks the operation `false`.
    NotSupported,
    /// Signing operation attempted without credentials.
    MissingCredentials,
    /// HTTP 400 or otherwise malformed request.
    BadRequest,
    /// HTTP 401.
    Unauthorized,
    /// Signature rejected by the venue.
    InvalidSignature,
    /// Session/auth token expired.
    ExpiredAuth,
    /// HTTP 403.
    Forbidden,
    /// Caller lacks permission for the requested action.
    InsufficientPermissions,
    /// HTTP 404 or a venue-native "not found" code.
    NotFound,
    /// Order id unknown to the venue.
    OrderNotFound,
    /// Position unknown to the venue.
    PositionNotFound,
    /// Order parameters rejected by the venue.
    InvalidOrder,
    /// Order below the venue's minimum size.
    MinimumOrderSize,
    /// Venue rejected the order for a reason not covered above.
    OrderRejected,
    /// Insufficient margin to open/maintain a position.
    InsufficientMargin,
    /// Insufficient balance for a withdrawal or transfer.
    InsufficientBalance,
    /// HTTP 429 or token-bucket exhaustion.
    RateLimit,
    /// Network-level failure (DNS, connection reset, etc).
    Network,
    /// Request exceeded its deadline.
    Timeout,
    /// HTTP 5xx.
    ServerError,
    /// Venue unreachable at connectivity-check time.
    ExchangeUnavailable,
    /// Circuit breaker is open.
    CircuitOpen,
    /// On-chain transaction reverted or failed to land.
    TransactionFailed,
    /// On-chain/DEX order exceeded its slippage bound.
    SlippageExceeded,
    /// WebSocket died during an active `watch*` subscription.
    WebSocketDisconnected,
    /// Response did not match the expected schema.
    BadResponse,
    /// Caller cancelled the operation.
    Canceled,
}

impl ErrorCategory {
    /// Whether the HTTP layer should retry an error of this category.
    #[must_use]
    pub fn retryable(self) -> bool {
        matches!(
            self,
            ErrorCategory::RateLimit
                | ErrorCategory::Network
                | ErrorCategory::Timeout
                | ErrorCategory::ServerError
                | ErrorCategory::ExchangeUnavailable
        )
    }
}

/// Main error type returned by every public operation in this crate.
#[derive(thiserror::Error, Debug)]
#[error("[{venue:?}] {category:?}: {message}")]
pub struct ApiError {
    /// Which venue produced (or was being contacted for) this error.
    pub venue: VenueId,
    /// Classified category, see [`ErrorCategory`].
    pub category: ErrorCategory,
    /// Venue-native error code, if any (numeric or string, venue-dependent).
    pub code: Option<String>,
    /// Human-readable message, either venue-supplied or synthesized.
    pub message: String,
    /// Underlying cause, if this error wraps another.
    #[source]
    pub source: Option<anyhow::Error>,
    /// For `RateLimit`, how long the caller should wait before retrying.
    pub retry_after: Option<Duration>,
    /// Correlation id threaded from the originating `RequestEnvelope`, if any.
    pub correlation_id: Option<String>,
}

impl ApiError {
    /// Construct a bare error with no cause, code, or correlation id.
    #[must_use]
    pub fn new(venue: VenueId, category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            venue,
            category,
            code: None,
            message: message.into(),
            source: None,
            retry_after: None,
            correlation_id: None,
        }
    }

    /// Attach an underlying cause.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<anyhow::Error>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Attach a venue-native error code.
    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Attach a `Retry-After` hint.
    #[must_use]
    pub fn with_retry_after(mut self, retry_after: Duration) -> Self {
        self.retry_after = Some(retry_after);
        self
    }

    /// Attach a correlation id.
    #[must_use]
    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    /// True if the HTTP layer should retry this error.
    #[must_use]
    pub fn retryable(&self) -> bool {
        self.category.retryable()
    }

    pub(crate) fn not_initialized(venue: VenueId) -> Self {
        Self::new(
            venue,
            ErrorCategory::NotInitialized,
            "operation called before initialize() completed",
        )
    }

    pub(crate) fn not_supported(venue: VenueId, operation: &str) -> Self {
        Self::new(
            venue,
            ErrorCategory::NotSupported,
            format!("{operation} is not supported by this venue"),
        )
    }

    pub(crate) fn missing_credentials(venue: VenueId) -> Self {
        Self::new(
            venue,
            ErrorCategory::MissingCredentials,
            "operation requires signing credentials",
        )
    }

    pub(crate) fn bad_response(venue: VenueId, message: impl Into<String>) -> Self {
        Self::new(venue, ErrorCategory::BadResponse, message.into())
    }

    pub(crate) fn canceled(venue: VenueId) -> Self {
        Self::new(venue, ErrorCategory::Canceled, "operation was canceled")
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ApiError>;
