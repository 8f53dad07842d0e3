//! Three-state circuit breaker protecting against a persistently failing
//! venue: one breaker per HTTP client instance, tripping after a run of
//! consecutive failures and probing for recovery with a single half-open
//! request.

use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Circuit breaker state.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum CircuitState {
    /// Normal operation; requests pass through.
    Closed,
    /// Failing; requests are rejected immediately.
    Open,
    /// Probing for recovery; exactly one request is allowed through.
    HalfOpen,
}

/// Circuit breaker configuration.
#[derive(Clone, Debug)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures before tripping to `Open`.
    pub failure_threshold: u32,
    /// How long to stay `Open` before allowing a probe.
    pub reset_timeout: Duration,
    /// Successes required in `HalfOpen` before returning to `Closed`.
    pub success_threshold: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            reset_timeout: Duration::from_secs(30),
            success_threshold: 1,
        }
    }
}

struct State {
    state: CircuitState,
    consecutive_failures: u32,
    half_open_successes: u32,
    opened_at: Option<Instant>,
    /// Whether a probe request has already been dispatched in this
    /// `HalfOpen` window; at most one is allowed through at a time.
    probe_in_flight: bool,
}

/// Per-HTTP-client circuit breaker: one instance guards an entire client,
/// not a single endpoint.
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    state: Mutex<State>,
}

impl std::fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("state", &self.state.lock().unwrap().state)
            .finish()
    }
}

/// Whether the breaker currently permits a request, and if not, why.
pub enum Admission {
    /// Allowed, not currently probing.
    Allowed,
    /// Allowed as the single `HalfOpen` probe.
    AllowedAsProbe,
    /// Rejected; the circuit is open.
    Rejected,
}

impl CircuitBreaker {
    /// Construct a breaker in the `Closed` state.
    #[must_use]
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            state: Mutex::new(State {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                half_open_successes: 0,
                opened_at: None,
                probe_in_flight: false,
            }),
        }
    }

    /// Current state, transitioning `Open` -> `HalfOpen` if `reset_timeout`
    /// has elapsed.
    #[must_use]
    pub fn state(&self) -> CircuitState {
        let mut s = self.state.lock().unwrap();
        self.maybe_transition_to_half_open(&mut s);
        s.state
    }

    fn maybe_transition_to_half_open(&self, s: &mut State) {
        if s.state == CircuitState::Open {
            if let Some(opened_at) = s.opened_at {
                if opened_at.elapsed() >= self.config.reset_timeout {
                    s.state = CircuitState::HalfOpen;
                    s.half_open_successes = 0;
                    s.probe_in_flight = false;
                }
            }
        }
    }

    /// Ask whether a new request may proceed.
    pub fn admit(&self) -> Admission {
        let mut s = self.state.lock().unwrap();
        self.maybe_transition_to_half_open(&mut s);
        match s.state {
            CircuitState::Closed => Admission::Allowed,
            CircuitState::Open => Admission::Rejected,
            CircuitState::HalfOpen => {
                if s.probe_in_flight {
                    Admission::Rejected
                } else {
                    s.probe_in_flight = true;
                    Admission::AllowedAsProbe
                }
            }
        }
    }

    /// Record a successful request.
    pub fn record_success(&self) {
        let mut s = self.state.lock().unwrap();
        match s.state {
            CircuitState::Closed => {
                s.consecutive_failures = 0;
            }
            CircuitState::HalfOpen => {
                s.half_open_successes += 1;
                s.probe_in_flight = false;
                if s.half_open_successes >= self.config.success_threshold {
                    s.state = CircuitState::Closed;
                    s.consecutive_failures = 0;
                    s.half_open_successes = 0;
                    s.opened_at = None;
                }
            }
            CircuitState::Open => {}
        }
    }

    /// Record a failed request.
    pub fn record_failure(&self) {
        let mut s = self.state.lock().unwrap();
        match s.state {
            CircuitState::Closed => {
                s.consecutive_failures += 1;
                if s.consecutive_failures >= self.config.failure_threshold {
                    s.state = CircuitState::Open;
                    s.opened_at = Some(Instant::now());
                }
            }
            CircuitState::HalfOpen => {
                s.state = CircuitState::Open;
                s.opened_at = Some(Instant::now());
                s.probe_in_flight = false;
                s.half_open_successes = 0;
            }
            CircuitState::Open => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opens_after_failure_threshold() {
        let cb = CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: 3,
            ..Default::default()
        });
        for _ in 0..3 {
            cb.record_failure();
        }
        assert_eq!(cb.state(), CircuitState::Open);
        assert!(matches!(cb.admit(), Admission::Rejected));
    }

    #[test]
    fn half_open_probe_closes_on_success() {
        let cb = CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: 1,
            reset_timeout: Duration::from_millis(0),
            success_threshold: 1,
        });
        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::HalfOpen);
        assert!(matches!(cb.admit(), Admission::AllowedAsProbe));
        cb.record_success();
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[test]
    fn half_open_failure_reopens() {
        let cb = CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: 1,
            reset_timeout: Duration::from_millis(0),
            success_threshold: 2,
        });
        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::HalfOpen);
        let _ = cb.admit();
        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Open);
    }
}
