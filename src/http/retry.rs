//! Exponential backoff with jitter, shared shape between the HTTP retry
//! policy and the WebSocket reconnect policy — only the numeric defaults
//! differ between the two call sites.

use std::time::Duration;

use rand::Rng;

/// Parameters shared by the HTTP retry policy and the WebSocket reconnect
/// policy; only the numeric defaults differ between the two call sites.
#[derive(Clone, Copy, Debug)]
pub struct BackoffConfig {
    /// Maximum number of attempts, including the first.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub initial_delay: Duration,
    /// Delay ceiling regardless of attempt count.
    pub max_delay: Duration,
    /// Multiplier applied per attempt.
    pub multiplier: f64,
    /// Symmetric jitter fraction, e.g. `0.1` for ±10%.
    pub jitter: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(10_000),
            multiplier: 2.0,
            jitter: 0.1,
        }
    }
}

impl BackoffConfig {
    /// The WebSocket reconnect policy's distinct defaults: `initialDelay=1s`,
    /// `maxDelay=30s`, same multiplier/jitter shape, default 10 attempts
    /// (unlimited is expressed by the caller treating `max_attempts ==
    /// u32::MAX` as "unlimited").
    #[must_use]
    pub fn websocket_reconnect() -> Self {
        Self {
            max_attempts: 10,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
            jitter: 0.1,
        }
    }

    /// Delay before attempt `n` (1-indexed: the delay *preceding* attempt
    /// `n`, so there is no delay before attempt 1).
    ///
    /// `min(initialDelay * multiplier^(n-1), maxDelay)`, then scaled by a
    /// uniform jitter factor in `[1 - jitter, 1 + jitter]`.
    #[must_use]
    pub fn delay_for_attempt(&self, n: u32) -> Duration {
        self.delay_for_attempt_with_rng(n, &mut rand::thread_rng())
    }

    fn delay_for_attempt_with_rng(&self, n: u32, rng: &mut impl Rng) -> Duration {
        let base_ms = self.initial_delay.as_millis() as f64 * self.multiplier.powi(n as i32 - 1);
        let capped_ms = base_ms.min(self.max_delay.as_millis() as f64);
        let jitter_factor = rng.gen_range((1.0 - self.jitter)..=(1.0 + self.jitter));
        Duration::from_millis((capped_ms * jitter_factor).max(0.0) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delays_grow_monotonically_until_capped() {
        let config = BackoffConfig::default();
        // Use the midpoint jitter factor deterministically by checking bounds.
        let d1 = config.delay_for_attempt(1);
        let d2 = config.delay_for_attempt(2);
        let d3 = config.delay_for_attempt(3);
        assert!(d1.as_millis() >= 900 && d1.as_millis() <= 1100);
        assert!(d2.as_millis() >= 1800 && d2.as_millis() <= 2200);
        assert!(d3.as_millis() >= 3600 && d3.as_millis() <= 4400);
    }

    #[test]
    fn delay_never_exceeds_max_delay_even_with_positive_jitter() {
        let config = BackoffConfig {
            max_attempts: 10,
            initial_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(5000),
            multiplier: 2.0,
            jitter: 0.1,
        };
        let d = config.delay_for_attempt(8);
        assert!(d.as_millis() <= 5500);
    }
}
