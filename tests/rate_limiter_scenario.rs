//! With `maxTokens=3`, `windowMs=1000`, five concurrent `acquire(cost=1)`
//! callers see exactly three admitted immediately and the remaining two
//! delayed by roughly a third of the window each.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use perp_unify::rate_limiter::{RateLimiter, RateLimiterConfig};

#[tokio::test]
async fn five_concurrent_callers_three_immediate_two_delayed() {
    let limiter = RateLimiter::new(RateLimiterConfig {
        max_tokens: 3.0,
        window_ms: 1000.0,
        weights: HashMap::new(),
    });

    let start = Instant::now();
    let elapsed: Vec<Duration> = futures_util::future::join_all((0..5).map(|_| {
        let limiter = limiter.clone();
        async move {
            limiter.acquire("op", None).await;
            start.elapsed()
        }
    }))
    .await;

    let mut sorted = elapsed.clone();
    sorted.sort();

    for admitted_immediately in &sorted[..3] {
        assert!(
            *admitted_immediately < Duration::from_millis(100),
            "expected an immediate admission, got {admitted_immediately:?}"
        );
    }
    for delayed in &sorted[3..] {
        assert!(
            *delayed >= Duration::from_millis(300),
            "expected a waiter delayed by roughly a third of the window, got {delayed:?}"
        );
    }
}
