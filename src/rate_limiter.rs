//! Token-bucket rate limiter shared across all operations on one adapter.
//!
//! Hand-rolled rather than built on `governor`: FIFO release order
//! across waiters of differing cost, and explicit non-refund-on-cancel
//! semantics, are requirements neither of `governor`'s `check`/
//! `until_ready` surface exposes directly.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::{Duration, Instant};

use tokio::sync::Notify;

/// Configuration for a [`RateLimiter`].
#[derive(Clone, Debug)]
pub struct RateLimiterConfig {
    /// Bucket capacity in tokens.
    pub max_tokens: f64,
    /// Refill window in milliseconds; the bucket refills at
    /// `max_tokens / window_ms` tokens per millisecond.
    pub window_ms: f64,
    /// Per-operation token weights; operations absent from this map cost 1.
    pub weights: HashMap<String, f64>,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            max_tokens: 10.0,
            window_ms: 1000.0,
            weights: HashMap::new(),
        }
    }
}

struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

impl Bucket {
    fn refill(&mut self, max_tokens: f64, rate_per_ms: f64) {
        let now = Instant::now();
        let elapsed_ms = now.duration_since(self.last_refill).as_secs_f64() * 1000.0;
        self.tokens = (self.tokens + elapsed_ms * rate_per_ms).min(max_tokens);
        self.last_refill = now;
    }
}

struct Inner {
    bucket: StdMutex<Bucket>,
    config: RateLimiterConfig,
    /// FIFO ticket counter: the waiter holding the lowest outstanding ticket
    /// is the only one allowed to deduct tokens, enforcing admission order
    /// even when a later, cheaper waiter could technically afford to jump
    /// the queue.
    next_ticket: StdMutex<u64>,
    now_serving: StdMutex<u64>,
    /// Tickets whose holder dropped the `acquire` future before its turn
    /// came up. `advance_past_abandoned` skips over these so one
    /// cancelled waiter can never wedge everyone behind it.
    abandoned: StdMutex<HashSet<u64>>,
    notify: Notify,
}

/// Advance `now_serving` past any tickets already marked abandoned,
/// waking the next real waiter in line. Called both when a ticket
/// finishes service and when a waiter's guard is dropped mid-wait.
fn advance_past_abandoned(inner: &Inner, serving: &mut u64) {
    let mut abandoned = inner.abandoned.lock().unwrap();
    while abandoned.remove(serving) {
        *serving += 1;
    }
}

/// RAII ticket: if dropped before `acquire` completes (the caller's
/// future was cancelled while suspended), releases this waiter's queue
/// slot without refunding any tokens already deducted — exactly the
/// semantics spec §4.5/§8 require.
struct TicketGuard {
    inner: Arc<Inner>,
    ticket: u64,
    completed: bool,
}

impl Drop for TicketGuard {
    fn drop(&mut self) {
        if self.completed {
            return;
        }
        let mut serving = self.inner.now_serving.lock().unwrap();
        if *serving == self.ticket {
            *serving += 1;
            advance_past_abandoned(&self.inner, &mut serving);
        } else {
            self.inner.abandoned.lock().unwrap().insert(self.ticket);
        }
        drop(serving);
        self.inner.notify.notify_waiters();
    }
}

/// A token-bucket admission controller. Cloning shares the same bucket
/// (it is reference-counted internally) — one instance is shared across
/// every operation on an adapter.
#[derive(Clone)]
pub struct RateLimiter {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("max_tokens", &self.inner.config.max_tokens)
            .field("window_ms", &self.inner.config.window_ms)
            .finish()
    }
}

impl RateLimiter {
    /// Construct a rate limiter with a full bucket.
    #[must_use]
    pub fn new(config: RateLimiterConfig) -> Self {
        let bucket = Bucket {
            tokens: config.max_tokens,
            last_refill: Instant::now(),
        };
        Self {
            inner: Arc::new(Inner {
                bucket: StdMutex::new(bucket),
                config,
                next_ticket: StdMutex::new(0),
                now_serving: StdMutex::new(0),
                abandoned: StdMutex::new(HashSet::new()),
                notify: Notify::new(),
            }),
        }
    }

    fn cost_for(&self, operation: &str, override_cost: Option<f64>) -> f64 {
        override_cost.unwrap_or_else(|| {
            self.inner
                .config
                .weights
                .get(operation)
                .copied()
                .unwrap_or(1.0)
        })
    }

    /// Acquire `cost` tokens for `operation`, suspending the caller in FIFO
    /// order until enough tokens have refilled. Cancellation (dropping the
    /// returned future) removes this waiter's queue slot without refunding
    /// any tokens already deducted by the time of cancellation.
    pub async fn acquire(&self, operation: &str, override_cost: Option<f64>) {
        let cost = self.cost_for(operation, override_cost);
        let rate_per_ms = self.inner.config.max_tokens / self.inner.config.window_ms;

        let my_ticket = {
            let mut next = self.inner.next_ticket.lock().unwrap();
            let ticket = *next;
            *next += 1;
            ticket
        };

        let mut guard = TicketGuard {
            inner: Arc::clone(&self.inner),
            ticket: my_ticket,
            completed: false,
        };

        loop {
            // Register for the next wakeup before checking any state: a
            // `notify_waiters()` fired between the check below and an
            // `.await` on a freshly-constructed `notified()` would
            // otherwise be missed, parking this waiter forever.
            let notified = self.inner.notify.notified();

            let is_my_turn = *self.inner.now_serving.lock().unwrap() == my_ticket;
            if is_my_turn {
                let wait = {
                    let mut bucket = self.inner.bucket.lock().unwrap();
                    bucket.refill(self.inner.config.max_tokens, rate_per_ms);
                    if bucket.tokens >= cost {
                        bucket.tokens -= cost;
                        drop(bucket);
                        let mut serving = self.inner.now_serving.lock().unwrap();
                        *serving += 1;
                        advance_past_abandoned(&self.inner, &mut serving);
                        drop(serving);
                        self.inner.notify.notify_waiters();
                        guard.completed = true;
                        return;
                    }
                    let deficit = cost - bucket.tokens;
                    Duration::from_secs_f64((deficit / rate_per_ms) / 1000.0)
                };
                tokio::select! {
                    () = tokio::time::sleep(wait) => {}
                    () = notified => {}
                }
                continue;
            }
            notified.await;
        }
    }

    /// Non-blocking check: true if `cost` tokens are currently available
    /// without suspending. Does not deduct and does not respect FIFO order
    /// against already-suspended waiters; callers that need strict ordering
    /// should use [`RateLimiter::acquire`].
    #[must_use]
    pub async fn try_acquire(&self, operation: &str, override_cost: Option<f64>) -> bool {
        let cost = self.cost_for(operation, override_cost);
        let rate_per_ms = self.inner.config.max_tokens / self.inner.config.window_ms;
        let mut bucket = self.inner.bucket.lock().unwrap();
        bucket.refill(self.inner.config.max_tokens, rate_per_ms);
        if bucket.tokens >= cost {
            bucket.tokens -= cost;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn admits_up_to_capacity_immediately() {
        let limiter = RateLimiter::new(RateLimiterConfig {
            max_tokens: 3.0,
            window_ms: 1000.0,
            weights: HashMap::new(),
        });

        let start = Instant::now();
        for _ in 0..3 {
            limiter.acquire("op", None).await;
        }
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[tokio::test]
    async fn fourth_waiter_is_delayed_by_roughly_one_window_share() {
        let limiter = RateLimiter::new(RateLimiterConfig {
            max_tokens: 3.0,
            window_ms: 900.0,
            weights: HashMap::new(),
        });

        for _ in 0..3 {
            limiter.acquire("op", None).await;
        }

        let start = Instant::now();
        limiter.acquire("op", None).await;
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(250));
    }

    #[tokio::test]
    async fn override_cost_takes_precedence_over_weights() {
        let mut weights = HashMap::new();
        weights.insert("heavy".to_string(), 10.0);
        let limiter = RateLimiter::new(RateLimiterConfig {
            max_tokens: 5.0,
            window_ms: 1000.0,
            weights,
        });

        assert!(limiter.try_acquire("heavy", Some(1.0)).await);
    }

    #[tokio::test]
    async fn cancelling_a_suspended_waiter_does_not_wedge_the_queue() {
        let limiter = RateLimiter::new(RateLimiterConfig {
            max_tokens: 1.0,
            window_ms: 5_000.0,
            weights: HashMap::new(),
        });

        // Drains the only token; the next acquire must suspend.
        limiter.acquire("op", None).await;

        let stuck = {
            let limiter = limiter.clone();
            tokio::spawn(async move {
                limiter.acquire("op", None).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        stuck.abort();
        let _ = stuck.await;

        // A waiter queued behind the cancelled one must still be served
        // once tokens refill, rather than waiting forever on a ticket
        // nobody will ever claim.
        tokio::time::timeout(Duration::from_secs(2), limiter.acquire("op", None))
            .await
            .expect("later waiter must not be wedged by a cancelled predecessor");
    }
}
