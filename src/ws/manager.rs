//! Subscription multiplexing over one [`WsClient`]: many logical
//! subscribers share a single physical socket, each subscription is
//! refcounted, and every live subscription is resent after a reconnect.
//!
//! Builds a `{"method":"subscribe",...}` frame per channel and routes
//! inbound frames back out by channel name, fanning one inbound stream
//! out to multiple consumers over a bounded, drop-oldest queue per
//! subscriber.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use indexmap::IndexMap;
use serde_json::Value;
use tokio::sync::{Mutex, Notify};
use tokio_tungstenite::tungstenite::Message;

use crate::config::VenueId;
use crate::error::ApiError;
use crate::ws::client::{WsClient, WsClientConfig, WsEvent};

/// A per-subscriber inbound queue bounded at construction time. On
/// overflow the **oldest** buffered frame is dropped and a counter is
/// incremented, per spec §4.4 — never the newest, which is what a plain
/// `tokio::sync::mpsc::Sender::try_send` would do.
struct DropOldestQueue {
    buffer: StdMutex<VecDeque<Value>>,
    capacity: usize,
    notify: Notify,
    dropped: AtomicU64,
    closed: AtomicBool,
}

impl DropOldestQueue {
    fn new(capacity: usize) -> Arc<Self> {
        Arc::new(Self {
            buffer: StdMutex::new(VecDeque::with_capacity(capacity.min(64))),
            capacity: capacity.max(1),
            notify: Notify::new(),
            dropped: AtomicU64::new(0),
            closed: AtomicBool::new(false),
        })
    }

    /// Push a frame, dropping the oldest queued one first if already at
    /// capacity. A no-op once the consumer side has dropped the receiver.
    fn push(&self, value: Value) {
        if self.closed.load(Ordering::Acquire) {
            return;
        }
        {
            let mut buffer = self.buffer.lock().unwrap();
            if buffer.len() >= self.capacity {
                buffer.pop_front();
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
            buffer.push_back(value);
        }
        self.notify.notify_one();
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// The receiving half of a [`Subscription`]'s inbound queue. Dropping it
/// marks the queue closed, which both stops further pushes and lets the
/// router prune this subscriber out of its channel's fan-out list.
pub struct SubscriptionReceiver {
    queue: Arc<DropOldestQueue>,
}

impl std::fmt::Debug for SubscriptionReceiver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionReceiver")
            .field("dropped", &self.queue.dropped_count())
            .finish()
    }
}

impl SubscriptionReceiver {
    /// Await the next frame tagged for this subscription, or `None` once
    /// the subscription has been released.
    ///
    /// Registers the wakeup *before* checking queue state — the same
    /// fix applied to `RateLimiter::acquire` — so a `push` landing
    /// between the empty-check and awaiting the notification can never
    /// be missed.
    pub async fn recv(&mut self) -> Option<Value> {
        loop {
            let notified = self.queue.notify.notified();
            {
                let mut buffer = self.queue.buffer.lock().unwrap();
                if let Some(value) = buffer.pop_front() {
                    return Some(value);
                }
                if self.queue.closed.load(Ordering::Acquire) {
                    return None;
                }
            }
            notified.await;
        }
    }

    /// Total frames dropped from this subscription's queue for arriving
    /// while it was already at capacity.
    #[must_use]
    pub fn dropped_count(&self) -> u64 {
        self.queue.dropped_count()
    }
}

impl Drop for SubscriptionReceiver {
    fn drop(&mut self) {
        self.queue.closed.store(true, Ordering::Release);
        self.queue.notify.notify_waiters();
    }
}

/// A live subscription: the channel key the venue uses to route inbound
/// frames back to this subscriber, and the bounded, drop-oldest queue
/// subscribers drain from.
///
/// There is no separate `unsubscribe` call: dropping this value is the
/// sole unsubscribe trigger. `Drop` decrements the channel's
/// refcount and, if it reaches zero, sends the `unsubscribe` frame (if
/// one was supplied to [`WsManager::watch`]) exactly once.
pub struct Subscription {
    /// Venue channel key, e.g. `"orderbook.BTC-PERP"`.
    pub key: String,
    /// Inbound frames matching this subscription's key.
    pub receiver: SubscriptionReceiver,
    subscriptions: Arc<Mutex<SubscriptionTable>>,
    client: Arc<WsClient>,
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("key", &self.key).finish()
    }
}

impl Subscription {
    /// Frames dropped from this subscription's own queue because the
    /// consumer fell behind, surfaced for metrics/alerting.
    #[must_use]
    pub fn dropped_count(&self) -> u64 {
        self.receiver.dropped_count()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let subscriptions = Arc::clone(&self.subscriptions);
        let client = Arc::clone(&self.client);
        let key = std::mem::take(&mut self.key);
        tokio::spawn(async move {
            release(&subscriptions, &client, &key).await;
        });
    }
}

struct Entry {
    subscribe_frame: Value,
    unsubscribe_frame: Option<Value>,
    refcount: u32,
    queues: Vec<Arc<DropOldestQueue>>,
}

/// Subscriptions keyed by channel, preserving first-registration order so
/// a reconnect can resend `subscribe` frames "in the same order they were
/// first registered" (spec §4.4 / §8) — a plain `HashMap` does not
/// guarantee that iteration order.
type SubscriptionTable = IndexMap<String, Entry>;

/// Multiplexes many logical subscriptions over one [`WsClient`].
pub struct WsManager {
    venue: VenueId,
    client: Arc<WsClient>,
    subscriptions: Arc<Mutex<SubscriptionTable>>,
    subscriber_queue_depth: usize,
    router: tokio::task::JoinHandle<()>,
}

impl std::fmt::Debug for WsManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WsManager")
            .field("venue", &self.venue)
            .field("state", &self.client.state())
            .finish()
    }
}

impl WsManager {
    /// Connect and start routing.
    #[must_use]
    pub fn connect(venue: VenueId, config: WsClientConfig) -> Self {
        let subscriber_queue_depth = config.subscriber_queue_depth;
        let (client, mut events_rx) = WsClient::connect(venue, config);
        let client = Arc::new(client);
        let subscriptions: Arc<Mutex<SubscriptionTable>> = Arc::new(Mutex::new(IndexMap::new()));

        let route_subs = Arc::clone(&subscriptions);
        let route_client = Arc::clone(&client);
        let router = tokio::spawn(async move {
            while let Some(event) = events_rx.recv().await {
                match event {
                    WsEvent::Message(value) => {
                        route_message(&route_subs, &value).await;
                    }
                    WsEvent::Open => {
                        resend_all(&route_subs, &route_client).await;
                    }
                    WsEvent::Raw(_) | WsEvent::Closed | WsEvent::Error(_) | WsEvent::MaxRetriesExceeded => {}
                }
            }
        });

        Self {
            venue,
            client,
            subscriptions,
            subscriber_queue_depth,
            router,
        }
    }

    /// Subscribe to a channel. If another subscriber already holds this
    /// key, the refcount is bumped and no frame is sent; otherwise a
    /// `subscribe` frame is sent immediately and the key is appended to
    /// the insertion-ordered routing table. Each call gets its own
    /// bounded, drop-oldest queue so multiple watchers of the same key
    /// all observe every frame, independent of one another's drain rate.
    pub async fn watch(
        &self,
        key: impl Into<String>,
        subscribe_frame: Value,
        unsubscribe_frame: Option<Value>,
    ) -> Result<Subscription, ApiError> {
        let key = key.into();
        let queue = DropOldestQueue::new(self.subscriber_queue_depth);

        let mut subs = self.subscriptions.lock().await;
        match subs.get_mut(&key) {
            Some(entry) => {
                entry.refcount += 1;
                entry.queues.push(Arc::clone(&queue));
            }
            None => {
                self.client
                    .send(Message::Text(subscribe_frame.to_string()))?;
                subs.insert(
                    key.clone(),
                    Entry {
                        subscribe_frame,
                        unsubscribe_frame,
                        refcount: 1,
                        queues: vec![Arc::clone(&queue)],
                    },
                );
            }
        }

        drop(subs);

        Ok(Subscription {
            key,
            receiver: SubscriptionReceiver { queue },
            subscriptions: Arc::clone(&self.subscriptions),
            client: Arc::clone(&self.client),
        })
    }

    /// Current connection state of the underlying socket.
    #[must_use]
    pub fn state(&self) -> crate::ws::client::WsState {
        self.client.state()
    }

    /// Send a one-off frame not tied to any subscription (e.g. an auth
    /// handshake or an order-placement frame on a private channel).
    pub fn send_raw(&self, frame: Value) -> Result<(), ApiError> {
        self.client.send(Message::Text(frame.to_string()))
    }

    /// Tear down the socket and the routing task.
    pub fn disconnect(&self) {
        self.client.disconnect();
        self.router.abort();
    }
}

/// Drop one reference to `key`, triggered solely by the owning
/// [`Subscription`]'s `Drop`, never by a standalone API. Sends the
/// `unsubscribe` frame, if one was supplied at `watch` time, exactly
/// once, when the refcount reaches zero.
async fn release(subscriptions: &Arc<Mutex<SubscriptionTable>>, client: &Arc<WsClient>, key: &str) {
    let mut subs = subscriptions.lock().await;
    let Some(entry) = subs.get_mut(key) else {
        return;
    };

    entry.refcount = entry.refcount.saturating_sub(1);
    if entry.refcount == 0 {
        let unsubscribe_frame = entry.unsubscribe_frame.clone();
        subs.shift_remove(key);
        drop(subs);
        if let Some(frame) = unsubscribe_frame {
            if let Err(e) = client.send(Message::Text(frame.to_string())) {
                log::warn!("failed to send unsubscribe frame for {key}: {e}");
            }
        }
    }
}

/// Resend every live channel's `subscribe` frame after a reconnect, in
/// the order those channels were first registered — `IndexMap` iterates
/// in insertion order, unlike a `HashMap`.
async fn resend_all(subscriptions: &Arc<Mutex<SubscriptionTable>>, client: &Arc<WsClient>) {
    let subs = subscriptions.lock().await;
    log::info!("resubscribing {} channel(s) after reconnect", subs.len());
    for entry in subs.values() {
        if let Err(e) = client.send(Message::Text(entry.subscribe_frame.to_string())) {
            log::warn!("failed to resend subscription after reconnect: {e}");
        }
    }
}

async fn route_message(subscriptions: &Arc<Mutex<SubscriptionTable>>, value: &Value) {
    let Some(channel_key) = extract_channel_key(value) else {
        return;
    };

    let mut subs = subscriptions.lock().await;
    if let Some(entry) = subs.get_mut(&channel_key) {
        entry.queues.retain(|queue| !queue.is_closed());
        for queue in &entry.queues {
            queue.push(value.clone());
        }
    }
}

/// Venue frames route on either a top-level `"channel"` field or a
/// combination of `"channel"` plus `"symbol"`/`"market"` fields — the two
/// shapes common to venue push-frame formats.
fn extract_channel_key(value: &Value) -> Option<String> {
    let channel = value.get("channel")?.as_str()?;
    if let Some(symbol) = value.get("symbol").and_then(Value::as_str) {
        Some(format!("{channel}.{symbol}"))
    } else {
        Some(channel.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_plain_channel_key() {
        let frame = serde_json::json!({ "channel": "trades" });
        assert_eq!(extract_channel_key(&frame), Some("trades".to_string()));
    }

    #[test]
    fn extracts_composite_channel_and_symbol_key() {
        let frame = serde_json::json!({ "channel": "orderbook", "symbol": "BTC-PERP" });
        assert_eq!(
            extract_channel_key(&frame),
            Some("orderbook.BTC-PERP".to_string())
        );
    }

    #[test]
    fn returns_none_without_a_channel_field() {
        let frame = serde_json::json!({ "method": "ping" });
        assert_eq!(extract_channel_key(&frame), None);
    }

    #[tokio::test]
    async fn route_message_drops_frames_for_unknown_channel() {
        let subs: Arc<Mutex<SubscriptionTable>> = Arc::new(Mutex::new(IndexMap::new()));
        let frame = serde_json::json!({ "channel": "unsubscribed-channel" });
        route_message(&subs, &frame).await;
        assert!(subs.lock().await.is_empty());
    }

    #[tokio::test]
    async fn route_message_fans_out_to_every_sender_on_a_key() {
        let subs: Arc<Mutex<SubscriptionTable>> = Arc::new(Mutex::new(IndexMap::new()));
        let queue_a = DropOldestQueue::new(8);
        let queue_b = DropOldestQueue::new(8);
        subs.lock().await.insert(
            "trades.BTC-PERP".to_string(),
            Entry {
                subscribe_frame: serde_json::json!({}),
                unsubscribe_frame: None,
                refcount: 2,
                queues: vec![Arc::clone(&queue_a), Arc::clone(&queue_b)],
            },
        );

        let frame = serde_json::json!({ "channel": "trades", "symbol": "BTC-PERP", "price": "100" });
        route_message(&subs, &frame).await;

        let mut rx_a = SubscriptionReceiver { queue: queue_a };
        let mut rx_b = SubscriptionReceiver { queue: queue_b };
        assert_eq!(rx_a.recv().await.unwrap(), frame);
        assert_eq!(rx_b.recv().await.unwrap(), frame);
    }

    #[test]
    fn queue_drops_oldest_frame_on_overflow_and_counts_the_drop() {
        let queue = DropOldestQueue::new(2);
        queue.push(serde_json::json!(1));
        queue.push(serde_json::json!(2));
        queue.push(serde_json::json!(3));

        assert_eq!(queue.dropped_count(), 1);
        let buffered: Vec<_> = queue.buffer.lock().unwrap().iter().cloned().collect();
        assert_eq!(buffered, vec![serde_json::json!(2), serde_json::json!(3)]);
    }

    #[tokio::test]
    async fn resend_all_preserves_first_registration_order() {
        let subs: Arc<Mutex<SubscriptionTable>> = Arc::new(Mutex::new(IndexMap::new()));
        for key in ["c", "a", "b"] {
            subs.lock().await.insert(
                key.to_string(),
                Entry {
                    subscribe_frame: serde_json::json!({ "key": key }),
                    unsubscribe_frame: None,
                    refcount: 1,
                    queues: Vec::new(),
                },
            );
        }

        let order: Vec<String> = subs.lock().await.keys().cloned().collect();
        assert_eq!(order, vec!["c", "a", "b"]);
    }
}
