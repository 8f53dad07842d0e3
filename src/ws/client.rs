//! Lifecycle of exactly one physical WebSocket connection: connect,
//! heartbeat, auto-reconnect with backoff+jitter.
//!
//! Dials with `connect_async`, splits the socket into write/read halves,
//! and races the outbound-forward future against the inbound-processing
//! future with `futures_util::future::select` — supervised by a
//! reconnect loop with heartbeat timeout detection on top.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, watch, Mutex};
use tokio_tungstenite::tungstenite::Message;
use url::Url;

use crate::config::VenueId;
use crate::error::{ApiError, ErrorCategory};
use crate::http::retry::BackoffConfig;

/// Observable connection state.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum WsState {
    /// No connection attempt in progress.
    Disconnected,
    /// Dial in progress.
    Connecting,
    /// Socket open and healthy.
    Connected,
    /// Socket dropped; waiting out backoff before the next dial.
    Reconnecting,
}

/// Heartbeat configuration.
#[derive(Clone, Copy, Debug)]
pub struct HeartbeatConfig {
    /// How often to send a ping while connected.
    pub interval: Duration,
    /// How long to wait for a pong before treating the socket as dead.
    pub timeout: Duration,
    /// Whether heartbeating is enabled at all.
    pub enabled: bool,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            timeout: Duration::from_secs(10),
            enabled: true,
        }
    }
}

/// Configuration for a [`WsClient`].
#[derive(Clone, Debug)]
pub struct WsClientConfig {
    /// Endpoint to dial.
    pub url: Url,
    /// Heartbeat policy.
    pub heartbeat: HeartbeatConfig,
    /// Reconnect backoff policy.
    pub reconnect: BackoffConfig,
    /// Maximum reconnect attempts before giving up permanently; `None` is
    /// unlimited.
    pub max_reconnect_attempts: Option<u32>,
    /// Bound on each subscription's inbound queue (see
    /// [`crate::ws::manager::WsManager::watch`]). On overflow the oldest
    /// queued frame is dropped, never the newest.
    pub subscriber_queue_depth: usize,
}

impl Default for WsClientConfig {
    fn default() -> Self {
        Self {
            url: Url::parse("wss://localhost/").expect("static url"),
            heartbeat: HeartbeatConfig::default(),
            reconnect: BackoffConfig::websocket_reconnect(),
            max_reconnect_attempts: Some(10),
            subscriber_queue_depth: 1024,
        }
    }
}

/// Events a [`WsClient`] emits to its consumer (normally a [`crate::ws::WsManager`]).
#[derive(Clone, Debug)]
pub enum WsEvent {
    /// Connection established (first connect or a reconnect).
    Open,
    /// A text/binary frame that parsed as JSON.
    Message(serde_json::Value),
    /// A text frame that did not parse as JSON.
    Raw(String),
    /// The socket closed, with or without an error.
    Closed,
    /// A non-fatal error surfaced from a downstream subscriber or the
    /// transport itself; isolating these keeps one bad handler from
    /// crashing the client.
    Error(String),
    /// Reconnect attempts exceeded `max_reconnect_attempts`; no further
    /// reconnection will be attempted.
    MaxRetriesExceeded,
}

#[derive(Default)]
struct Metrics {
    messages_received: AtomicU64,
    messages_sent: AtomicU64,
    reconnect_attempts: AtomicU64,
}

/// Point-in-time metrics snapshot.
#[derive(Copy, Clone, Debug)]
pub struct MetricsSnapshot {
    /// Total messages received across the connection's lifetime.
    pub messages_received: u64,
    /// Total messages sent across the connection's lifetime.
    pub messages_sent: u64,
    /// Total reconnect attempts made.
    pub reconnect_attempts: u64,
    /// Current state.
    pub state: WsState,
    /// Seconds since the most recent successful connect, if connected.
    pub uptime_secs: Option<u64>,
}

/// A single managed WebSocket connection.
pub struct WsClient {
    venue: VenueId,
    outbound_tx: mpsc::UnboundedSender<Message>,
    state_rx: watch::Receiver<WsState>,
    should_reconnect: Arc<AtomicBool>,
    metrics: Arc<Metrics>,
    connected_at: Arc<Mutex<Option<Instant>>>,
    supervisor: tokio::task::JoinHandle<()>,
}

impl std::fmt::Debug for WsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WsClient")
            .field("state", &*self.state_rx.borrow())
            .finish()
    }
}

impl WsClient {
    /// Dial `config.url` and begin the connect/heartbeat/reconnect
    /// supervision loop. Returns the client handle plus the channel the
    /// caller (normally [`crate::ws::WsManager`]) drains for events.
    #[must_use]
    pub fn connect(venue: VenueId, config: WsClientConfig) -> (Self, mpsc::UnboundedReceiver<WsEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(WsState::Disconnected);
        let should_reconnect = Arc::new(AtomicBool::new(true));
        let metrics = Arc::new(Metrics::default());
        let connected_at = Arc::new(Mutex::new(None));

        let supervisor = tokio::spawn(run_supervisor(
            config,
            outbound_rx,
            outbound_tx.clone(),
            events_tx,
            state_tx,
            Arc::clone(&should_reconnect),
            Arc::clone(&metrics),
            Arc::clone(&connected_at),
        ));

        (
            Self {
                venue,
                outbound_tx,
                state_rx,
                should_reconnect,
                metrics,
                connected_at,
                supervisor,
            },
            events_rx,
        )
    }

    /// Send a frame on the socket.
    pub fn send(&self, message: Message) -> Result<(), ApiError> {
        self.outbound_tx.send(message).map_err(|_| {
            ApiError::new(
                self.venue,
                ErrorCategory::WebSocketDisconnected,
                "websocket outbound channel closed",
            )
        })
    }

    /// Current connection state.
    #[must_use]
    pub fn state(&self) -> WsState {
        *self.state_rx.borrow()
    }

    /// Mark `shouldReconnect=false`, stop the supervisor, and abort it.
    /// Safe to call repeatedly.
    pub fn disconnect(&self) {
        self.should_reconnect.store(false, Ordering::SeqCst);
        self.supervisor.abort();
    }

    /// Current metrics snapshot.
    pub async fn metrics(&self) -> MetricsSnapshot {
        let uptime_secs = self
            .connected_at
            .lock()
            .await
            .map(|t| t.elapsed().as_secs());
        MetricsSnapshot {
            messages_received: self.metrics.messages_received.load(Ordering::Relaxed),
            messages_sent: self.metrics.messages_sent.load(Ordering::Relaxed),
            reconnect_attempts: self.metrics.reconnect_attempts.load(Ordering::Relaxed),
            state: self.state(),
            uptime_secs,
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_supervisor(
    config: WsClientConfig,
    mut outbound_rx: mpsc::UnboundedReceiver<Message>,
    outbound_tx: mpsc::UnboundedSender<Message>,
    events_tx: mpsc::UnboundedSender<WsEvent>,
    state_tx: watch::Sender<WsState>,
    should_reconnect: Arc<AtomicBool>,
    metrics: Arc<Metrics>,
    connected_at: Arc<Mutex<Option<Instant>>>,
) {
    let mut attempt: u32 = 0;

    loop {
        let _ = state_tx.send(WsState::Connecting);

        match tokio_tungstenite::connect_async(config.url.as_str()).await {
            Ok((stream, _response)) => {
                attempt = 0;
                *connected_at.lock().await = Some(Instant::now());
                let _ = state_tx.send(WsState::Connected);
                let _ = events_tx.send(WsEvent::Open);

                run_connection(
                    stream,
                    &mut outbound_rx,
                    &outbound_tx,
                    &events_tx,
                    config.heartbeat,
                    &metrics,
                )
                .await;

                *connected_at.lock().await = None;
                let _ = events_tx.send(WsEvent::Closed);
            }
            Err(e) => {
                let _ = events_tx.send(WsEvent::Error(e.to_string()));
            }
        }

        if !should_reconnect.load(Ordering::SeqCst) {
            let _ = state_tx.send(WsState::Disconnected);
            return;
        }

        attempt += 1;
        if let Some(max) = config.max_reconnect_attempts {
            if attempt > max {
                let _ = events_tx.send(WsEvent::MaxRetriesExceeded);
                let _ = state_tx.send(WsState::Disconnected);
                return;
            }
        }

        let _ = state_tx.send(WsState::Reconnecting);
        metrics.reconnect_attempts.fetch_add(1, Ordering::Relaxed);
        tokio::time::sleep(config.reconnect.delay_for_attempt(attempt)).await;
    }
}

async fn run_connection(
    stream: tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >,
    outbound_rx: &mut mpsc::UnboundedReceiver<Message>,
    outbound_tx: &mpsc::UnboundedSender<Message>,
    events_tx: &mpsc::UnboundedSender<WsEvent>,
    heartbeat: HeartbeatConfig,
    metrics: &Arc<Metrics>,
) {
    let (mut write, mut read) = stream.split();

    let mut heartbeat_tick = tokio::time::interval(heartbeat.interval);
    heartbeat_tick.tick().await; // first tick fires immediately; discard it.
    let mut pong_deadline: Option<tokio::time::Instant> = None;

    loop {
        tokio::select! {
            maybe_out = outbound_rx.recv() => {
                match maybe_out {
                    Some(msg) => {
                        if write.send(msg).await.is_err() {
                            let _ = events_tx.send(WsEvent::Error("write failed".into()));
                            return;
                        }
                        metrics.messages_sent.fetch_add(1, Ordering::Relaxed);
                    }
                    None => return,
                }
            }
            incoming = read.next() => {
                match incoming {
                    Some(Ok(Message::Pong(_))) => {
                        pong_deadline = None;
                    }
                    Some(Ok(Message::Ping(payload))) => {
                        let _ = outbound_tx.send(Message::Pong(payload));
                    }
                    Some(Ok(Message::Text(text))) => {
                        metrics.messages_received.fetch_add(1, Ordering::Relaxed);
                        match serde_json::from_str::<serde_json::Value>(&text) {
                            Ok(value) => { let _ = events_tx.send(WsEvent::Message(value)); }
                            Err(_) => { let _ = events_tx.send(WsEvent::Raw(text)); }
                        }
                    }
                    Some(Ok(Message::Binary(bytes))) => {
                        metrics.messages_received.fetch_add(1, Ordering::Relaxed);
                        match std::str::from_utf8(&bytes) {
                            Ok(text) => match serde_json::from_str::<serde_json::Value>(text) {
                                Ok(value) => { let _ = events_tx.send(WsEvent::Message(value)); }
                                Err(_) => { let _ = events_tx.send(WsEvent::Raw(text.to_string())); }
                            },
                            Err(_) => { let _ = events_tx.send(WsEvent::Error("binary frame was not utf8".into())); }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => return,
                    Some(Err(e)) => {
                        let _ = events_tx.send(WsEvent::Error(e.to_string()));
                        return;
                    }
                    Some(Ok(Message::Frame(_))) => {}
                }
            }
            _ = heartbeat_tick.tick(), if heartbeat.enabled => {
                if write.send(Message::Ping(Vec::new())).await.is_err() {
                    let _ = events_tx.send(WsEvent::Error("ping failed".into()));
                    return;
                }
                pong_deadline = Some(tokio::time::Instant::now() + heartbeat.timeout);
            }
            () = wait_for_deadline(pong_deadline), if pong_deadline.is_some() => {
                let _ = events_tx.send(WsEvent::Error("heartbeat timeout, closing socket".into()));
                return;
            }
        }
    }
}

async fn wait_for_deadline(deadline: Option<tokio::time::Instant>) {
    match deadline {
        Some(d) => tokio::time::sleep_until(d).await,
        None => std::future::pending().await,
    }
}
