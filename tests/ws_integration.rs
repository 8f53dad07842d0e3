//! End-to-end exercise of the WebSocket stream engine against a real
//! local socket: reconnect + resend, subscription release on drop, and
//! multi-subscriber fan-out.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use perp_unify::config::VenueId;
use perp_unify::http::BackoffConfig;
use perp_unify::ws::{WsClientConfig, WsManager, WsState};
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

/// A minimal test server: accepts exactly one connection at a time,
/// forwards every received text frame to `inbound`, and replays whatever
/// is pushed onto `outbound` back down the socket. Returns the listener's
/// address and a handle to push frames out.
async fn spawn_echo_server() -> (
    std::net::SocketAddr,
    mpsc::UnboundedSender<Message>,
    mpsc::UnboundedReceiver<Value>,
) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (push_tx, mut push_rx) = mpsc::unbounded_channel::<Message>();
    let (seen_tx, seen_rx) = mpsc::unbounded_channel::<Value>();

    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };
            let Ok(ws) = tokio_tungstenite::accept_async(stream).await else {
                continue;
            };
            handle_connection(ws, &mut push_rx, seen_tx.clone()).await;
        }
    });

    (addr, push_tx, seen_rx)
}

async fn handle_connection(
    ws: WebSocketStream<TcpStream>,
    push_rx: &mut mpsc::UnboundedReceiver<Message>,
    seen_tx: mpsc::UnboundedSender<Value>,
) {
    let (mut write, mut read) = ws.split();
    loop {
        tokio::select! {
            incoming = read.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        if let Ok(value) = serde_json::from_str::<Value>(&text) {
                            let _ = seen_tx.send(value);
                        }
                    }
                    Some(Ok(Message::Ping(_))) => {
                        // Deliberately unanswered: the heartbeat-timeout test
                        // relies on this server never completing the ping/pong
                        // round trip.
                    }
                    Some(Ok(Message::Close(_))) | None | Some(Err(_)) => return,
                    _ => {}
                }
            }
            to_push = push_rx.recv() => {
                match to_push {
                    Some(msg) => { if write.send(msg).await.is_err() { return; } }
                    None => return,
                }
            }
        }
    }
}

fn fast_reconnect_config(url: url::Url) -> WsClientConfig {
    WsClientConfig {
        url,
        reconnect: BackoffConfig {
            max_attempts: 20,
            initial_delay: Duration::from_millis(20),
            max_delay: Duration::from_millis(100),
            multiplier: 1.5,
            jitter: 0.0,
        },
        max_reconnect_attempts: Some(20),
        ..WsClientConfig::default()
    }
}

async fn wait_for_state(manager: &WsManager, state: WsState, timeout: Duration) {
    let deadline = tokio::time::Instant::now() + timeout;
    while manager.state() != state {
        if tokio::time::Instant::now() >= deadline {
            panic!("timed out waiting for state {state:?}, still {:?}", manager.state());
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn two_subscribers_on_the_same_key_both_receive_frames_and_only_one_subscribe_is_sent() {
    let (addr, push_tx, mut seen_rx) = spawn_echo_server().await;
    let url = format!("ws://{addr}/").parse().unwrap();
    let manager = WsManager::connect(VenueId::Reference, fast_reconnect_config(url));
    wait_for_state(&manager, WsState::Connected, Duration::from_secs(2)).await;

    let mut sub_a = manager
        .watch("trades.BTC-PERP", json!({"method": "subscribe", "channel": "trades"}), None)
        .await
        .unwrap();
    let mut sub_b = manager
        .watch("trades.BTC-PERP", json!({"method": "subscribe", "channel": "trades"}), None)
        .await
        .unwrap();

    let first_subscribe = seen_rx.recv().await.unwrap();
    assert_eq!(first_subscribe["method"], "subscribe");
    // The second `watch` on the same key must not send a second subscribe
    // frame; confirm nothing else arrives for a short window.
    assert!(
        tokio::time::timeout(Duration::from_millis(150), seen_rx.recv())
            .await
            .is_err()
    );

    let frame = json!({"channel": "trades", "symbol": "BTC-PERP", "px": "1"});
    push_tx.send(Message::Text(frame.to_string())).unwrap();

    assert_eq!(sub_a.receiver.recv().await.unwrap(), frame);
    assert_eq!(sub_b.receiver.recv().await.unwrap(), frame);
}

#[tokio::test]
async fn dropping_the_last_subscription_sends_the_unsubscribe_frame_exactly_once() {
    let (addr, _push_tx, mut seen_rx) = spawn_echo_server().await;
    let url = format!("ws://{addr}/").parse().unwrap();
    let manager = WsManager::connect(VenueId::Reference, fast_reconnect_config(url));
    wait_for_state(&manager, WsState::Connected, Duration::from_secs(2)).await;

    let sub_a = manager
        .watch(
            "ticker.BTC-PERP",
            json!({"method": "subscribe", "channel": "ticker"}),
            Some(json!({"method": "unsubscribe", "channel": "ticker"})),
        )
        .await
        .unwrap();
    let sub_b = manager
        .watch(
            "ticker.BTC-PERP",
            json!({"method": "subscribe", "channel": "ticker"}),
            Some(json!({"method": "unsubscribe", "channel": "ticker"})),
        )
        .await
        .unwrap();

    let _ = seen_rx.recv().await.unwrap(); // the one subscribe frame

    drop(sub_a);
    // One subscriber remains: dropping the first must not unsubscribe yet.
    assert!(
        tokio::time::timeout(Duration::from_millis(150), seen_rx.recv())
            .await
            .is_err()
    );

    drop(sub_b);
    let unsubscribe = tokio::time::timeout(Duration::from_secs(1), seen_rx.recv())
        .await
        .expect("unsubscribe frame should arrive once the last subscriber drops")
        .unwrap();
    assert_eq!(unsubscribe["method"], "unsubscribe");

    // Nothing further is sent for this key.
    assert!(
        tokio::time::timeout(Duration::from_millis(150), seen_rx.recv())
            .await
            .is_err()
    );
}

#[tokio::test]
async fn reconnect_resends_the_live_subscription() {
    let (addr, push_tx, mut seen_rx) = spawn_echo_server().await;
    let url = format!("ws://{addr}/").parse().unwrap();
    let manager = WsManager::connect(VenueId::Reference, fast_reconnect_config(url));
    wait_for_state(&manager, WsState::Connected, Duration::from_secs(2)).await;

    let _sub = manager
        .watch("orderbook.BTC-PERP", json!({"method": "subscribe", "channel": "orderbook"}), None)
        .await
        .unwrap();
    let _ = seen_rx.recv().await.unwrap(); // initial subscribe

    // Force the connection closed from the server side; the client's
    // supervisor should reconnect and resend every live subscription.
    push_tx.send(Message::Close(None)).unwrap();
    wait_for_state(&manager, WsState::Connecting, Duration::from_secs(2)).await;
    wait_for_state(&manager, WsState::Connected, Duration::from_secs(5)).await;

    let resent = tokio::time::timeout(Duration::from_secs(2), seen_rx.recv())
        .await
        .expect("resubscribe frame should arrive after reconnect")
        .unwrap();
    assert_eq!(resent["channel"], "orderbook");
}

#[tokio::test]
async fn heartbeat_timeout_triggers_a_reconnect() {
    let (addr, _push_tx, _seen_rx) = spawn_echo_server().await;
    let url: url::Url = format!("ws://{addr}/").parse().unwrap();
    let mut config = fast_reconnect_config(url);
    config.heartbeat.interval = Duration::from_millis(30);
    config.heartbeat.timeout = Duration::from_millis(60);

    let manager = WsManager::connect(VenueId::Reference, config);
    wait_for_state(&manager, WsState::Connected, Duration::from_secs(2)).await;

    // The test server never answers pings, so the heartbeat deadline
    // fires, the socket is torn down, and the supervisor reconnects.
    wait_for_state(&manager, WsState::Reconnecting, Duration::from_secs(2)).await;
    wait_for_state(&manager, WsState::Connected, Duration::from_secs(5)).await;
}
