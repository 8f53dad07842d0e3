//! WebSocket stream engine: single-connection lifecycle with
//! auto-reconnect and heartbeat, and subscription multiplexing over
//! that one connection.

pub mod client;
pub mod manager;

pub use client::{WsClient, WsClientConfig, WsEvent, WsState};
pub use manager::{Subscription, SubscriptionReceiver, WsManager};
