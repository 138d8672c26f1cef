//! socket-webox - Event-driven WebSocket client with heartbeat detection.
//!
//! This library manages the lifecycle of one logical WebSocket connection
//! on top of an unreliable transport. Callers never touch the socket: they
//! subscribe to named events on a bus.
//!
//! # Architecture
//!
//! ```text
//!                 ┌────────────────────────────────────────────┐
//!   caller ──────►│ WebSocketClient                            │
//!   on/off/send   │                                            │
//!                 │  ┌──────────┐  acks   ┌──────────────────┐ │
//!   callbacks ◄───│──│ EventBus │◄───────►│ Heartbeat        │ │
//!                 │  └──────────┘ overtime└──────────────────┘ │
//!                 │       ▲                       │ MessageSink│
//!                 │       │ Dispatcher            ▼            │
//!                 │  ┌──────────────────────────────────────┐  │
//!                 │  │ Connection task (tokio-tungstenite)  │◄─┼──► server
//!                 │  └──────────────────────────────────────┘  │
//!                 └────────────────────────────────────────────┘
//! ```
//!
//! Key design principles:
//!
//! - Inbound frames are JSON objects dispatched by a configurable tag field
//! - Lifecycle events use reserved `inner:` names inbound frames cannot spoof
//! - The heartbeat only signals overtime; reconnect policy stays with the caller
//! - A replaced or disposed transport is detached before it is closed
//!
//! # Quick Start
//!
//! ```no_run
//! use std::time::Duration;
//! use serde_json::json;
//! use socket_webox::{HeartbeatOptions, ReservedEvent, Result, WebSocketClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let client = WebSocketClient::builder()
//!         .url("ws://127.0.0.1:2048/ws/?name=alice")
//!         .receive_tag_field("msgMode")
//!         .heartbeat(HeartbeatOptions::new(
//!             json!({ "msgMode": "heartbeat", "msg": null }),
//!             "heartbeat",
//!             Duration::from_millis(1500),
//!         ))
//!         .build()?;
//!
//!     client.on("chat", |frame| println!("chat: {frame}"))?;
//!     client.on(ReservedEvent::HeartbeatOvertime.as_str(), |_| println!("peer silent"))?;
//!
//!     client.connect()?;
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`bus`] | Named-event publish/subscribe: [`EventBus`] |
//! | [`client`] | Connection manager: [`WebSocketClient`], [`ClientBuilder`] |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`heartbeat`] | Heartbeat state machine |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`protocol`] | Reserved events, lifecycle payloads, frame decoding |
//! | [`transport`] | WebSocket transport layer |
//!
//! # Features
//!
//! - `native-tls`: enables `wss://` URLs

// ============================================================================
// Modules
// ============================================================================

/// Named-event publish/subscribe registry.
pub mod bus;

/// Connection manager.
///
/// Use [`WebSocketClient::builder()`] to create a configured client.
pub mod client;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Application-level heartbeat.
pub mod heartbeat;

/// Type-safe identifiers.
pub mod identifiers;

/// Reserved lifecycle events and inbound frame decoding.
pub mod protocol;

/// WebSocket transport layer.
///
/// Handles the socket task and the environment capability check.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Bus types
pub use bus::{Callback, EventBus};

// Client types
pub use client::{ClientBuilder, WebSocketClient};

// Error types
pub use error::{Error, Result};

// Heartbeat types
pub use heartbeat::{HeartbeatOptions, HeartbeatSnapshot, HeartbeatStatus};

// Identifier types
pub use identifiers::{ConnectionId, SubscriptionId};

// Protocol types
pub use protocol::{CloseEvent, ErrorEvent, ErrorKind, OpenEvent, ReservedEvent};

// Transport types
pub use transport::{ConnectionOptions, ReadyState, transport_supported};
