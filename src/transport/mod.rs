//! WebSocket transport layer.
//!
//! This module owns the raw socket. Nothing above it touches tungstenite
//! types.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐   TransportHandler    ┌──────────────────┐
//! │  WebSocketClient │◄──────────────────────│  Connection task │◄──── ws://server
//! │  (Dispatcher)    │   open/message/       │  (tokio spawn)   │
//! │                  │   error/close         │                  │
//! │                  │──────────────────────►│                  │
//! └──────────────────┘   Send / Shutdown     └──────────────────┘
//! ```
//!
//! # Connection Lifecycle
//!
//! 1. [`transport_supported`] - capability check before anything is built
//! 2. `Connection::open` - spawns the task, state `Connecting`
//! 3. Handshake completes - state `Open`, `on_open` fires
//! 4. Frames flow - `on_message` per text/binary frame
//! 5. Close or error - state `Closed`, `on_error`/`on_close` fire
//!
//! Every notification is gated by the connection's [`ListenerGroup`].
//! Detaching it silences the task at once, which is how a replaced or
//! disposed transport is kept away from the bus.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `connection` | Socket task and its handle |
//! | `options` | Connection options |

// ============================================================================
// Submodules
// ============================================================================

/// Socket task and handle.
pub mod connection;

/// Connection options.
pub mod options;

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use tokio::runtime::Handle;
use url::Url;

use crate::error::Error;
use crate::protocol::{CloseEvent, ErrorEvent, OpenEvent};

// ============================================================================
// Re-exports
// ============================================================================

pub use connection::Connection;
pub use options::{ConnectionOptions, DEFAULT_CONNECT_TIMEOUT};

// ============================================================================
// Capability Check
// ============================================================================

/// Returns `true` if a transport for `url` can be constructed here.
///
/// Requires a running tokio runtime. `ws` is always available; `wss` needs
/// the `native-tls` feature.
#[must_use]
pub fn transport_supported(url: &Url) -> bool {
    unsupported_reason(url).is_none()
}

/// Explains why [`transport_supported`] is `false`.
pub(crate) fn unsupported_reason(url: &Url) -> Option<Error> {
    if Handle::try_current().is_err() {
        return Some(Error::unsupported("no tokio runtime is running"));
    }

    match url.scheme() {
        "ws" => None,
        "wss" if cfg!(feature = "native-tls") => None,
        "wss" => Some(Error::unsupported(
            "wss requires the `native-tls` feature",
        )),
        other => Some(Error::unsupported(format!("scheme '{other}' is not a WebSocket scheme"))),
    }
}

// ============================================================================
// ReadyState
// ============================================================================

/// State of one transport, mirroring the browser `readyState`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ReadyState {
    /// Handshake in progress.
    Connecting = 0,
    /// Frames can be sent.
    Open = 1,
    /// Close requested.
    Closing = 2,
    /// Closed or never opened.
    Closed = 3,
}

impl ReadyState {
    #[inline]
    const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Connecting,
            1 => Self::Open,
            2 => Self::Closing,
            _ => Self::Closed,
        }
    }
}

impl fmt::Display for ReadyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closing => "closing",
            Self::Closed => "closed",
        })
    }
}

/// Atomic cell holding a [`ReadyState`].
#[derive(Debug, Clone)]
pub(crate) struct SharedReadyState(Arc<AtomicU8>);

impl SharedReadyState {
    pub(crate) fn new(state: ReadyState) -> Self {
        Self(Arc::new(AtomicU8::new(state as u8)))
    }

    #[inline]
    pub(crate) fn get(&self) -> ReadyState {
        ReadyState::from_u8(self.0.load(Ordering::Acquire))
    }

    #[inline]
    pub(crate) fn set(&self, state: ReadyState) {
        self.0.store(state as u8, Ordering::Release);
    }
}

// ============================================================================
// ListenerGroup
// ============================================================================

/// Revocable gate shared by every notification of one transport.
#[derive(Debug, Clone)]
pub(crate) struct ListenerGroup(Arc<AtomicBool>);

impl ListenerGroup {
    pub(crate) fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    #[inline]
    pub(crate) fn is_attached(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Detaches all listeners of this transport at once.
    #[inline]
    pub(crate) fn detach(&self) {
        self.0.store(false, Ordering::Release);
    }
}

// ============================================================================
// TransportHandler
// ============================================================================

/// Receiver of low-level transport notifications.
///
/// Called from the transport task. Implementations must not block.
pub trait TransportHandler: Send + Sync + 'static {
    /// Handshake completed.
    fn on_open(&self, event: OpenEvent);

    /// A text or binary frame arrived.
    fn on_message(&self, data: &[u8]);

    /// The handshake or the established transport failed.
    fn on_error(&self, event: ErrorEvent);

    /// The transport is closed. Always the last notification.
    fn on_close(&self, event: CloseEvent);
}

// ============================================================================
// Tests
// ============================================================================
