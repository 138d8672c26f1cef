//! Error types for socket-webox.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! Client operations return [`Result<T>`] which uses [`Error`]. None of them
//! panic: a refused operation is logged and reported as an `Err`, leaving the
//! client in its previous state.
//!
//! ```ignore
//! use socket_webox::{Error, WebSocketClient};
//!
//! match client.send_msg(&payload) {
//!     Ok(()) => {}
//!     Err(Error::NotOpen { .. }) => { /* wait for the open event */ }
//!     Err(e) => return Err(e),
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`], [`Error::InvalidArgument`] |
//! | Heartbeat | [`Error::HeartbeatNotConfigured`], [`Error::ProtectedEvent`] |
//! | Connection | [`Error::UnsupportedEnvironment`], [`Error::Connection`], [`Error::ConnectionTimeout`], [`Error::ConnectionClosed`], [`Error::NotConnected`], [`Error::NotOpen`] |
//! | Lifecycle | [`Error::Disposed`] |
//! | External | [`Error::Json`], [`Error::WebSocket`], [`Error::Url`] |

// ============================================================================
// Imports
// ============================================================================

use std::result::Result as StdResult;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

use crate::transport::ReadyState;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when connection options are invalid (malformed URL,
    /// unknown scheme, empty tag field).
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// Invalid argument.
    ///
    /// Returned when an operation receives a value it cannot use, such as a
    /// zero heartbeat interval.
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Description of the invalid argument.
        message: String,
    },

    // ========================================================================
    // Heartbeat Errors
    // ========================================================================
    /// Heartbeat control used before `init_heartbeat`.
    #[error("Heartbeat is not configured")]
    HeartbeatNotConfigured,

    /// Attempt to remove the internal heartbeat ack subscription.
    #[error("Event '{event}' is owned by the heartbeat and cannot be removed")]
    ProtectedEvent {
        /// The protected event name.
        event: String,
    },

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// The runtime cannot construct a transport for this URL.
    #[error("WebSocket is not supported: {message}")]
    UnsupportedEnvironment {
        /// Why the transport is unavailable.
        message: String,
    },

    /// WebSocket connection failed.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// Opening handshake did not finish in time.
    #[error("Connection timeout after {timeout_ms}ms")]
    ConnectionTimeout {
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    /// WebSocket connection closed.
    #[error("Connection closed")]
    ConnectionClosed,

    /// No transport exists yet.
    #[error("Not connected")]
    NotConnected,

    /// A transport exists but is not in the open state.
    #[error("Transport is not open (state: {state})")]
    NotOpen {
        /// Current ready state of the transport.
        state: ReadyState,
    },

    // ========================================================================
    // Lifecycle Errors
    // ========================================================================
    /// The client was disposed and cannot be reused.
    #[error("Client has been disposed")]
    Disposed,

    // ========================================================================
    // External Errors
    // ========================================================================
    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),

    /// URL parse error.
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates an invalid argument error.
    #[inline]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates a protected event error.
    #[inline]
    pub fn protected_event(event: impl Into<String>) -> Self {
        Self::ProtectedEvent {
            event: event.into(),
        }
    }

    /// Creates an unsupported environment error.
    #[inline]
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::UnsupportedEnvironment {
            message: message.into(),
        }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a connection timeout error.
    #[inline]
    pub fn connection_timeout(timeout_ms: u64) -> Self {
        Self::ConnectionTimeout { timeout_ms }
    }

    /// Creates a not-open error for the given state.
    #[inline]
    pub fn not_open(state: ReadyState) -> Self {
        Self::NotOpen { state }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedEnvironment { .. }
                | Self::Connection { .. }
                | Self::ConnectionTimeout { .. }
                | Self::ConnectionClosed
                | Self::NotConnected
                | Self::NotOpen { .. }
                | Self::WebSocket(_)
        )
    }

    /// Returns `true` if this error is recoverable.
    ///
    /// Recoverable errors may succeed after a reconnect or a short wait.
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. }
                | Self::ConnectionTimeout { .. }
                | Self::ConnectionClosed
                | Self::NotConnected
                | Self::NotOpen { .. }
        )
    }

    /// Returns `true` if the client was disposed.
    #[inline]
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        matches!(self, Self::Disposed)
    }
}

// ============================================================================
// Tests
// ============================================================================
