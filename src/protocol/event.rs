//! Reserved lifecycle events and their payloads.
//!
//! The client owns four event names. They are namespaced with `inner:` so
//! they cannot collide with tag values chosen by a server, and inbound frames
//! that try to use them are dropped.
//!
//! | Event | Payload | Emitted when |
//! |-------|---------|--------------|
//! | `inner:open` | [`OpenEvent`] | Handshake completed |
//! | `inner:close` | [`CloseEvent`] | Transport closed, cleanly or not |
//! | `inner:error` | [`ErrorEvent`] | Connect failure, transport error, unsupported environment |
//! | `inner:heartbeatOvertime` | `null` | Heartbeat exceeded its retry limit |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

// ============================================================================
// ReservedEvent
// ============================================================================

/// Lifecycle event names owned by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReservedEvent {
    /// Transport opened.
    Open,
    /// Transport closed.
    Close,
    /// Transport or environment error.
    Error,
    /// Heartbeat ack not received within the retry limit.
    HeartbeatOvertime,
}

impl ReservedEvent {
    /// All reserved events.
    pub const ALL: [Self; 4] = [
        Self::Open,
        Self::Close,
        Self::Error,
        Self::HeartbeatOvertime,
    ];

    /// Returns the bus name of this event.
    #[inline]
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "inner:open",
            Self::Close => "inner:close",
            Self::Error => "inner:error",
            Self::HeartbeatOvertime => "inner:heartbeatOvertime",
        }
    }

    /// Looks up a reserved event by bus name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|e| e.as_str() == name)
    }

    /// Returns `true` if `name` is reserved.
    #[inline]
    #[must_use]
    pub fn is_reserved(name: &str) -> bool {
        Self::from_name(name).is_some()
    }
}

impl fmt::Display for ReservedEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AsRef<str> for ReservedEvent {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

// ============================================================================
// OpenEvent
// ============================================================================

/// Payload of `inner:open`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenEvent {
    /// URL the transport connected to.
    pub url: String,
    /// Sub-protocol selected by the server, if any.
    pub protocol: Option<String>,
}

impl OpenEvent {
    /// Converts to the bus argument.
    #[must_use]
    pub fn to_value(&self) -> Value {
        json!({ "url": self.url, "protocol": self.protocol })
    }

    /// Parses a bus argument.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        Self::deserialize(value).ok()
    }
}

// ============================================================================
// CloseEvent
// ============================================================================

/// Payload of `inner:close`.
///
/// `code` is `None` when no close frame was exchanged, e.g. the connect
/// attempt failed or the stream ended abruptly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloseEvent {
    /// Close code from the close frame.
    pub code: Option<u16>,
    /// Close reason from the close frame.
    pub reason: String,
    /// Whether a close handshake took place.
    pub was_clean: bool,
}

impl CloseEvent {
    /// Close without a handshake.
    #[inline]
    #[must_use]
    pub fn abnormal() -> Self {
        Self::default()
    }

    /// Converts to the bus argument.
    #[must_use]
    pub fn to_value(&self) -> Value {
        json!({ "code": self.code, "reason": self.reason, "wasClean": self.was_clean })
    }

    /// Parses a bus argument.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        Self::deserialize(value).ok()
    }
}

// ============================================================================
// ErrorEvent
// ============================================================================

/// Classification of an `inner:error` emission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    /// No transport can be constructed in this environment.
    Unsupported,
    /// The opening handshake failed or timed out.
    Connect,
    /// The established transport reported an error.
    Transport,
}

impl ErrorKind {
    /// Returns the wire name.
    #[inline]
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Unsupported => "unsupported",
            Self::Connect => "connect",
            Self::Transport => "transport",
        }
    }
}

/// Payload of `inner:error`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEvent {
    /// What failed.
    pub kind: ErrorKind,
    /// Human-readable cause.
    pub message: String,
}

impl ErrorEvent {
    /// Creates an error payload.
    #[inline]
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Returns `true` for environment failures rather than server/network ones.
    #[inline]
    #[must_use]
    pub fn is_unsupported(&self) -> bool {
        self.kind == ErrorKind::Unsupported
    }

    /// Converts to the bus argument.
    #[must_use]
    pub fn to_value(&self) -> Value {
        json!({ "kind": self.kind.as_str(), "message": self.message })
    }

    /// Parses a bus argument.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        Self::deserialize(value).ok()
    }
}

// ============================================================================
// Tests
// ============================================================================
