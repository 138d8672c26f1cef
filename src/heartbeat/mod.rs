//! Application-level heartbeat.
//!
//! Detects silent connection death: a configured message is sent every
//! interval, and an inbound frame tagged with the ack event must arrive
//! before the deadline. Too many consecutive misses raise
//! `inner:heartbeatOvertime` on the bus. What to do about it (reconnect,
//! back off, give up) is left to the caller.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `controller` | The [`Heartbeat`] state machine |
//! | `options` | [`HeartbeatOptions`], [`HeartbeatStatus`], [`HeartbeatSnapshot`] |

// ============================================================================
// Submodules
// ============================================================================

/// Heartbeat state machine.
pub mod controller;

/// Heartbeat configuration and status.
pub mod options;

// ============================================================================
// Imports
// ============================================================================

use crate::error::Result;

// ============================================================================
// Re-exports
// ============================================================================

pub use controller::Heartbeat;
pub use options::{HeartbeatOptions, HeartbeatSnapshot, HeartbeatStatus};

// ============================================================================
// MessageSink
// ============================================================================

/// Send capability the heartbeat writes through.
///
/// Implemented by the client over its current transport.
pub trait MessageSink: Send + Sync + 'static {
    /// Succeeds if a transport exists and is open.
    ///
    /// # Errors
    ///
    /// [`Error::NotConnected`](crate::Error::NotConnected) or
    /// [`Error::NotOpen`](crate::Error::NotOpen).
    fn ensure_open(&self) -> Result<()>;

    /// Writes one text frame.
    ///
    /// # Errors
    ///
    /// Fails like [`ensure_open`](Self::ensure_open), or with
    /// [`Error::ConnectionClosed`](crate::Error::ConnectionClosed) if the
    /// transport task has stopped.
    fn send_text(&self, text: String) -> Result<()>;
}
