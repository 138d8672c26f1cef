//! Wire-level message types.
//!
//! This module defines what travels between the transport and the bus.
//!
//! # Protocol Overview
//!
//! | Message | Direction | Purpose |
//! |---------|-----------|---------|
//! | [`InboundFrame`] | Server → Client | Tagged JSON object, redispatched by tag |
//! | Outbound payload | Client → Server | Any `Serialize` value, sent as a text frame |
//! | [`ReservedEvent`] | Client → Bus | Lifecycle notification |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `event` | Reserved lifecycle events and payloads |
//! | `frame` | Inbound frame decoding |

// ============================================================================
// Submodules
// ============================================================================

/// Reserved lifecycle events.
pub mod event;

/// Inbound frame decoding.
pub mod frame;

// ============================================================================
// Re-exports
// ============================================================================

pub use event::{CloseEvent, ErrorEvent, ErrorKind, OpenEvent, ReservedEvent};
pub use frame::{DropReason, InboundFrame};
