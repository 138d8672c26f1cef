//! Type-safe identifiers.
//!
//! Newtype wrappers keep subscription handles and transport generations
//! from being mixed up at compile time.
//!
//! | Type | Issued by | Purpose |
//! |------|-----------|---------|
//! | [`SubscriptionId`] | [`EventBus`](crate::EventBus) | Targets one registration in `off` |
//! | [`ConnectionId`] | [`WebSocketClient`](crate::WebSocketClient) | Tags one transport instance in logs |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

// ============================================================================
// SubscriptionId
// ============================================================================

/// Handle for one event bus registration.
///
/// Returned by `on` and `once`. Closures have no reliable identity in Rust,
/// so this handle is what `off` uses to target a specific registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    /// Wraps a raw value.
    #[inline]
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    /// Allocates the next id from a shared counter.
    #[inline]
    pub(crate) fn next(counter: &AtomicU64) -> Self {
        Self(counter.fetch_add(1, Ordering::Relaxed) + 1)
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

// ============================================================================
// ConnectionId
// ============================================================================

/// Generation number of a transport owned by one client.
///
/// Each `connect()` issues a fresh id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    /// Allocates the next id from a shared counter.
    #[inline]
    pub(crate) fn next(counter: &AtomicU64) -> Self {
        Self(counter.fetch_add(1, Ordering::Relaxed) + 1)
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

// ============================================================================
// Tests
// ============================================================================
