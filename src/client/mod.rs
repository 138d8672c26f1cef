//! Connection manager module.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`WebSocketClient`] | Owns the transport, bus and heartbeat |
//! | [`ClientBuilder`] | Fluent configuration builder |
//!
//! # Lifecycle Events
//!
//! | Event | Payload | When |
//! |-------|---------|------|
//! | `inner:open` | [`OpenEvent`](crate::OpenEvent) | Handshake completed |
//! | `inner:error` | [`ErrorEvent`](crate::ErrorEvent) | Unsupported, failed connect, transport error |
//! | `inner:close` | [`CloseEvent`](crate::CloseEvent) | After every close, including a failed connect |
//! | `inner:heartbeatOvertime` | `null` | Retry limit exceeded |

// ============================================================================
// Submodules
// ============================================================================

/// Fluent builder for client configuration.
pub mod builder;

/// Core client implementation.
pub mod core;

/// Transport-to-bus glue.
mod dispatch;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::ClientBuilder;
pub use core::WebSocketClient;
