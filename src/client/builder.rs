//! Builder pattern for client configuration.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use serde_json::json;
//! use socket_webox::{HeartbeatOptions, WebSocketClient};
//!
//! # fn example() -> socket_webox::Result<()> {
//! let client = WebSocketClient::builder()
//!     .url("ws://127.0.0.1:9001/ws")
//!     .receive_tag_field("msgMode")
//!     .heartbeat(
//!         HeartbeatOptions::new(
//!             json!({ "msgMode": "heartbeat", "msg": null }),
//!             "heartbeat",
//!             Duration::from_millis(1500),
//!         )
//!         .with_retry_limit(1),
//!     )
//!     .build()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use crate::error::{Error, Result};
use crate::heartbeat::HeartbeatOptions;
use crate::transport::ConnectionOptions;

use super::core::WebSocketClient;

// ============================================================================
// ClientBuilder
// ============================================================================

/// Builder for configuring a [`WebSocketClient`].
///
/// Use [`WebSocketClient::builder()`] to create a new builder.
#[derive(Debug, Clone)]
pub struct ClientBuilder {
    /// Server URL.
    url: Option<String>,
    /// Inbound dispatch key.
    receive_tag_field: Option<String>,
    /// Offered sub-protocols.
    sub_protocols: Vec<String>,
    /// Handshake bound.
    connect_timeout: Option<Duration>,
    /// Ready-made options, overriding the fields above.
    options: Option<ConnectionOptions>,
    /// Heartbeat configuration.
    heartbeat: Option<HeartbeatOptions>,
    /// Start the heartbeat on every open.
    auto_start_heartbeat: bool,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self {
            url: None,
            receive_tag_field: None,
            sub_protocols: Vec::new(),
            connect_timeout: None,
            options: None,
            heartbeat: None,
            auto_start_heartbeat: true,
        }
    }
}

// ============================================================================
// ClientBuilder Implementation
// ============================================================================

impl ClientBuilder {
    /// Creates a builder with no configuration and auto-start on.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the server URL (`ws://` or `wss://`).
    #[inline]
    #[must_use]
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Sets the inbound property used as the event name.
    #[inline]
    #[must_use]
    pub fn receive_tag_field(mut self, field: impl Into<String>) -> Self {
        self.receive_tag_field = Some(field.into());
        self
    }

    /// Adds a sub-protocol to offer during the handshake.
    #[inline]
    #[must_use]
    pub fn sub_protocol(mut self, protocol: impl Into<String>) -> Self {
        self.sub_protocols.push(protocol.into());
        self
    }

    /// Bounds the opening handshake.
    #[inline]
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Uses prebuilt connection options, ignoring `url`,
    /// `receive_tag_field`, `sub_protocol` and `connect_timeout`.
    #[inline]
    #[must_use]
    pub fn options(mut self, options: ConnectionOptions) -> Self {
        self.options = Some(options);
        self
    }

    /// Configures the heartbeat.
    #[inline]
    #[must_use]
    pub fn heartbeat(mut self, options: HeartbeatOptions) -> Self {
        self.heartbeat = Some(options);
        self
    }

    /// Whether the heartbeat starts every time a transport opens.
    ///
    /// Defaults to `true`.
    #[inline]
    #[must_use]
    pub fn auto_start_heartbeat(mut self, enabled: bool) -> Self {
        self.auto_start_heartbeat = enabled;
        self
    }

    /// Builds the client. Does not connect.
    ///
    /// Invalid heartbeat options are logged and leave the heartbeat
    /// unconfigured; they do not fail the build.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the URL or tag field is missing, the scheme is
    ///   not `ws`/`wss`, or the tag field is empty
    /// - [`Error::Url`] if the URL does not parse
    pub fn build(self) -> Result<WebSocketClient> {
        let options = self.resolve_options()?;
        Ok(WebSocketClient::from_parts(
            options,
            self.heartbeat,
            self.auto_start_heartbeat,
        ))
    }
}

// ============================================================================
// Validation
// ============================================================================

impl ClientBuilder {
    /// Produces connection options from the prebuilt value or the fields.
    fn resolve_options(&self) -> Result<ConnectionOptions> {
        if let Some(options) = &self.options {
            return Ok(options.clone());
        }

        let url = self.url.as_deref().ok_or_else(|| {
            Error::config(
                "WebSocket URL is required. Use .url() to set it.\n\
                 Example: WebSocketClient::builder().url(\"ws://127.0.0.1:9001/ws\")",
            )
        })?;
        let field = self.receive_tag_field.clone().ok_or_else(|| {
            Error::config(
                "Receive tag field is required. Use .receive_tag_field() to set it.\n\
                 Example: WebSocketClient::builder().receive_tag_field(\"kind\")",
            )
        })?;

        let mut options =
            ConnectionOptions::new(url, field)?.with_sub_protocols(self.sub_protocols.clone());
        if let Some(timeout) = self.connect_timeout {
            options = options.with_connect_timeout(timeout);
        }
        Ok(options)
    }
}

// ============================================================================
// Tests
// ============================================================================
