//! Connection options.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use socket_webox::ConnectionOptions;
//!
//! # fn example() -> socket_webox::Result<()> {
//! let options = ConnectionOptions::new("ws://127.0.0.1:2048/ws/?name=alice", "msgMode")?
//!     .with_sub_protocol("chat.v1")
//!     .with_connect_timeout(Duration::from_secs(5));
//!
//! assert_eq!(options.receive_tag_field(), "msgMode");
//! # Ok(())
//! # }
//! ```
//!
//! Options can also be loaded from JSON:
//!
//! ```json
//! { "url": "ws://127.0.0.1:2048/ws", "receiveTagField": "msgMode", "subProtocols": ["chat.v1"] }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use serde::Deserialize;
use url::Url;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Default timeout for the opening handshake.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// ConnectionOptions
// ============================================================================

/// Where and how to connect, and how to classify inbound frames.
///
/// Fixed for the lifetime of a client; every `connect()` reuses them.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawConnectionOptions")]
pub struct ConnectionOptions {
    url: Url,
    sub_protocols: Vec<String>,
    receive_tag_field: String,
    connect_timeout: Duration,
}

/// Serde shape of [`ConnectionOptions`].
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawConnectionOptions {
    url: String,
    #[serde(default)]
    sub_protocols: Vec<String>,
    receive_tag_field: String,
    connect_timeout_ms: Option<u64>,
}

impl TryFrom<RawConnectionOptions> for ConnectionOptions {
    type Error = Error;

    fn try_from(raw: RawConnectionOptions) -> Result<Self> {
        let mut options = Self::new(&raw.url, raw.receive_tag_field)?;
        options.sub_protocols = raw.sub_protocols;
        if let Some(ms) = raw.connect_timeout_ms {
            options.connect_timeout = Duration::from_millis(ms);
        }
        Ok(options)
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl ConnectionOptions {
    /// Creates options for `url`, dispatching inbound frames by
    /// `receive_tag_field`.
    ///
    /// # Errors
    ///
    /// - [`Error::Url`] if `url` does not parse
    /// - [`Error::Config`] if the scheme is not `ws`/`wss` or the tag field
    ///   is empty
    pub fn new(url: &str, receive_tag_field: impl Into<String>) -> Result<Self> {
        let url = Url::parse(url)?;
        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(Error::config(format!(
                "unsupported URL scheme '{}', expected ws or wss",
                url.scheme()
            )));
        }

        let receive_tag_field = receive_tag_field.into();
        if receive_tag_field.is_empty() {
            return Err(Error::config("receive tag field must not be empty"));
        }

        Ok(Self {
            url,
            sub_protocols: Vec::new(),
            receive_tag_field,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        })
    }

    /// Parses options from a JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if the document is malformed or fails
    /// validation.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl ConnectionOptions {
    /// Adds a sub-protocol to offer during the handshake.
    #[inline]
    #[must_use]
    pub fn with_sub_protocol(mut self, protocol: impl Into<String>) -> Self {
        self.sub_protocols.push(protocol.into());
        self
    }

    /// Replaces the offered sub-protocols.
    #[inline]
    #[must_use]
    pub fn with_sub_protocols<I, S>(mut self, protocols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sub_protocols = protocols.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the handshake timeout.
    #[inline]
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

// ============================================================================
// Accessors
// ============================================================================

impl ConnectionOptions {
    /// Target URL.
    #[inline]
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Offered sub-protocols.
    #[inline]
    #[must_use]
    pub fn sub_protocols(&self) -> &[String] {
        &self.sub_protocols
    }

    /// Property of inbound frames whose value names the event.
    #[inline]
    #[must_use]
    pub fn receive_tag_field(&self) -> &str {
        &self.receive_tag_field
    }

    /// Handshake timeout.
    #[inline]
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_defaults() {
        let options = ConnectionOptions::new("ws://127.0.0.1:2048/ws/", "kind").expect("valid");
        assert_eq!(options.url().as_str(), "ws://127.0.0.1:2048/ws/");
        assert_eq!(options.receive_tag_field(), "kind");
        assert!(options.sub_protocols().is_empty());
        assert_eq!(options.connect_timeout(), DEFAULT_CONNECT_TIMEOUT);
    }

    #[test]
    fn test_rejects_http_scheme() {
        let err = ConnectionOptions::new("http://example.com", "kind").unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn test_rejects_malformed_url() {
        let err = ConnectionOptions::new("::::", "kind").unwrap_err();
        assert!(matches!(err, Error::Url(_)));
    }

    #[test]
    fn test_rejects_empty_tag_field() {
        let err = ConnectionOptions::new("ws://localhost", "").unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn test_builder_methods() {
        let options = ConnectionOptions::new("wss://example.com", "type")
            .expect("valid")
            .with_sub_protocol("a")
            .with_sub_protocol("b")
            .with_connect_timeout(Duration::from_millis(250));

        assert_eq!(options.sub_protocols(), ["a", "b"]);
        assert_eq!(options.connect_timeout(), Duration::from_millis(250));

        let replaced = options.with_sub_protocols(["c"]);
        assert_eq!(replaced.sub_protocols(), ["c"]);
    }

    #[test]
    fn test_from_json() {
        let options = ConnectionOptions::from_json(
            r#"{
                "url": "ws://127.0.0.1:7070/ws/?name=user1",
                "receiveTagField": "msgMode",
                "subProtocols": ["v1"],
                "connectTimeoutMs": 1500
            }"#,
        )
        .expect("parse");

        assert_eq!(options.receive_tag_field(), "msgMode");
        assert_eq!(options.sub_protocols(), ["v1"]);
        assert_eq!(options.connect_timeout(), Duration::from_millis(1500));
    }

    #[test]
    fn test_from_json_validates() {
        let err = ConnectionOptions::from_json(r#"{"url":"ftp://x","receiveTagField":"k"}"#)
            .unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }
}
