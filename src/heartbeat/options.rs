//! Heartbeat configuration and status types.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use crate::error::{Error, Result};

// ============================================================================
// HeartbeatOptions
// ============================================================================

/// Caller-supplied heartbeat configuration.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use serde_json::json;
/// use socket_webox::HeartbeatOptions;
///
/// let options = HeartbeatOptions::new(
///     json!({ "msgMode": "heartbeat", "msg": null }),
///     "heartbeat",
///     Duration::from_millis(1500),
/// )
/// .with_retry_limit(1);
///
/// assert!(options.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "RawHeartbeatOptions")]
pub struct HeartbeatOptions {
    /// Payload sent verbatim each round. Must be a JSON object.
    pub message: Value,
    /// Inbound event name that acknowledges a heartbeat.
    pub ack_event: String,
    /// Delay before each send.
    pub interval: Duration,
    /// Ack deadline after each send. `None` reuses `interval`.
    pub wait_interval: Option<Duration>,
    /// Consecutive unanswered rounds tolerated before overtime.
    pub retry_limit: u32,
}

/// Serde shape of [`HeartbeatOptions`].
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawHeartbeatOptions {
    heartbeat_message: Value,
    ack_event_name: String,
    interval_ms: u64,
    wait_interval_ms: Option<u64>,
    #[serde(default)]
    retry_limit: u32,
}

impl From<RawHeartbeatOptions> for HeartbeatOptions {
    fn from(raw: RawHeartbeatOptions) -> Self {
        Self {
            message: raw.heartbeat_message,
            ack_event: raw.ack_event_name,
            interval: Duration::from_millis(raw.interval_ms),
            wait_interval: raw.wait_interval_ms.map(Duration::from_millis),
            retry_limit: raw.retry_limit,
        }
    }
}

impl HeartbeatOptions {
    /// Creates options with no tolerated misses and a symmetric wait.
    #[must_use]
    pub fn new(message: Value, ack_event: impl Into<String>, interval: Duration) -> Self {
        Self {
            message,
            ack_event: ack_event.into(),
            interval,
            wait_interval: None,
            retry_limit: 0,
        }
    }

    /// Sets how many consecutive misses are tolerated.
    #[inline]
    #[must_use]
    pub fn with_retry_limit(mut self, retry_limit: u32) -> Self {
        self.retry_limit = retry_limit;
        self
    }

    /// Sets an ack deadline independent of the send interval.
    #[inline]
    #[must_use]
    pub fn with_wait_interval(mut self, wait_interval: Duration) -> Self {
        self.wait_interval = Some(wait_interval);
        self
    }

    /// Parses options from a JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if the document is malformed.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Checks the options can drive a heartbeat.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if the interval or wait interval is
    /// zero, the message is not a JSON object, or the ack event is empty.
    pub fn validate(&self) -> Result<()> {
        if self.interval.is_zero() {
            return Err(Error::invalid_argument("heartbeat interval must be > 0"));
        }
        if self.wait_interval.is_some_and(|d| d.is_zero()) {
            return Err(Error::invalid_argument("heartbeat wait interval must be > 0"));
        }
        if !self.message.is_object() {
            return Err(Error::invalid_argument("heartbeat message must be a JSON object"));
        }
        if self.ack_event.is_empty() {
            return Err(Error::invalid_argument("heartbeat ack event must not be empty"));
        }
        Ok(())
    }
}

// ============================================================================
// HeartbeatStatus
// ============================================================================

/// Heartbeat state machine status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum HeartbeatStatus {
    /// No configuration.
    #[default]
    Cancelled,
    /// Configured, not running.
    Stopped,
    /// Heartbeat sent, ack pending.
    Waiting,
    /// Ack received this round.
    Acked,
    /// Retry limit exceeded; loop halted.
    Overtime,
}

impl fmt::Display for HeartbeatStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Cancelled => "cancelled",
            Self::Stopped => "stopped",
            Self::Waiting => "waiting",
            Self::Acked => "acked",
            Self::Overtime => "overtime",
        })
    }
}

// ============================================================================
// HeartbeatSnapshot
// ============================================================================

/// Point-in-time view of the heartbeat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeartbeatSnapshot {
    /// Current status.
    pub status: HeartbeatStatus,
    /// Consecutive unanswered rounds.
    pub retry_count: u32,
    /// Tolerated unanswered rounds, if configured.
    pub retry_limit: Option<u32>,
    /// Send interval, if configured.
    pub interval: Option<Duration>,
    /// Effective ack deadline, if configured.
    pub wait_interval: Option<Duration>,
    /// Whether a send or wait timer is pending.
    pub running: bool,
}

// ============================================================================
// Tests
// ============================================================================
