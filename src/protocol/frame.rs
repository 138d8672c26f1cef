//! Inbound frame decoding.
//!
//! Every inbound frame must be a JSON object. The property named by the
//! configured tag field carries the event name the frame is dispatched under.
//!
//! # Format
//!
//! With `receive_tag_field = "kind"`:
//!
//! ```json
//! { "kind": "greeting", "payload": 42 }
//! ```
//!
//! is emitted on the bus as event `greeting` with the whole object as the
//! argument.

// ============================================================================
// Imports
// ============================================================================

use serde_json::Value;
use thiserror::Error;

use super::event::ReservedEvent;

// ============================================================================
// DropReason
// ============================================================================

/// Why an inbound frame was not dispatched.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DropReason {
    /// Payload is not valid JSON.
    #[error("frame is not valid JSON: {0}")]
    InvalidJson(String),

    /// Payload is JSON but not an object.
    #[error("frame is not a JSON object")]
    NotAnObject,

    /// Tag field absent, null, empty, or not a string/number.
    #[error("frame has no usable '{field}' tag")]
    MissingTag {
        /// Configured tag field.
        field: String,
    },

    /// Tag value names a reserved lifecycle event.
    #[error("frame tag '{tag}' is reserved")]
    ReservedTag {
        /// Offending tag value.
        tag: String,
    },
}

// ============================================================================
// InboundFrame
// ============================================================================

/// A decoded frame ready for dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundFrame {
    /// Event name taken from the tag field.
    pub event: String,
    /// The whole decoded object.
    pub payload: Value,
}

impl InboundFrame {
    /// Decodes raw frame bytes and extracts the dispatch tag.
    ///
    /// String tags are used as-is; numeric tags are stringified.
    ///
    /// # Errors
    ///
    /// Returns a [`DropReason`] if the frame cannot be dispatched.
    pub fn decode(bytes: &[u8], tag_field: &str) -> Result<Self, DropReason> {
        let payload: Value =
            serde_json::from_slice(bytes).map_err(|e| DropReason::InvalidJson(e.to_string()))?;
        Self::from_value(payload, tag_field)
    }

    /// Extracts the dispatch tag from an already decoded value.
    ///
    /// # Errors
    ///
    /// Returns a [`DropReason`] if the value cannot be dispatched.
    pub fn from_value(payload: Value, tag_field: &str) -> Result<Self, DropReason> {
        let object = payload.as_object().ok_or(DropReason::NotAnObject)?;

        let event = match object.get(tag_field) {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => {
                return Err(DropReason::MissingTag {
                    field: tag_field.to_string(),
                });
            }
        };

        if ReservedEvent::is_reserved(&event) {
            return Err(DropReason::ReservedTag { tag: event });
        }

        Ok(Self { event, payload })
    }
}

// ============================================================================
// Tests
// ============================================================================
