//! Glue between one transport task and the bus.

// ============================================================================
// Imports
// ============================================================================

use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::bus::EventBus;
use crate::error::{Error, Result};
use crate::heartbeat::MessageSink;
use crate::heartbeat::controller::WeakHeartbeat;
use crate::protocol::{CloseEvent, DropReason, ErrorEvent, InboundFrame, OpenEvent, ReservedEvent};
use crate::transport::{Connection, ReadyState, TransportHandler};

// ============================================================================
// TransportSlot
// ============================================================================

/// The client's single transport reference.
///
/// `None` before the first `connect` and after `dispose`.
#[derive(Debug, Default)]
pub(crate) struct TransportSlot(Mutex<Option<Connection>>);

impl TransportSlot {
    /// Installs `connection`, returning the one it replaces.
    pub(crate) fn replace(&self, connection: Connection) -> Option<Connection> {
        self.0.lock().replace(connection)
    }

    /// Releases the current connection.
    pub(crate) fn take(&self) -> Option<Connection> {
        self.0.lock().take()
    }

    /// Clones the current connection handle.
    pub(crate) fn current(&self) -> Option<Connection> {
        self.0.lock().clone()
    }

    /// Ready state of the current transport, `Closed` if there is none.
    pub(crate) fn ready_state(&self) -> ReadyState {
        self.0
            .lock()
            .as_ref()
            .map_or(ReadyState::Closed, Connection::ready_state)
    }
}

impl MessageSink for TransportSlot {
    fn ensure_open(&self) -> Result<()> {
        match self.0.lock().as_ref() {
            None => Err(Error::NotConnected),
            Some(connection) => match connection.ready_state() {
                ReadyState::Open => Ok(()),
                state => Err(Error::not_open(state)),
            },
        }
    }

    fn send_text(&self, text: String) -> Result<()> {
        let connection = self.current().ok_or(Error::NotConnected)?;
        connection.send_text(text)
    }
}

// ============================================================================
// Dispatcher
// ============================================================================

/// Translates transport notifications into bus emissions.
///
/// One dispatcher is built per transport. It holds the heartbeat weakly so a
/// lingering socket task never keeps a dropped client alive.
pub(crate) struct Dispatcher {
    bus: EventBus,
    heartbeat: WeakHeartbeat,
    tag_field: String,
    auto_start_heartbeat: bool,
}

impl Dispatcher {
    pub(crate) fn new(
        bus: EventBus,
        heartbeat: WeakHeartbeat,
        tag_field: impl Into<String>,
        auto_start_heartbeat: bool,
    ) -> Self {
        Self {
            bus,
            heartbeat,
            tag_field: tag_field.into(),
            auto_start_heartbeat,
        }
    }
}

impl TransportHandler for Dispatcher {
    fn on_open(&self, event: OpenEvent) {
        // Internal open hook; runs ahead of caller listeners and cannot be
        // removed through `off`
        if self.auto_start_heartbeat
            && let Some(heartbeat) = self.heartbeat.upgrade()
            && heartbeat.ack_event().is_some()
            && let Err(e) = heartbeat.start(None, None)
        {
            warn!(error = %e, "Heartbeat auto-start failed");
        }

        self.bus.emit(ReservedEvent::Open.as_str(), &event.to_value());
    }

    fn on_message(&self, data: &[u8]) {
        match InboundFrame::decode(data, &self.tag_field) {
            Ok(frame) => {
                trace!(event = %frame.event, "Dispatching inbound frame");
                self.bus.emit(&frame.event, &frame.payload);
            }
            Err(reason @ DropReason::MissingTag { .. }) => {
                debug!(%reason, "Inbound frame dropped");
            }
            Err(reason) => {
                warn!(%reason, "Inbound frame dropped");
            }
        }
    }

    fn on_error(&self, event: ErrorEvent) {
        if let Some(heartbeat) = self.heartbeat.upgrade() {
            heartbeat.halt();
        }
        self.bus.emit(ReservedEvent::Error.as_str(), &event.to_value());
    }

    fn on_close(&self, event: CloseEvent) {
        self.bus.emit(ReservedEvent::Close.as_str(), &event.to_value());
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;
    use std::time::Duration;

    use serde_json::{Value, json};

    use crate::heartbeat::{Heartbeat, HeartbeatOptions, HeartbeatStatus};
    use crate::protocol::ErrorKind;

    fn recorder(bus: &EventBus, name: &str) -> Arc<parking_lot::Mutex<Vec<Value>>> {
        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let s = Arc::clone(&seen);
        bus.on(name, move |v| s.lock().push(v.clone()));
        seen
    }

    fn dispatcher(bus: &EventBus) -> (Dispatcher, Heartbeat) {
        let heartbeat = Heartbeat::new(bus.clone(), Arc::new(TransportSlot::default()));
        let dispatcher = Dispatcher::new(bus.clone(), heartbeat.downgrade(), "kind", true);
        (dispatcher, heartbeat)
    }

    #[test]
    fn test_inbound_frame_emitted_under_tag() {
        let bus = EventBus::new();
        let (dispatcher, _heartbeat) = dispatcher(&bus);
        let seen = recorder(&bus, "greeting");

        dispatcher.on_message(br#"{"kind":"greeting","payload":42}"#);

        assert_eq!(*seen.lock(), vec![json!({ "kind": "greeting", "payload": 42 })]);
    }

    #[test]
    fn test_numeric_tag_is_stringified() {
        let bus = EventBus::new();
        let (dispatcher, _heartbeat) = dispatcher(&bus);
        let seen = recorder(&bus, "7");

        dispatcher.on_message(br#"{"kind":7}"#);
        assert_eq!(seen.lock().len(), 1);
    }

    #[test]
    fn test_unusable_frames_are_dropped() {
        let bus = EventBus::new();
        let (dispatcher, _heartbeat) = dispatcher(&bus);
        let close = recorder(&bus, ReservedEvent::Close.as_str());

        dispatcher.on_message(b"not json");
        dispatcher.on_message(br#"[1, 2]"#);
        dispatcher.on_message(br#"{"payload":1}"#);
        dispatcher.on_message(br#"{"kind":"inner:close"}"#);

        assert!(close.lock().is_empty());
    }

    #[test]
    fn test_lifecycle_translation() {
        let bus = EventBus::new();
        let (dispatcher, _heartbeat) = dispatcher(&bus);
        let open = recorder(&bus, ReservedEvent::Open.as_str());
        let error = recorder(&bus, ReservedEvent::Error.as_str());
        let close = recorder(&bus, ReservedEvent::Close.as_str());

        dispatcher.on_open(OpenEvent {
            url: "ws://localhost/".into(),
            protocol: Some("chat".into()),
        });
        dispatcher.on_error(ErrorEvent::new(ErrorKind::Transport, "reset"));
        dispatcher.on_close(CloseEvent::abnormal());

        let open = OpenEvent::from_value(&open.lock()[0]).expect("open payload");
        assert_eq!(open.protocol.as_deref(), Some("chat"));
        let error = ErrorEvent::from_value(&error.lock()[0]).expect("error payload");
        assert_eq!(error.kind, ErrorKind::Transport);
        let close = CloseEvent::from_value(&close.lock()[0]).expect("close payload");
        assert!(!close.was_clean);
    }

    #[tokio::test]
    async fn test_error_pauses_heartbeat() {
        let bus = EventBus::new();
        let (dispatcher, heartbeat) = dispatcher(&bus);
        heartbeat
            .init(HeartbeatOptions::new(
                json!({ "kind": "ping" }),
                "pong",
                Duration::from_secs(1),
            ))
            .expect("init");

        dispatcher.on_error(ErrorEvent::new(ErrorKind::Transport, "reset"));

        assert_eq!(heartbeat.status(), HeartbeatStatus::Stopped);
        assert!(!heartbeat.snapshot().running);
    }

    #[test]
    fn test_empty_slot_is_not_connected() {
        let slot = TransportSlot::default();
        assert!(matches!(slot.ensure_open(), Err(Error::NotConnected)));
        assert!(matches!(slot.send_text("x".into()), Err(Error::NotConnected)));
        assert_eq!(slot.ready_state(), ReadyState::Closed);
    }
}
