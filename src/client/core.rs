//! WebSocket connection manager.
//!
//! [`WebSocketClient`] owns one transport slot, one [`EventBus`] and one
//! [`Heartbeat`]. Callers only ever see the bus, never the socket.
//!
//! # Example
//!
//! ```no_run
//! use serde_json::json;
//! use socket_webox::{ConnectionOptions, ReservedEvent, WebSocketClient};
//!
//! # async fn example() -> socket_webox::Result<()> {
//! let options = ConnectionOptions::new("ws://127.0.0.1:9001/ws", "kind")?;
//! let client = WebSocketClient::new(options);
//!
//! client.on(ReservedEvent::Open.as_str(), |_| println!("open"))?;
//! client.on("greeting", |frame| println!("greeting: {frame}"))?;
//!
//! client.connect()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::bus::EventBus;
use crate::error::{Error, Result};
use crate::heartbeat::{Heartbeat, HeartbeatOptions, HeartbeatSnapshot, HeartbeatStatus};
use crate::identifiers::{ConnectionId, SubscriptionId};
use crate::protocol::{CloseEvent, ErrorEvent, ErrorKind, ReservedEvent};
use crate::transport::{self, Connection, ConnectionOptions, ReadyState};

use super::builder::ClientBuilder;
use super::dispatch::{Dispatcher, TransportSlot};

// ============================================================================
// Types
// ============================================================================

/// Internal shared state for the client.
pub(crate) struct ClientInner {
    /// Immutable connection options.
    options: ConnectionOptions,
    /// Caller-facing event bus.
    bus: EventBus,
    /// Heartbeat sending through `slot`.
    heartbeat: Heartbeat,
    /// Current transport, if any.
    slot: Arc<TransportSlot>,
    /// Start the heartbeat whenever a transport opens.
    auto_start_heartbeat: bool,
    /// Set once by `dispose`.
    disposed: AtomicBool,
    /// Transport generation counter.
    next_connection: AtomicU64,
}

impl ClientInner {
    /// Detaches, cancels, clears and closes, in that order.
    fn teardown(&self) {
        let previous = self.slot.take();
        if let Some(connection) = &previous {
            connection.detach();
        }
        self.heartbeat.reset();
        self.bus.clear();
        if let Some(connection) = previous {
            connection.shutdown();
        }
    }
}

impl Drop for ClientInner {
    fn drop(&mut self) {
        if !self.disposed.swap(true, Ordering::AcqRel) {
            self.teardown();
        }
    }
}

// ============================================================================
// WebSocketClient
// ============================================================================

/// Manages one logical WebSocket connection.
///
/// Cloning yields another handle to the same client. Dropping the last
/// handle tears the connection down as [`dispose`](Self::dispose) would.
///
/// Operations on a disposed client return [`Error::Disposed`].
#[derive(Clone)]
pub struct WebSocketClient {
    /// Shared inner state.
    pub(crate) inner: Arc<ClientInner>,
}

// ============================================================================
// WebSocketClient - Display
// ============================================================================

impl fmt::Debug for WebSocketClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebSocketClient")
            .field("url", &self.inner.options.url().as_str())
            .field("ready_state", &self.ready_state())
            .field("heartbeat", &self.heartbeat_status())
            .field("disposed", &self.is_disposed())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// WebSocketClient - Constructors
// ============================================================================

impl WebSocketClient {
    /// Creates a client without a heartbeat. Does not connect.
    #[must_use]
    pub fn new(options: ConnectionOptions) -> Self {
        Self::from_parts(options, None, true)
    }

    /// Creates a configuration builder.
    #[inline]
    #[must_use]
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Assembles a client; invalid heartbeat options are logged and leave
    /// the heartbeat unconfigured.
    pub(crate) fn from_parts(
        options: ConnectionOptions,
        heartbeat: Option<HeartbeatOptions>,
        auto_start_heartbeat: bool,
    ) -> Self {
        let bus = EventBus::new();
        let slot = Arc::new(TransportSlot::default());
        let controller = Heartbeat::new(bus.clone(), slot.clone());

        if let Some(heartbeat) = heartbeat {
            // init already logged the rejection
            let _ = controller.init(heartbeat);
        }

        debug!(url = %options.url(), auto_start_heartbeat, "Client created");

        Self {
            inner: Arc::new(ClientInner {
                options,
                bus,
                heartbeat: controller,
                slot,
                auto_start_heartbeat,
                disposed: AtomicBool::new(false),
                next_connection: AtomicU64::new(0),
            }),
        }
    }
}

// ============================================================================
// WebSocketClient - Connection
// ============================================================================

impl WebSocketClient {
    /// Opens a transport, replacing any existing one.
    ///
    /// Returns as soon as the transport task is spawned; the outcome arrives
    /// as `inner:open`, or `inner:error` followed by `inner:close`.
    ///
    /// A replaced transport is silenced before it is closed, so its close
    /// never reaches the bus. Bus listeners and heartbeat configuration
    /// carry over.
    ///
    /// # Errors
    ///
    /// - [`Error::Disposed`] after `dispose`
    /// - [`Error::UnsupportedEnvironment`] if [`transport_supported`](crate::transport_supported)
    ///   is `false`; error and close events are emitted as well
    pub fn connect(&self) -> Result<()> {
        self.ensure_alive("connect")?;

        let url = self.inner.options.url();
        if let Some(err) = transport::unsupported_reason(url) {
            warn!(%url, error = %err, "Transport unavailable");
            let event = ErrorEvent::new(ErrorKind::Unsupported, err.to_string());
            self.inner
                .bus
                .emit(ReservedEvent::Error.as_str(), &event.to_value());
            self.inner
                .bus
                .emit(ReservedEvent::Close.as_str(), &CloseEvent::abnormal().to_value());
            return Err(err);
        }

        // Retire the old transport before the new one can open
        if let Some(previous) = self.inner.slot.take() {
            self.retire(&previous);
        }

        let connection = self.open_transport()?;
        let id = connection.id();
        self.install(connection)?;

        debug!(%id, "Connect started");
        Ok(())
    }

    /// Spawns a new transport dispatching onto this client's bus.
    fn open_transport(&self) -> Result<Connection> {
        let id = ConnectionId::next(&self.inner.next_connection);
        let dispatcher = Dispatcher::new(
            self.inner.bus.clone(),
            self.inner.heartbeat.downgrade(),
            self.inner.options.receive_tag_field(),
            self.inner.auto_start_heartbeat,
        );

        Connection::open(id, &self.inner.options, Arc::new(dispatcher))
    }

    /// Stores `connection` as the current transport.
    ///
    /// If `dispose` ran meanwhile, the transport is closed silently and
    /// [`Error::Disposed`] returned.
    fn install(&self, connection: Connection) -> Result<()> {
        // A concurrent connect may have installed one meanwhile
        if let Some(previous) = self.inner.slot.replace(connection) {
            self.retire(&previous);
        }

        // The disposed flag is set before teardown empties the slot
        if self.is_disposed() {
            if let Some(orphan) = self.inner.slot.take() {
                orphan.detach();
                orphan.shutdown();
                warn!(id = %orphan.id(), "Connect raced dispose, transport closed");
            }
            return Err(Error::Disposed);
        }
        Ok(())
    }

    /// Detaches, pauses the heartbeat and closes a replaced transport.
    fn retire(&self, previous: &Connection) {
        previous.detach();
        self.inner.heartbeat.halt();
        previous.shutdown();
        info!(id = %previous.id(), "Transport replaced");
    }

    /// Serializes `message` and writes it as one text frame.
    ///
    /// Nothing is queued: the write happens only if the transport is open.
    ///
    /// # Errors
    ///
    /// - [`Error::Disposed`] after `dispose`
    /// - [`Error::NotConnected`] before the first `connect`
    /// - [`Error::NotOpen`] while connecting or after close
    /// - [`Error::Json`] if `message` does not serialize
    pub fn send_msg<T>(&self, message: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        self.ensure_alive("send_msg")?;

        let text = serde_json::to_string(message)?;
        let connection = self.inner.slot.current().ok_or_else(|| {
            warn!("send_msg ignored, not connected");
            Error::NotConnected
        })?;

        connection.send_text(text).inspect_err(|e| {
            warn!(id = %connection.id(), error = %e, "send_msg ignored");
        })
    }

    /// Closes the current transport and pauses the heartbeat.
    ///
    /// The close is reported through `inner:close`. The client stays usable
    /// and may `connect` again.
    ///
    /// # Errors
    ///
    /// - [`Error::Disposed`] after `dispose`
    /// - [`Error::NotConnected`] if there is no transport
    pub fn close(&self) -> Result<()> {
        self.ensure_alive("close")?;

        let connection = self.inner.slot.current().ok_or_else(|| {
            warn!("close ignored, not connected");
            Error::NotConnected
        })?;

        self.inner.heartbeat.halt();
        connection.shutdown();
        debug!(id = %connection.id(), "Close requested");
        Ok(())
    }

    /// Tears the client down for good.
    ///
    /// Detaches transport listeners, cancels the heartbeat, clears the bus
    /// and closes the transport. No close event is delivered.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Disposed`] if already disposed.
    pub fn dispose(&self) -> Result<()> {
        if self.inner.disposed.swap(true, Ordering::AcqRel) {
            warn!("dispose ignored, client already disposed");
            return Err(Error::Disposed);
        }

        self.inner.teardown();
        info!(url = %self.inner.options.url(), "Client disposed");
        Ok(())
    }
}

// ============================================================================
// WebSocketClient - Events
// ============================================================================

impl WebSocketClient {
    /// Registers `callback` for event `name`.
    ///
    /// `name` is an inbound tag value or one of the [`ReservedEvent`] names.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Disposed`] after `dispose`.
    pub fn on<F>(&self, name: impl Into<String>, callback: F) -> Result<SubscriptionId>
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.ensure_alive("on")?;
        Ok(self.inner.bus.on(name, callback))
    }

    /// Registers `callback` for the next emission of `name` only.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Disposed`] after `dispose`.
    pub fn once<F>(&self, name: impl Into<String>, callback: F) -> Result<SubscriptionId>
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.ensure_alive("once")?;
        Ok(self.inner.bus.once(name, callback))
    }

    /// Removes one registration of `name`, or all of them when `id` is
    /// `None`. Returns `true` if anything was removed.
    ///
    /// # Errors
    ///
    /// - [`Error::Disposed`] after `dispose`
    /// - [`Error::ProtectedEvent`] if `name` is the heartbeat ack event
    pub fn off(&self, name: &str, id: Option<SubscriptionId>) -> Result<bool> {
        self.ensure_alive("off")?;

        if self.inner.heartbeat.is_ack_event(name) {
            warn!(event = name, "off refused, event is the heartbeat ack");
            return Err(Error::protected_event(name));
        }

        Ok(self.inner.bus.off(name, id))
    }
}

// ============================================================================
// WebSocketClient - Heartbeat
// ============================================================================

impl WebSocketClient {
    /// Configures (or reconfigures) the heartbeat without starting it.
    ///
    /// # Errors
    ///
    /// - [`Error::Disposed`] after `dispose`
    /// - [`Error::InvalidArgument`] if `options` fail validation
    pub fn init_heartbeat(&self, options: HeartbeatOptions) -> Result<()> {
        self.ensure_alive("init_heartbeat")?;
        self.inner.heartbeat.init(options)
    }

    /// Starts the heartbeat, optionally overriding interval and retry limit.
    ///
    /// # Errors
    ///
    /// See [`Heartbeat::start`]; also [`Error::Disposed`] after `dispose`.
    pub fn start_heartbeat(
        &self,
        interval: Option<Duration>,
        retry_limit: Option<u32>,
    ) -> Result<()> {
        self.ensure_alive("start_heartbeat")?;
        self.inner.heartbeat.start(interval, retry_limit)
    }

    /// Stops the heartbeat, keeping its configuration.
    ///
    /// # Errors
    ///
    /// [`Error::Disposed`] or [`Error::HeartbeatNotConfigured`].
    pub fn pause_heartbeat(&self) -> Result<()> {
        self.ensure_alive("pause_heartbeat")?;
        self.inner.heartbeat.pause()
    }

    /// Stops the heartbeat and discards its configuration.
    ///
    /// # Errors
    ///
    /// [`Error::Disposed`] or [`Error::HeartbeatNotConfigured`].
    pub fn cancel_heartbeat(&self) -> Result<()> {
        self.ensure_alive("cancel_heartbeat")?;
        self.inner.heartbeat.cancel()
    }
}

// ============================================================================
// WebSocketClient - Accessors
// ============================================================================

impl WebSocketClient {
    /// Current heartbeat interval, `None` when unconfigured.
    #[inline]
    #[must_use]
    pub fn heartbeat_interval(&self) -> Option<Duration> {
        self.inner.heartbeat.interval()
    }

    #[inline]
    #[must_use]
    pub fn heartbeat_status(&self) -> HeartbeatStatus {
        self.inner.heartbeat.status()
    }

    #[inline]
    #[must_use]
    pub fn heartbeat_snapshot(&self) -> HeartbeatSnapshot {
        self.inner.heartbeat.snapshot()
    }

    /// Ready state of the current transport; `Closed` when there is none.
    #[inline]
    #[must_use]
    pub fn ready_state(&self) -> ReadyState {
        self.inner.slot.ready_state()
    }

    #[inline]
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::Acquire)
    }

    #[inline]
    #[must_use]
    pub fn options(&self) -> &ConnectionOptions {
        &self.inner.options
    }

    /// Refuses `operation` on a disposed client.
    fn ensure_alive(&self, operation: &'static str) -> Result<()> {
        if self.is_disposed() {
            warn!(operation, "Operation on disposed client");
            return Err(Error::Disposed);
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
