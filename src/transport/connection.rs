//! WebSocket connection and event loop.
//!
//! [`Connection::open`] spawns a tokio task that:
//!
//! - Performs the client handshake (bounded by the connect timeout)
//! - Forwards inbound text/binary frames to the [`TransportHandler`]
//! - Writes outbound text frames queued by [`Connection::send_text`]
//! - Reports errors and the final close
//!
//! The handle is cheap to clone. All clones drive the same task.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::SEC_WEBSOCKET_PROTOCOL;
use tracing::{debug, error, info, trace, warn};

use crate::error::{Error, Result};
use crate::identifiers::ConnectionId;
use crate::protocol::{CloseEvent, ErrorEvent, ErrorKind, OpenEvent};

use super::options::ConnectionOptions;
use super::{ListenerGroup, ReadyState, SharedReadyState, TransportHandler};

// ============================================================================
// ConnectionCommand
// ============================================================================

/// Internal commands for the event loop.
enum ConnectionCommand {
    /// Write a text frame.
    Send(String),
    /// Close the socket and stop.
    Shutdown,
}

// ============================================================================
// Connection
// ============================================================================

/// Handle to one live transport task.
#[derive(Clone)]
pub struct Connection {
    /// Generation of this transport within its client.
    id: ConnectionId,
    /// Channel for sending commands to the event loop.
    command_tx: mpsc::UnboundedSender<ConnectionCommand>,
    /// Ready state (shared with event loop).
    state: SharedReadyState,
    /// Notification gate (shared with event loop).
    group: ListenerGroup,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("state", &self.state.get())
            .field("attached", &self.group.is_attached())
            .finish()
    }
}

impl Connection {
    /// Spawns a transport task connecting with `options`.
    ///
    /// Returns immediately in the `Connecting` state. The outcome is reported
    /// through `handler`.
    ///
    /// # Errors
    ///
    /// - [`Error::WebSocket`] if the URL cannot form a client request
    /// - [`Error::Config`] if a sub-protocol is not a valid header value
    pub(crate) fn open(
        id: ConnectionId,
        options: &ConnectionOptions,
        handler: Arc<dyn TransportHandler>,
    ) -> Result<Self> {
        let request = build_request(options)?;
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let state = SharedReadyState::new(ReadyState::Connecting);
        let group = ListenerGroup::new();

        tokio::spawn(run_event_loop(
            id,
            request,
            options.url().to_string(),
            options.connect_timeout(),
            command_rx,
            state.clone(),
            group.clone(),
            handler,
        ));

        debug!(%id, url = %options.url(), "Transport spawned");

        Ok(Self {
            id,
            command_tx,
            state,
            group,
        })
    }

    /// Returns this transport's generation.
    #[inline]
    #[must_use]
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Returns the current ready state.
    #[inline]
    #[must_use]
    pub fn ready_state(&self) -> ReadyState {
        self.state.get()
    }

    /// Queues a text frame.
    ///
    /// # Errors
    ///
    /// - [`Error::NotOpen`] if the transport is not open
    /// - [`Error::ConnectionClosed`] if the event loop has stopped
    pub fn send_text(&self, text: String) -> Result<()> {
        let state = self.state.get();
        if state != ReadyState::Open {
            return Err(Error::not_open(state));
        }

        self.command_tx
            .send(ConnectionCommand::Send(text))
            .map_err(|_| Error::ConnectionClosed)
    }

    /// Stops all further notifications from this transport.
    #[inline]
    pub(crate) fn detach(&self) {
        self.group.detach();
    }

    /// Closes the socket.
    ///
    /// If the listener group is still attached, the close notification is
    /// delivered as usual.
    pub fn shutdown(&self) {
        if matches!(self.state.get(), ReadyState::Connecting | ReadyState::Open) {
            self.state.set(ReadyState::Closing);
        }
        let _ = self.command_tx.send(ConnectionCommand::Shutdown);
    }
}

// ============================================================================
// Request
// ============================================================================

/// Builds the handshake request, offering any configured sub-protocols.
fn build_request(options: &ConnectionOptions) -> Result<Request> {
    let mut request = options.url().as_str().into_client_request()?;

    if !options.sub_protocols().is_empty() {
        let value = HeaderValue::from_str(&options.sub_protocols().join(", "))
            .map_err(|e| Error::config(format!("invalid sub-protocol: {e}")))?;
        request.headers_mut().insert(SEC_WEBSOCKET_PROTOCOL, value);
    }

    Ok(request)
}

// ============================================================================
// Event Loop
// ============================================================================

/// Event loop that handles WebSocket I/O.
#[allow(clippy::too_many_arguments)]
async fn run_event_loop(
    id: ConnectionId,
    request: Request,
    url: String,
    connect_timeout: Duration,
    mut command_rx: mpsc::UnboundedReceiver<ConnectionCommand>,
    state: SharedReadyState,
    group: ListenerGroup,
    handler: Arc<dyn TransportHandler>,
) {
    // Any command before the handshake finishes is a shutdown
    let connected = tokio::select! {
        result = timeout(connect_timeout, connect_async(request)) => result,
        _ = command_rx.recv() => {
            debug!(%id, "Shutdown before handshake completed");
            state.set(ReadyState::Closed);
            if group.is_attached() {
                handler.on_close(CloseEvent::abnormal());
            }
            return;
        }
    };

    let (ws_stream, response) = match connected {
        Ok(Ok(pair)) => pair,
        Ok(Err(e)) => {
            let err = Error::connection(e.to_string());
            warn!(%id, error = %err, "WebSocket handshake failed");
            fail_connect(&state, &group, handler.as_ref(), err.to_string());
            return;
        }
        Err(_) => {
            let err = Error::connection_timeout(connect_timeout.as_millis() as u64);
            warn!(%id, error = %err, "WebSocket handshake timed out");
            fail_connect(&state, &group, handler.as_ref(), err.to_string());
            return;
        }
    };

    let protocol = response
        .headers()
        .get(SEC_WEBSOCKET_PROTOCOL)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    // A shutdown may have raced the handshake
    if state.get() == ReadyState::Closing {
        let mut ws_stream = ws_stream;
        let _ = ws_stream.close(None).await;
        state.set(ReadyState::Closed);
        if group.is_attached() {
            handler.on_close(CloseEvent::abnormal());
        }
        return;
    }

    state.set(ReadyState::Open);
    info!(%id, %url, ?protocol, "WebSocket connection established");

    if group.is_attached() {
        handler.on_open(OpenEvent { url, protocol });
    }

    let (mut ws_write, mut ws_read) = ws_stream.split();

    let close_event = loop {
        tokio::select! {
            // Incoming frames from server
            message = ws_read.next() => {
                match message {
                    Some(Ok(Message::Text(text))) => {
                        trace!(%id, len = text.len(), "Text frame received");
                        if group.is_attached() {
                            handler.on_message(text.as_bytes());
                        }
                    }

                    Some(Ok(Message::Binary(data))) => {
                        trace!(%id, len = data.len(), "Binary frame received");
                        if group.is_attached() {
                            handler.on_message(&data);
                        }
                    }

                    Some(Ok(Message::Close(frame))) => {
                        debug!(%id, ?frame, "WebSocket closed by remote");
                        // The close reply is queued by the read half
                        if let Err(e) = ws_write.flush().await {
                            debug!(%id, error = %e, "Close reply not sent");
                        }
                        break match frame {
                            Some(frame) => CloseEvent {
                                code: Some(u16::from(frame.code)),
                                reason: frame.reason.as_str().to_string(),
                                was_clean: true,
                            },
                            None => CloseEvent {
                                code: None,
                                reason: String::new(),
                                was_clean: true,
                            },
                        };
                    }

                    Some(Err(e)) => {
                        error!(%id, error = %e, "WebSocket error");
                        state.set(ReadyState::Closed);
                        if group.is_attached() {
                            handler.on_error(ErrorEvent::new(ErrorKind::Transport, e.to_string()));
                        }
                        break CloseEvent::abnormal();
                    }

                    None => {
                        debug!(%id, "WebSocket stream ended");
                        break CloseEvent::abnormal();
                    }

                    // Ping/Pong are answered by tungstenite
                    Some(Ok(_)) => {}
                }
            }

            // Commands from the client
            command = command_rx.recv() => {
                match command {
                    Some(ConnectionCommand::Send(text)) => {
                        if let Err(e) = ws_write.send(Message::Text(text.into())).await {
                            warn!(%id, error = %e, "Failed to send frame");
                        }
                    }

                    Some(ConnectionCommand::Shutdown) | None => {
                        debug!(%id, "Shutdown command received");
                        state.set(ReadyState::Closing);
                        let _ = ws_write.close().await;
                        break CloseEvent {
                            code: Some(1000),
                            reason: String::new(),
                            was_clean: true,
                        };
                    }
                }
            }
        }
    };

    state.set(ReadyState::Closed);
    info!(%id, code = ?close_event.code, "WebSocket connection closed");

    if group.is_attached() {
        handler.on_close(close_event);
    }

    debug!(%id, "Event loop terminated");
}

/// Reports a failed handshake as error followed by close.
fn fail_connect(
    state: &SharedReadyState,
    group: &ListenerGroup,
    handler: &dyn TransportHandler,
    message: String,
) {
    state.set(ReadyState::Closed);
    if group.is_attached() {
        handler.on_error(ErrorEvent::new(ErrorKind::Connect, message));
        handler.on_close(CloseEvent::abnormal());
    }
}

// ============================================================================
// Tests
// ============================================================================
