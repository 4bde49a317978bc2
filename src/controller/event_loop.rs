//! Controller event loop.
//!
//! One tokio task per controller. It is the only writer of the connection
//! state, the transport, the connection callback and the pending table, so
//! commands and transport events are applied strictly one at a time.
//!
//! # Event Handling
//!
//! | Input | Effect |
//! |-------|--------|
//! | `Connect` | Release old session, open transport, `connecting` |
//! | `Disconnect` | `closing`, request transport close |
//! | `Send` | Register completion, then write frame |
//! | `Connected` | Write handshake |
//! | `Text` `connected` | `ready`, fire connection callback |
//! | `Text` `ping` | Write pong |
//! | `Text` other | Resolve pending request by `id` |
//! | `Disconnected` | `closed`, fire callback, abandon pending requests |

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, trace, warn};
use url::Url;

use crate::error::{Error, Result};
use crate::identifiers::{CorrelationId, SessionId};
use crate::protocol::{Codec, Envelope, Pong, SocketResponse, kind, with_correlation_id};
use crate::transport::{EventSink, Transport, TransportEvent};

use super::handles::ConnectOutcome;
use super::options::ControllerOptions;
use super::pending::{Completion, PendingTable};
use super::state::ConnectionState;

// ============================================================================
// Types
// ============================================================================

/// Transport events tagged with their session.
pub(super) type SessionEvent = (SessionId, TransportEvent);

/// Commands from controller handles.
pub(super) enum ControllerCommand {
    /// Open a new connection, replacing the current one.
    Connect {
        address: Url,
        reply: oneshot::Sender<ConnectOutcome>,
    },
    /// Close the current connection.
    Disconnect {
        reply: oneshot::Sender<ConnectOutcome>,
    },
    /// Write an encoded frame, optionally awaiting its response.
    Send {
        id: CorrelationId,
        text: String,
        completion: Option<Completion>,
    },
    /// Stop the loop.
    Shutdown,
}

// ============================================================================
// EventLoop
// ============================================================================

/// State owned by the event loop task.
pub(super) struct EventLoop {
    transport: Box<dyn Transport>,
    codec: Arc<dyn Codec>,
    options: ControllerOptions,
    pending: Arc<Mutex<PendingTable>>,
    state_tx: watch::Sender<ConnectionState>,
    address: Arc<Mutex<Option<Url>>>,
    events_tx: mpsc::UnboundedSender<SessionEvent>,
    session: SessionId,
    connection_callback: Option<oneshot::Sender<ConnectOutcome>>,
}

impl EventLoop {
    pub(super) fn new(
        transport: Box<dyn Transport>,
        codec: Arc<dyn Codec>,
        options: ControllerOptions,
        pending: Arc<Mutex<PendingTable>>,
        state_tx: watch::Sender<ConnectionState>,
        address: Arc<Mutex<Option<Url>>>,
        events_tx: mpsc::UnboundedSender<SessionEvent>,
    ) -> Self {
        Self {
            transport,
            codec,
            options,
            pending,
            state_tx,
            address,
            events_tx,
            session: SessionId::default(),
            connection_callback: None,
        }
    }

    /// Runs until shutdown or until every controller handle is dropped.
    pub(super) async fn run(
        mut self,
        mut command_rx: mpsc::UnboundedReceiver<ControllerCommand>,
        mut events_rx: mpsc::UnboundedReceiver<SessionEvent>,
    ) {
        loop {
            tokio::select! {
                command = command_rx.recv() => match command {
                    Some(ControllerCommand::Shutdown) => {
                        debug!("Shutdown command received");
                        break;
                    }
                    Some(command) => self.handle_command(command),
                    None => {
                        debug!("Command channel closed");
                        break;
                    }
                },

                Some((session, event)) = events_rx.recv() => {
                    self.handle_event(session, event);
                }
            }
        }

        self.teardown();
        debug!("Event loop terminated");
    }

    // ========================================================================
    // Commands
    // ========================================================================

    fn handle_command(&mut self, command: ControllerCommand) {
        match command {
            ControllerCommand::Connect { address, reply } => self.connect(address, reply),
            ControllerCommand::Disconnect { reply } => self.disconnect(reply),
            ControllerCommand::Send {
                id,
                text,
                completion,
            } => self.send(id, text, completion),
            ControllerCommand::Shutdown => {}
        }
    }

    fn connect(&mut self, address: Url, reply: oneshot::Sender<ConnectOutcome>) {
        let previous = self.state();
        if previous.is_active() {
            debug!(session = %self.session, state = %previous, "Replacing current connection");
        }

        // Old session: stop its events, drop its callback unfired
        self.transport.release();
        self.pending.lock().abandon_all();
        self.connection_callback = None;

        self.session = self.session.next();
        *self.address.lock() = Some(address.clone());
        self.connection_callback = Some(reply);
        self.set_state(ConnectionState::Connecting);

        debug!(session = %self.session, %address, "Opening transport");

        let sink = EventSink::new(self.session, self.events_tx.clone());
        if let Err(e) = self.transport.open(&address, sink) {
            warn!(session = %self.session, error = %e, "Transport failed to open");
            self.set_state(ConnectionState::Closed);
            self.fire_callback(false, Some(e.to_string()));
        }
    }

    fn disconnect(&mut self, reply: oneshot::Sender<ConnectOutcome>) {
        let state = self.state();
        if !state.is_active() {
            let _ = reply.send(self.outcome(false, None));
            return;
        }

        self.connection_callback = Some(reply);
        self.set_state(ConnectionState::Closing);
        self.transport.close();
    }

    fn send(&mut self, id: CorrelationId, text: String, completion: Option<Completion>) {
        let state = self.state();
        if !state.accepts_requests() {
            trace!(%id, %state, "Send rejected");
            if let Some(completion) = completion {
                let _ = completion.send(Err(Error::not_ready(state)));
            }
            return;
        }

        // Register before writing: the answer can only follow the write
        let registered = match completion {
            Some(completion) => {
                if !self.pending.lock().register(id.clone(), completion) {
                    return;
                }
                true
            }
            None => false,
        };

        trace!(session = %self.session, %id, "Sending request");

        if let Err(e) = self.transport.write_text(text) {
            warn!(session = %self.session, %id, error = %e, "Write failed");
            if registered {
                self.pending.lock().fail(&id, e);
            }
        }
    }

    // ========================================================================
    // Transport Events
    // ========================================================================

    fn handle_event(&mut self, session: SessionId, event: TransportEvent) {
        if session != self.session {
            trace!(%session, current = %self.session, "Stale session event discarded");
            return;
        }

        match event {
            TransportEvent::Connected => self.on_connected(),
            TransportEvent::Disconnected { error } => self.on_disconnected(error),
            TransportEvent::Text(text) => self.on_text(&text),
            TransportEvent::Pong => debug!(%session, "Pong received"),
        }
    }

    fn on_connected(&mut self) {
        if self.state() != ConnectionState::Connecting {
            debug!(session = %self.session, state = %self.state(), "Connected event ignored");
            return;
        }

        debug!(session = %self.session, "Transport connected, sending handshake");

        let handshake = self.options.handshake();
        let id = self.codec.new_correlation_id();
        if let Err(e) = self.write_message(&handshake, Some(&id)) {
            warn!(session = %self.session, error = %e, "Handshake not sent");
        }
    }

    fn on_disconnected(&mut self, error: Option<String>) {
        if self.state() == ConnectionState::Closed {
            trace!(session = %self.session, "Repeated disconnect ignored");
            return;
        }

        debug!(session = %self.session, ?error, "Transport disconnected");

        self.transport.release();
        self.set_state(ConnectionState::Closed);
        self.fire_callback(false, error);
        self.pending.lock().abandon_all();
    }

    fn on_text(&mut self, text: &str) {
        let envelope = match self.codec.decode(text) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(session = %self.session, error = %e, "Discarding undecodable frame");
                return;
            }
        };

        trace!(session = %self.session, kind = ?envelope.kind(), "Frame received");

        match envelope.kind() {
            Some(kind::CONNECTED) => self.on_handshake_ack(),
            Some(kind::PING) => self.on_ping(&envelope),
            Some(kind::FAILED) if self.state() == ConnectionState::Connecting => {
                self.on_handshake_rejected(&envelope);
            }
            _ => self.route_response(envelope),
        }
    }

    fn on_handshake_ack(&mut self) {
        if self.state() != ConnectionState::Connecting {
            debug!(
                session = %self.session,
                state = %self.state(),
                "Unexpected handshake ack ignored"
            );
            return;
        }

        debug!(session = %self.session, "Handshake acknowledged");
        self.set_state(ConnectionState::Ready);
        self.fire_callback(true, None);
    }

    fn on_handshake_rejected(&mut self, envelope: &Envelope) {
        let suggested = envelope
            .get("version")
            .and_then(|v| v.as_str())
            .unwrap_or("none");

        warn!(session = %self.session, suggested, "Handshake rejected");

        self.fire_callback(
            false,
            Some(format!("handshake rejected, server suggests version {suggested}")),
        );
        self.set_state(ConnectionState::Closing);
        self.transport.close();
    }

    fn on_ping(&mut self, ping: &Envelope) {
        if let Err(e) = self.write_message(&Pong::answering(ping), None) {
            warn!(session = %self.session, error = %e, "Pong not sent");
        }
    }

    fn route_response(&mut self, envelope: Envelope) {
        let Some(id) = envelope.correlation_id() else {
            trace!(session = %self.session, kind = ?envelope.kind(), "Frame without id ignored");
            return;
        };

        let response = SocketResponse::new(envelope, self.session);
        if !self.pending.lock().resolve(&id, response) {
            trace!(session = %self.session, %id, "No pending request for id");
        }
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn write_message<T>(&mut self, message: &T, id: Option<&CorrelationId>) -> Result<()>
    where
        T: Serialize,
    {
        let value = with_correlation_id(message, id)?;
        let text = self.codec.encode(&value)?;
        self.transport.write_text(text)
    }

    fn state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    fn set_state(&self, state: ConnectionState) {
        let previous = self.state_tx.send_replace(state);
        if previous != state {
            debug!(session = %self.session, from = %previous, to = %state, "State changed");
        }
    }

    fn outcome(&self, connected: bool, error: Option<String>) -> ConnectOutcome {
        ConnectOutcome {
            session: self.session,
            connected,
            error,
        }
    }

    /// Fires and clears the pending connection callback.
    fn fire_callback(&mut self, connected: bool, error: Option<String>) {
        if let Some(callback) = self.connection_callback.take() {
            let _ = callback.send(self.outcome(connected, error));
        }
    }

    fn teardown(&mut self) {
        if self.state().is_active() {
            self.transport.close();
        }
        self.transport.release();
        self.set_state(ConnectionState::Closed);
        self.fire_callback(false, None);
        self.pending.lock().abandon_all();
    }
}
