//! Controller handle.
//!
//! [`Controller`] is a cheap, cloneable handle to one connection's event
//! loop. Every method returns immediately; network results arrive through
//! the returned handles.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, trace};
use url::Url;

use crate::error::{Error, Result};
use crate::identifiers::CorrelationId;
use crate::protocol::{Codec, with_correlation_id};
use crate::transport::Transport;

use super::builder::ControllerBuilder;
use super::event_loop::{ControllerCommand, EventLoop};
use super::handles::{ConnectHandle, ResponseHandle};
use super::options::ControllerOptions;
use super::pending::PendingTable;
use super::state::ConnectionState;

// ============================================================================
// Controller
// ============================================================================

/// Handle to a single multiplexed connection.
///
/// Clones share the same connection. Independent connections need
/// independent controllers; they share no state.
///
/// # Thread Safety
///
/// `Controller` is `Send + Sync`. Calls from many tasks are serialized by
/// the event loop, so concurrent sends never race each other or their
/// responses.
///
/// # Example
///
/// ```ignore
/// let controller = Controller::builder().build()?;
///
/// let outcome = controller.connect("ws://localhost:3000/websocket")?.await?;
/// assert!(outcome.connected);
///
/// let response = controller
///     .send(&json!({"msg": "method", "method": "public-settings/get", "params": []}))?
///     .await?;
/// ```
#[derive(Clone)]
pub struct Controller {
    /// Channel to the event loop.
    command_tx: mpsc::UnboundedSender<ControllerCommand>,
    /// Pending table (shared with event loop).
    pending: Arc<Mutex<PendingTable>>,
    /// Published connection state.
    state_rx: watch::Receiver<ConnectionState>,
    /// Address of the current connection.
    address: Arc<Mutex<Option<Url>>>,
    /// Codec used to build frames on the caller's side.
    codec: Arc<dyn Codec>,
}

impl Controller {
    /// Returns a builder for configuring a controller.
    #[inline]
    #[must_use]
    pub fn builder() -> ControllerBuilder {
        ControllerBuilder::new()
    }

    /// Spawns the event loop and returns its handle.
    ///
    /// Must be called from within a tokio runtime.
    pub(crate) fn spawn(
        transport: Box<dyn Transport>,
        codec: Arc<dyn Codec>,
        options: ControllerOptions,
    ) -> Self {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ConnectionState::Idle);
        let pending = Arc::new(Mutex::new(PendingTable::new(options.max_pending_requests)));
        let address = Arc::new(Mutex::new(None));

        let event_loop = EventLoop::new(
            transport,
            Arc::clone(&codec),
            options,
            Arc::clone(&pending),
            state_tx,
            Arc::clone(&address),
            events_tx,
        );
        tokio::spawn(event_loop.run(command_rx, events_rx));

        Self {
            command_tx,
            pending,
            state_rx,
            address,
            codec,
        }
    }

    // ========================================================================
    // Connection
    // ========================================================================

    /// Connects to a `ws://` or `wss://` address.
    ///
    /// Any current connection is torn down first: its pending requests are
    /// abandoned and an unsettled connect or disconnect handle resolves to
    /// [`Error::Superseded`]. The returned handle resolves once the
    /// handshake is acknowledged (`connected == true`) or the transport
    /// gives up (`connected == false`).
    ///
    /// `wss://` addresses are handed to the transport unchanged. The default
    /// [`WebSocketTransport`](crate::WebSocketTransport) is built without TLS
    /// and reports them as a failed connect; secure connections need a
    /// TLS-capable [`Transport`].
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] if the address is not a WebSocket URL
    /// - [`Error::ConnectionClosed`] if the controller was shut down
    pub fn connect(&self, address: &str) -> Result<ConnectHandle> {
        let address = parse_address(address)?;
        debug!(%address, "Connect requested");

        let (reply, rx) = oneshot::channel();
        self.command(ControllerCommand::Connect { address, reply })?;
        Ok(ConnectHandle::new(rx))
    }

    /// Closes the current connection.
    ///
    /// The handle resolves with `connected == false` once the transport
    /// has closed, or immediately if nothing is connected.
    ///
    /// # Errors
    ///
    /// [`Error::ConnectionClosed`] if the controller was shut down.
    pub fn disconnect(&self) -> Result<ConnectHandle> {
        debug!("Disconnect requested");

        let (reply, rx) = oneshot::channel();
        self.command(ControllerCommand::Disconnect { reply })?;
        Ok(ConnectHandle::new(rx))
    }

    /// Stops the event loop.
    ///
    /// The transport is closed, an unsettled connection handle resolves
    /// with `connected == false` and pending requests are abandoned.
    pub fn shutdown(&self) {
        let _ = self.command_tx.send(ControllerCommand::Shutdown);
    }

    // ========================================================================
    // Messages
    // ========================================================================

    /// Sends a request and returns a handle to its response.
    ///
    /// `payload` must serialize to a JSON object; a fresh correlation id is
    /// written into its `id` field. The completion is registered before the
    /// frame is written. Responses classified as errors are still delivered
    /// as `Ok`; check [`SocketResponse::is_error`](crate::SocketResponse::is_error).
    ///
    /// # Errors
    ///
    /// - [`Error::NotReady`] unless the connection is ready
    /// - [`Error::Protocol`] if the pending request limit is reached
    /// - [`Error::Encoding`] if the payload cannot be encoded
    /// - [`Error::ConnectionClosed`] if the controller was shut down
    pub fn send<T>(&self, payload: &T) -> Result<ResponseHandle>
    where
        T: Serialize + ?Sized,
    {
        self.ensure_ready()?;

        {
            let pending = self.pending.lock();
            if pending.len() >= pending.limit() {
                return Err(Error::protocol(format!(
                    "Too many pending requests: {}/{}",
                    pending.len(),
                    pending.limit()
                )));
            }
        }

        let (id, text) = self.encode(payload)?;
        let (completion, rx) = oneshot::channel();

        self.command(ControllerCommand::Send {
            id: id.clone(),
            text,
            completion: Some(completion),
        })?;

        Ok(ResponseHandle::new(id, rx))
    }

    /// Sends a message without waiting for a response.
    ///
    /// The message still carries a fresh correlation id, which is returned.
    ///
    /// # Errors
    ///
    /// Same as [`Controller::send`], except for the pending limit.
    pub fn send_detached<T>(&self, payload: &T) -> Result<CorrelationId>
    where
        T: Serialize + ?Sized,
    {
        self.ensure_ready()?;

        let (id, text) = self.encode(payload)?;
        self.command(ControllerCommand::Send {
            id: id.clone(),
            text,
            completion: None,
        })?;

        Ok(id)
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Returns the current connection state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    /// Waits until the connection reaches `state`.
    ///
    /// # Errors
    ///
    /// [`Error::ConnectionClosed`] if the event loop stopped first.
    pub async fn wait_for_state(&self, state: ConnectionState) -> Result<()> {
        let mut state_rx = self.state_rx.clone();
        state_rx
            .wait_for(|current| *current == state)
            .await
            .map(|_| ())
            .map_err(|_| Error::ConnectionClosed)
    }

    /// Returns the address of the most recent connect call.
    #[inline]
    #[must_use]
    pub fn address(&self) -> Option<Url> {
        self.address.lock().clone()
    }

    /// Returns the number of requests awaiting a response.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn ensure_ready(&self) -> Result<()> {
        let state = self.state();
        if state.accepts_requests() {
            Ok(())
        } else {
            Err(Error::not_ready(state))
        }
    }

    fn encode<T>(&self, payload: &T) -> Result<(CorrelationId, String)>
    where
        T: Serialize + ?Sized,
    {
        let id = self.codec.new_correlation_id();
        let message = with_correlation_id(payload, Some(&id))?;
        let text = self.codec.encode(&message)?;
        trace!(%id, len = text.len(), "Request encoded");
        Ok((id, text))
    }

    fn command(&self, command: ControllerCommand) -> Result<()> {
        self.command_tx
            .send(command)
            .map_err(|_| Error::ConnectionClosed)
    }
}

impl std::fmt::Debug for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("state", &self.state())
            .field("address", &self.address())
            .field("pending", &self.pending_count())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Parses and checks a WebSocket address.
fn parse_address(address: &str) -> Result<Url> {
    let url = Url::parse(address)
        .map_err(|e| Error::invalid_argument(format!("invalid address {address:?}: {e}")))?;

    match url.scheme() {
        "ws" | "wss" => Ok(url),
        scheme => Err(Error::invalid_argument(format!(
            "unsupported scheme {scheme:?}, expected ws or wss"
        ))),
    }
}
