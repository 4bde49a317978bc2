//! Transport adapter contract.
//!
//! A [`Transport`] owns one duplex text connection at a time. Calls into it
//! never block: `open` starts connecting in the background, `write_text`
//! queues a frame, `close` requests a graceful close. Progress comes back
//! as [`TransportEvent`]s pushed through the [`EventSink`] handed to `open`.

// ============================================================================
// Imports
// ============================================================================

use tokio::sync::mpsc;
use tracing::trace;
use url::Url;

use crate::error::Result;
use crate::identifiers::SessionId;

// ============================================================================
// TransportEvent
// ============================================================================

/// Events a transport reports to its controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The connection is open.
    Connected,
    /// The connection closed or failed to open.
    Disconnected {
        /// Failure reason, `None` for a clean close.
        error: Option<String>,
    },
    /// A text frame arrived.
    Text(String),
    /// A transport-level pong arrived.
    Pong,
}

// ============================================================================
// EventSink
// ============================================================================

/// Delivers events of one session to the controller.
///
/// Every `open` receives a sink bound to a new session. Events sent through
/// a sink whose session has been released are discarded by the controller.
#[derive(Debug, Clone)]
pub struct EventSink {
    session: SessionId,
    tx: mpsc::UnboundedSender<(SessionId, TransportEvent)>,
}

impl EventSink {
    /// Creates a sink for `session`.
    #[inline]
    #[must_use]
    pub fn new(session: SessionId, tx: mpsc::UnboundedSender<(SessionId, TransportEvent)>) -> Self {
        Self { session, tx }
    }

    /// Returns the session this sink belongs to.
    #[inline]
    #[must_use]
    pub fn session(&self) -> SessionId {
        self.session
    }

    /// Reports the connection as open.
    pub fn connected(&self) -> bool {
        self.emit(TransportEvent::Connected)
    }

    /// Reports the connection as closed.
    pub fn disconnected(&self, error: Option<String>) -> bool {
        self.emit(TransportEvent::Disconnected { error })
    }

    /// Delivers a text frame.
    pub fn text(&self, text: impl Into<String>) -> bool {
        self.emit(TransportEvent::Text(text.into()))
    }

    /// Reports a pong frame.
    pub fn pong(&self) -> bool {
        self.emit(TransportEvent::Pong)
    }

    /// Sends an event, returning `false` once the controller is gone.
    pub fn emit(&self, event: TransportEvent) -> bool {
        let delivered = self.tx.send((self.session, event)).is_ok();
        if !delivered {
            trace!(session = %self.session, "Controller gone, event dropped");
        }
        delivered
    }
}

// ============================================================================
// Transport
// ============================================================================

/// A duplex text connection driven by the controller.
///
/// All methods are called from the controller's event loop and must return
/// without waiting on the network.
pub trait Transport: Send + 'static {
    /// Starts connecting to `address`.
    ///
    /// Any previous connection must already be released. Exactly one
    /// `Disconnected` event must eventually follow, unless the transport is
    /// released first.
    ///
    /// # Errors
    ///
    /// Returns an error if the attempt cannot be started at all.
    fn open(&mut self, address: &Url, events: EventSink) -> Result<()>;

    /// Queues a text frame.
    ///
    /// # Errors
    ///
    /// [`crate::Error::ConnectionClosed`] if no connection is open.
    fn write_text(&mut self, text: String) -> Result<()>;

    /// Requests a graceful close. A `Disconnected` event follows.
    fn close(&mut self);

    /// Tears the connection down immediately and stops event delivery.
    fn release(&mut self);
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn open(&mut self, address: &Url, events: EventSink) -> Result<()> {
        (**self).open(address, events)
    }

    fn write_text(&mut self, text: String) -> Result<()> {
        (**self).write_text(text)
    }

    fn close(&mut self) {
        (**self).close();
    }

    fn release(&mut self) {
        (**self).release();
    }
}

// ============================================================================
// Tests
// ============================================================================
