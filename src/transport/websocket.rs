//! WebSocket transport.
//!
//! Each `open` spawns one tokio task that owns the socket. Outbound frames
//! reach it through an unbounded channel; inbound frames and lifecycle
//! changes leave it through the [`EventSink`].
//!
//! # Socket Task
//!
//! ```text
//! connect (with timeout) ──► Connected
//!        │
//!        ▼
//! select! { socket frame ──► Text / Pong
//!           outbound     ──► write / close }
//!        │
//!        ▼
//! Disconnected(error)
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, trace, warn};
use url::Url;

use crate::error::{Error, Result};

use super::adapter::{EventSink, Transport};

// ============================================================================
// Constants
// ============================================================================

/// Default timeout for the TCP + WebSocket handshake.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// Types
// ============================================================================

/// Commands for the socket task.
enum Outbound {
    /// Write a text frame.
    Text(String),
    /// Close gracefully.
    Close,
}

// ============================================================================
// WebSocketTransport
// ============================================================================

/// [`Transport`] over `tokio-tungstenite`.
///
/// Must be used from within a tokio runtime.
#[derive(Debug)]
pub struct WebSocketTransport {
    /// Timeout for establishing the connection.
    connect_timeout: Duration,
    /// Channel to the socket task of the current connection.
    outbound: Option<mpsc::UnboundedSender<Outbound>>,
    /// Socket task of the current connection.
    task: Option<JoinHandle<()>>,
}

impl Default for WebSocketTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl WebSocketTransport {
    /// Creates a transport with the default connect timeout.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::with_connect_timeout(DEFAULT_CONNECT_TIMEOUT)
    }

    /// Creates a transport with a custom connect timeout.
    #[inline]
    #[must_use]
    pub fn with_connect_timeout(connect_timeout: Duration) -> Self {
        Self {
            connect_timeout,
            outbound: None,
            task: None,
        }
    }

    /// Returns the connect timeout.
    #[inline]
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Socket task: connect, pump frames, report the close.
    async fn run_socket(
        address: Url,
        mut outbound: mpsc::UnboundedReceiver<Outbound>,
        events: EventSink,
        connect_timeout: Duration,
    ) {
        let session = events.session();
        let connect = timeout(connect_timeout, connect_async(address.as_str()));
        tokio::pin!(connect);

        let stream = loop {
            tokio::select! {
                result = &mut connect => match result {
                    Ok(Ok((stream, _response))) => break stream,
                    Ok(Err(e)) => {
                        let e = Error::from(e);
                        warn!(%session, %address, error = %e, "WebSocket connect failed");
                        events.disconnected(Some(e.to_string()));
                        return;
                    }
                    Err(_) => {
                        let ms = connect_timeout.as_millis();
                        let e = Error::connection(format!("connect timed out after {ms}ms"));
                        warn!(%session, %address, error = %e, "WebSocket connect timed out");
                        events.disconnected(Some(e.to_string()));
                        return;
                    }
                },

                command = outbound.recv() => match command {
                    Some(Outbound::Text(_)) => {
                        warn!(%session, "Frame written before connect, dropped");
                    }
                    Some(Outbound::Close) | None => {
                        debug!(%session, "Connect aborted by close");
                        events.disconnected(None);
                        return;
                    }
                },
            }
        };

        debug!(%session, %address, "WebSocket connected");
        events.connected();

        let (mut ws_write, mut ws_read) = stream.split();

        let error = loop {
            tokio::select! {
                message = ws_read.next() => match message {
                    Some(Ok(Message::Text(text))) => {
                        trace!(%session, len = text.len(), "Text frame received");
                        events.text(text.as_str());
                    }

                    Some(Ok(Message::Binary(data))) => {
                        debug!(%session, len = data.len(), "Binary frame ignored");
                    }

                    Some(Ok(Message::Pong(_))) => {
                        events.pong();
                    }

                    Some(Ok(Message::Close(frame))) => {
                        debug!(%session, ?frame, "WebSocket closed by remote");
                        break None;
                    }

                    // Pings are answered by tungstenite
                    Some(Ok(_)) => {}

                    Some(Err(e)) => {
                        let e = Error::from(e);
                        error!(%session, error = %e, "WebSocket error");
                        break Some(e.to_string());
                    }

                    None => {
                        debug!(%session, "WebSocket stream ended");
                        break None;
                    }
                },

                command = outbound.recv() => match command {
                    Some(Outbound::Text(text)) => {
                        if let Err(e) = ws_write.send(Message::Text(text.into())).await {
                            let e = Error::from(e);
                            error!(%session, error = %e, "WebSocket write failed");
                            break Some(e.to_string());
                        }
                    }

                    Some(Outbound::Close) | None => {
                        debug!(%session, "Closing WebSocket");
                        let _ = ws_write.close().await;
                        break None;
                    }
                },
            }
        };

        events.disconnected(error);
    }
}

impl Transport for WebSocketTransport {
    fn open(&mut self, address: &Url, events: EventSink) -> Result<()> {
        self.release();

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        self.outbound = Some(outbound_tx);
        self.task = Some(tokio::spawn(Self::run_socket(
            address.clone(),
            outbound_rx,
            events,
            self.connect_timeout,
        )));

        Ok(())
    }

    fn write_text(&mut self, text: String) -> Result<()> {
        let outbound = self.outbound.as_ref().ok_or(Error::ConnectionClosed)?;
        outbound
            .send(Outbound::Text(text))
            .map_err(|_| Error::ConnectionClosed)
    }

    fn close(&mut self) {
        if let Some(outbound) = self.outbound.take() {
            let _ = outbound.send(Outbound::Close);
        }
        // Detach: the task finishes the close and reports it
        self.task = None;
    }

    fn release(&mut self) {
        self.outbound = None;
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for WebSocketTransport {
    fn drop(&mut self) {
        self.release();
    }
}

// ============================================================================
// Tests
// ============================================================================
