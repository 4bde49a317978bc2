//! One-shot completion handles.
//!
//! Both handles are futures over a `oneshot` channel filled by the event
//! loop. Each resolves exactly once.

// ============================================================================
// Imports
// ============================================================================

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use crate::error::{Error, Result};
use crate::identifiers::{CorrelationId, SessionId};
use crate::protocol::SocketResponse;

// ============================================================================
// ConnectOutcome
// ============================================================================

/// Result reported to a connect or disconnect call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectOutcome {
    /// Session the outcome refers to.
    pub session: SessionId,
    /// Whether the connection is up.
    pub connected: bool,
    /// Transport or handshake failure, if any.
    pub error: Option<String>,
}

// ============================================================================
// ConnectHandle
// ============================================================================

/// Resolves when a connect or disconnect call settles.
///
/// Resolves to [`Error::Superseded`] if a later connect or disconnect call
/// replaced this one before it settled.
#[derive(Debug)]
#[must_use = "the handle reports whether the connection came up"]
pub struct ConnectHandle {
    rx: oneshot::Receiver<ConnectOutcome>,
}

impl ConnectHandle {
    pub(crate) fn new(rx: oneshot::Receiver<ConnectOutcome>) -> Self {
        Self { rx }
    }
}

impl Future for ConnectHandle {
    type Output = Result<ConnectOutcome>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|outcome| outcome.map_err(|_| Error::Superseded))
    }
}

// ============================================================================
// ResponseHandle
// ============================================================================

/// Resolves with the response to one request.
///
/// There is no timeout. A request whose connection stays up but never
/// answers stays pending; wrap the handle in `tokio::time::timeout` if
/// needed. If the connection closes first the handle resolves to
/// [`Error::ConnectionClosed`].
#[derive(Debug)]
pub struct ResponseHandle {
    id: CorrelationId,
    rx: oneshot::Receiver<Result<SocketResponse>>,
}

impl ResponseHandle {
    pub(crate) fn new(id: CorrelationId, rx: oneshot::Receiver<Result<SocketResponse>>) -> Self {
        Self { id, rx }
    }

    /// Returns the correlation id of the request.
    #[inline]
    #[must_use]
    pub fn id(&self) -> &CorrelationId {
        &self.id
    }
}

impl Future for ResponseHandle {
    type Output = Result<SocketResponse>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|result| result.unwrap_or(Err(Error::ConnectionClosed)))
    }
}

// ============================================================================
// Tests
// ============================================================================
