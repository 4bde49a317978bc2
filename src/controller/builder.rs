//! Builder pattern for controller configuration.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use ddp_socket::{Controller, WebSocketTransport};
//!
//! # #[tokio::main]
//! # async fn main() -> ddp_socket::Result<()> {
//! let controller = Controller::builder()
//!     .transport(WebSocketTransport::with_connect_timeout(Duration::from_secs(10)))
//!     .max_pending_requests(256)
//!     .build()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use crate::error::Result;
use crate::protocol::{Codec, JsonCodec};
use crate::transport::{Transport, WebSocketTransport};

use super::core::Controller;
use super::options::ControllerOptions;

// ============================================================================
// ControllerBuilder
// ============================================================================

/// Builder for a [`Controller`].
///
/// Use [`Controller::builder()`] to create a new builder. Unset parts
/// default to [`WebSocketTransport`], [`JsonCodec`] and
/// [`ControllerOptions::default`].
#[derive(Default)]
pub struct ControllerBuilder {
    /// Transport adapter.
    transport: Option<Box<dyn Transport>>,
    /// Envelope codec.
    codec: Option<Arc<dyn Codec>>,
    /// Handshake and limits.
    options: ControllerOptions,
}

impl ControllerBuilder {
    /// Creates a builder with defaults.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the transport adapter.
    #[inline]
    #[must_use]
    pub fn transport(mut self, transport: impl Transport) -> Self {
        self.transport = Some(Box::new(transport));
        self
    }

    /// Sets the envelope codec.
    #[inline]
    #[must_use]
    pub fn codec(mut self, codec: impl Codec) -> Self {
        self.codec = Some(Arc::new(codec));
        self
    }

    /// Replaces all options.
    #[inline]
    #[must_use]
    pub fn options(mut self, options: ControllerOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the protocol version requested in the handshake.
    #[inline]
    #[must_use]
    pub fn protocol_version(mut self, version: impl Into<String>) -> Self {
        self.options = self.options.with_protocol_version(version);
        self
    }

    /// Sets the versions advertised in the handshake.
    #[inline]
    #[must_use]
    pub fn supported_versions(
        mut self,
        versions: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.options = self.options.with_supported_versions(versions);
        self
    }

    /// Sets the pending request limit.
    #[inline]
    #[must_use]
    pub fn max_pending_requests(mut self, max: usize) -> Self {
        self.options = self.options.with_max_pending_requests(max);
        self
    }

    /// Validates the configuration and starts the controller.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// [`crate::Error::Config`] if the options are inconsistent.
    pub fn build(self) -> Result<Controller> {
        self.options.validate()?;

        let transport = self
            .transport
            .unwrap_or_else(|| Box::new(WebSocketTransport::new()));
        let codec = self.codec.unwrap_or_else(|| Arc::new(JsonCodec));

        Ok(Controller::spawn(transport, codec, self.options))
    }
}

// ============================================================================
// Tests
// ============================================================================
