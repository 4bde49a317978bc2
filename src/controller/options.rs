//! Controller options.
//!
//! # Example
//!
//! ```ignore
//! use ddp_socket::ControllerOptions;
//!
//! let options = ControllerOptions::new()
//!     .with_protocol_version("1")
//!     .with_supported_versions(["1", "pre2", "pre1"])
//!     .with_max_pending_requests(256);
//! ```

// ============================================================================
// Imports
// ============================================================================

use crate::error::{Error, Result};
use crate::protocol::Handshake;

// ============================================================================
// Constants
// ============================================================================

/// Protocol version requested in the handshake.
pub const DEFAULT_PROTOCOL_VERSION: &str = "1";

/// Versions offered in the handshake, most preferred first.
pub const DEFAULT_SUPPORTED_VERSIONS: [&str; 3] = ["1", "pre2", "pre1"];

/// Maximum pending requests before new ones are rejected.
pub const DEFAULT_MAX_PENDING_REQUESTS: usize = 1024;

// ============================================================================
// ControllerOptions
// ============================================================================

/// Handshake and limit settings of a controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerOptions {
    /// Version sent in the handshake.
    pub protocol_version: String,

    /// Versions advertised in the handshake.
    pub supported_versions: Vec<String>,

    /// Upper bound on concurrently pending requests.
    pub max_pending_requests: usize,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl ControllerOptions {
    /// Creates options with the default handshake and limits.
    #[must_use]
    pub fn new() -> Self {
        Self {
            protocol_version: DEFAULT_PROTOCOL_VERSION.to_string(),
            supported_versions: DEFAULT_SUPPORTED_VERSIONS
                .iter()
                .map(|v| (*v).to_string())
                .collect(),
            max_pending_requests: DEFAULT_MAX_PENDING_REQUESTS,
        }
    }

    /// Sets the requested protocol version.
    #[inline]
    #[must_use]
    pub fn with_protocol_version(mut self, version: impl Into<String>) -> Self {
        self.protocol_version = version.into();
        self
    }

    /// Sets the advertised versions.
    #[inline]
    #[must_use]
    pub fn with_supported_versions(
        mut self,
        versions: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.supported_versions = versions.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the pending request limit.
    #[inline]
    #[must_use]
    pub fn with_max_pending_requests(mut self, max: usize) -> Self {
        self.max_pending_requests = max;
        self
    }

    /// Checks the options for consistency.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] if no version is advertised, the requested version
    /// is not among them, or the pending limit is zero.
    pub fn validate(&self) -> Result<()> {
        if self.supported_versions.is_empty() {
            return Err(Error::config("supported versions must not be empty"));
        }

        if !self.supported_versions.contains(&self.protocol_version) {
            return Err(Error::config(format!(
                "protocol version {} is not among supported versions {:?}",
                self.protocol_version, self.supported_versions
            )));
        }

        if self.max_pending_requests == 0 {
            return Err(Error::config("max pending requests must be positive"));
        }

        Ok(())
    }

    /// Builds the handshake message.
    #[must_use]
    pub fn handshake(&self) -> Handshake {
        Handshake::new(
            self.protocol_version.clone(),
            self.supported_versions.clone(),
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
