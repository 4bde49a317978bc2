//! Error types for the DDP socket.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use ddp_socket::{Controller, Result};
//!
//! async fn example(controller: &Controller) -> Result<()> {
//!     let response = controller.send(&serde_json::json!({"msg": "sub"}))?.await?;
//!     let value = response.into_result()?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`], [`Error::InvalidArgument`] |
//! | Connection | [`Error::Connection`], [`Error::ConnectionClosed`], [`Error::NotReady`], [`Error::Superseded`] |
//! | Protocol | [`Error::Encoding`], [`Error::Decode`], [`Error::Protocol`], [`Error::Application`] |
//! | External | [`Error::Json`], [`Error::WebSocket`] |

// ============================================================================
// Imports
// ============================================================================

use std::result::Result as StdResult;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

use crate::controller::ConnectionState;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// No variant is fatal to the process. Transport failures are reported
/// through connection handles, undecodable frames are logged and dropped.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when controller configuration is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// Invalid argument.
    ///
    /// Returned for unusable addresses or payloads.
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Description of the invalid argument.
        message: String,
    },

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// Transport failure.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// The connection closed before a response arrived.
    ///
    /// A pending request resolved with this error was abandoned: it was
    /// never answered, and never will be.
    #[error("Connection closed")]
    ConnectionClosed,

    /// The controller is not in a state that accepts requests.
    #[error("Connection not ready (state: {state})")]
    NotReady {
        /// State at the time of the call.
        state: ConnectionState,
    },

    /// A connect or disconnect request was replaced by a newer one.
    #[error("Connection request superseded")]
    Superseded,

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// Outbound message could not be encoded.
    #[error("Encoding error: {message}")]
    Encoding {
        /// Description of the encoding failure.
        message: String,
    },

    /// Inbound text could not be decoded into an envelope.
    #[error("Decode error: {message}")]
    Decode {
        /// Description of the decode failure.
        message: String,
    },

    /// Protocol violation or local protocol limit.
    #[error("Protocol error: {message}")]
    Protocol {
        /// Description of the protocol violation.
        message: String,
    },

    /// Response classified as an error by the server.
    #[error("Application error: {message}")]
    Application {
        /// Error description extracted from the response.
        message: String,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// JSON serialization error.
    ///
    /// Produced by [`JsonCodec`](crate::JsonCodec) when a message cannot be
    /// serialized.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    ///
    /// Raised inside [`WebSocketTransport`](crate::WebSocketTransport) and
    /// reported as the reason of the disconnect event.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates an invalid argument error.
    #[inline]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a not-ready error.
    #[inline]
    pub fn not_ready(state: ConnectionState) -> Self {
        Self::NotReady { state }
    }

    /// Creates an encoding error.
    #[inline]
    pub fn encoding(message: impl Into<String>) -> Self {
        Self::Encoding {
            message: message.into(),
        }
    }

    /// Creates a decode error.
    #[inline]
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Creates a protocol error.
    #[inline]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Creates an application error.
    #[inline]
    pub fn application(message: impl Into<String>) -> Self {
        Self::Application {
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. }
                | Self::ConnectionClosed
                | Self::NotReady { .. }
                | Self::WebSocket(_)
        )
    }

    /// Returns `true` if a pending request was abandoned by a closing connection.
    #[inline]
    #[must_use]
    pub fn is_abandoned(&self) -> bool {
        matches!(self, Self::ConnectionClosed)
    }

    /// Returns `true` if an outbound message could not be encoded.
    #[inline]
    #[must_use]
    pub fn is_encoding_error(&self) -> bool {
        matches!(self, Self::Encoding { .. } | Self::Json(_))
    }
}

// ============================================================================
// Tests
// ============================================================================
