//! DDP socket - single-connection message multiplexer over WebSocket.
//!
//! This library keeps one logical connection to a DDP server (Meteor,
//! Rocket.Chat), tags every outbound request with a correlation id and
//! routes each response back to the caller that sent the request.
//!
//! # Architecture
//!
//! - **Controller**: owns the connection lifecycle, handshake, keepalive
//!   answers and the pending-request table, all on one event loop task
//! - **Transport**: duplex text connection behind the [`Transport`] trait
//!   ([`WebSocketTransport`] by default)
//! - **Codec**: wire encoding behind the [`Codec`] trait ([`JsonCodec`])
//!
//! Key design principles:
//!
//! - One [`Controller`] per connection, no global state
//! - Completions are one-shot handles, fulfilled or abandoned exactly once
//! - No call blocks on the network
//! - No built-in timeouts or reconnect policy
//!
//! # Quick Start
//!
//! ```no_run
//! use ddp_socket::{Controller, Result};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let controller = Controller::builder().build()?;
//!
//!     let outcome = controller.connect("ws://localhost:3000/websocket")?.await?;
//!     if !outcome.connected {
//!         return Ok(());
//!     }
//!
//!     let response = controller
//!         .send(&json!({"msg": "method", "method": "public-settings/get", "params": []}))?
//!         .await?;
//!     println!("error: {}", response.is_error());
//!
//!     controller.disconnect()?.await?;
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`controller`] | [`Controller`], handles, options, pending table |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Correlation and session ids |
//! | [`protocol`] | Envelope, codec, response classification |
//! | [`transport`] | Transport trait and WebSocket implementation |

// ============================================================================
// Modules
// ============================================================================

/// Connection controller.
pub mod controller;

/// Error types and result aliases.
pub mod error;

/// Correlation and session identifiers.
pub mod identifiers;

/// Wire protocol types.
pub mod protocol;

/// Transport layer.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Controller types
pub use controller::{
    ConnectHandle, ConnectOutcome, ConnectionState, Controller, ControllerBuilder,
    ControllerOptions, ResponseHandle,
};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{CorrelationId, SessionId};

// Protocol types
pub use protocol::{Codec, Envelope, JsonCodec, SocketResponse};

// Transport types
pub use transport::{EventSink, Transport, TransportEvent, WebSocketTransport};
