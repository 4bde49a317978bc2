//! Transport layer.
//!
//! The controller talks to the network only through the [`Transport`]
//! trait. Events flow back over a channel into the controller's event
//! loop, which is the single place where connection state changes.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐   open / write_text / close   ┌──────────────────┐
//! │   Controller     │──────────────────────────────►│    Transport     │
//! │   event loop     │                               │  (socket task)   │
//! │                  │◄──────────────────────────────│                  │
//! └──────────────────┘   EventSink: (session, event) └──────────────────┘
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `adapter` | Transport trait, events and sink |
//! | `websocket` | tokio-tungstenite implementation |

// ============================================================================
// Submodules
// ============================================================================

/// Transport trait, events and sink.
pub mod adapter;

/// WebSocket transport.
pub mod websocket;

// ============================================================================
// Re-exports
// ============================================================================

pub use adapter::{EventSink, Transport, TransportEvent};
pub use websocket::{DEFAULT_CONNECT_TIMEOUT, WebSocketTransport};
