//! Connection controller.
//!
//! Owns one logical connection: its lifecycle, the handshake, keepalive
//! answers and the table of requests awaiting a response.
//!
//! # Connection Lifecycle
//!
//! 1. `Controller::connect` - open the transport (`connecting`)
//! 2. Transport connected - handshake `{"msg":"connect"}` is written
//! 3. `{"msg":"connected"}` received - `ready`, connect handle resolves
//! 4. `Controller::send` - requests routed back by `id`
//! 5. `Controller::disconnect` or transport failure - `closed`
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `builder` | Controller builder |
//! | `core` | Public controller handle |
//! | `event_loop` | Event loop task |
//! | `handles` | Connect and response handles |
//! | `options` | Handshake and limit settings |
//! | `pending` | Pending-request table |
//! | `state` | Connection state machine |

// ============================================================================
// Submodules
// ============================================================================

/// Controller builder.
pub mod builder;

/// Public controller handle.
pub mod core;

/// Event loop task.
mod event_loop;

/// Connect and response handles.
pub mod handles;

/// Controller options.
pub mod options;

/// Pending-request table.
pub mod pending;

/// Connection state.
pub mod state;

#[cfg(test)]
mod tests;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::ControllerBuilder;
pub use self::core::Controller;
pub use handles::{ConnectHandle, ConnectOutcome, ResponseHandle};
pub use options::ControllerOptions;
pub use pending::PendingTable;
pub use state::ConnectionState;
