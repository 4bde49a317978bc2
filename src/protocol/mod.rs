//! Wire protocol types.
//!
//! One JSON object per text frame. The controller interprets four kinds
//! itself; every other message is routed to a pending request by `id`.
//!
//! # Protocol Overview
//!
//! | Message | Direction | Purpose |
//! |---------|-----------|---------|
//! | `{"msg":"connect", "version", "support", "id"}` | Local → Remote | Handshake |
//! | `{"msg":"connected", ...}` | Remote → Local | Handshake acknowledgement |
//! | `{"msg":"ping"}` | Remote → Local | Keepalive probe |
//! | `{"msg":"pong"}` | Local → Remote | Keepalive answer |
//! | `{..., "id"}` | Both | Request and its response |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `codec` | Codec trait and JSON implementation |
//! | `envelope` | Decoded envelope, handshake and pong messages |
//! | `response` | Response delivered to completions, error classification |

// ============================================================================
// Submodules
// ============================================================================

/// Codec trait and JSON implementation.
pub mod codec;

/// Envelope and built-in messages.
pub mod envelope;

/// Responses and error classification.
pub mod response;

// ============================================================================
// Re-exports
// ============================================================================

pub use codec::{Codec, JsonCodec, with_correlation_id};
pub use envelope::{Envelope, Handshake, Pong, kind};
pub use response::{SocketResponse, is_error};
