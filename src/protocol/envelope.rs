//! Envelope and built-in message types.
//!
//! An [`Envelope`] is the decoded form of one wire frame. Only a few
//! top-level fields are interpreted; everything else is payload.
//!
//! # Format
//!
//! ```json
//! { "msg": "result", "id": "5f0c...", "result": { ... } }
//! ```

// ============================================================================
// Imports
// ============================================================================

use serde::Serialize;
use serde_json::{Map, Value};

use crate::identifiers::CorrelationId;

// ============================================================================
// Field Names
// ============================================================================

/// Field carrying the message kind.
pub const KIND_FIELD: &str = "msg";

/// Field carrying the correlation id.
pub const ID_FIELD: &str = "id";

/// Field signalling an application error.
pub const ERROR_FIELD: &str = "error";

// ============================================================================
// MessageKind
// ============================================================================

/// Message kinds the controller interprets itself.
pub mod kind {
    /// Outbound handshake.
    pub const CONNECT: &str = "connect";
    /// Handshake acknowledgement.
    pub const CONNECTED: &str = "connected";
    /// Handshake rejection.
    pub const FAILED: &str = "failed";
    /// Keepalive probe from the server.
    pub const PING: &str = "ping";
    /// Keepalive answer.
    pub const PONG: &str = "pong";
    /// Error response.
    pub const ERROR: &str = "error";
}

// ============================================================================
// Envelope
// ============================================================================

/// A decoded wire message.
///
/// Always a JSON object at the top level.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    fields: Map<String, Value>,
}

impl Envelope {
    /// Wraps a JSON object.
    #[inline]
    #[must_use]
    pub fn new(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    /// Returns the message kind (`msg` field), if it is a string.
    #[inline]
    #[must_use]
    pub fn kind(&self) -> Option<&str> {
        self.fields.get(KIND_FIELD).and_then(Value::as_str)
    }

    /// Returns the correlation id (`id` field), if it is a string.
    #[must_use]
    pub fn correlation_id(&self) -> Option<CorrelationId> {
        self.fields
            .get(ID_FIELD)
            .and_then(Value::as_str)
            .map(CorrelationId::new)
    }

    /// Returns the raw error field, ignoring an explicit `null`.
    #[inline]
    #[must_use]
    pub fn error_field(&self) -> Option<&Value> {
        self.fields.get(ERROR_FIELD).filter(|v| !v.is_null())
    }

    /// Returns a top-level field.
    #[inline]
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Returns all top-level fields.
    #[inline]
    #[must_use]
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Converts into a JSON value.
    #[inline]
    #[must_use]
    pub fn into_value(self) -> Value {
        Value::Object(self.fields)
    }
}

// ============================================================================
// Handshake
// ============================================================================

/// Handshake sent as soon as the transport reports connected.
///
/// ```json
/// { "msg": "connect", "version": "1", "support": ["1", "pre2", "pre1"] }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Handshake {
    msg: &'static str,
    /// Protocol version requested.
    pub version: String,
    /// Versions this client accepts.
    pub support: Vec<String>,
}

impl Handshake {
    /// Creates a handshake message.
    #[must_use]
    pub fn new(version: impl Into<String>, support: Vec<String>) -> Self {
        Self {
            msg: kind::CONNECT,
            version: version.into(),
            support,
        }
    }
}

// ============================================================================
// Pong
// ============================================================================

/// Reply to a server ping.
///
/// Echoes the ping's id when one was present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Pong {
    msg: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<String>,
}

impl Pong {
    /// Creates a pong answering `ping`.
    #[must_use]
    pub fn answering(ping: &Envelope) -> Self {
        Self {
            msg: kind::PONG,
            id: ping
                .get(ID_FIELD)
                .and_then(Value::as_str)
                .map(str::to_owned),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
