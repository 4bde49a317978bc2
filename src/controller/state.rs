//! Connection state machine.
//!
//! ```text
//! idle ──► connecting ──► ready ──► closing ──► closed
//!              │            │                     ▲
//!              └────────────┴─────────────────────┘
//!                     transport failure
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

// ============================================================================
// ConnectionState
// ============================================================================

/// Lifecycle state of a controller's connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    /// No connection was ever requested.
    #[default]
    Idle,
    /// Transport opening or handshake in flight.
    Connecting,
    /// Handshake acknowledged, requests allowed.
    Ready,
    /// Close requested, waiting for the transport.
    Closing,
    /// Transport closed.
    Closed,
}

impl ConnectionState {
    /// Returns `true` while a transport session is open or opening.
    #[inline]
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Connecting | Self::Ready | Self::Closing)
    }

    /// Returns `true` if application requests may be sent.
    #[inline]
    #[must_use]
    pub const fn accepts_requests(self) -> bool {
        matches!(self, Self::Ready)
    }

    /// Returns the lowercase state name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Ready => "ready",
            Self::Closing => "closing",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Tests
// ============================================================================
