//! Pending-request table.
//!
//! Maps correlation ids to one-shot completions. An entry leaves the table
//! in exactly one of two ways:
//!
//! - **fulfilled** by the response carrying its id ([`PendingTable::resolve`])
//! - **abandoned** when its connection goes away ([`PendingTable::abandon_all`]),
//!   which completes it with [`Error::ConnectionClosed`]

// ============================================================================
// Imports
// ============================================================================

use std::collections::hash_map::Entry;

use rustc_hash::FxHashMap;
use tokio::sync::oneshot;
use tracing::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::identifiers::CorrelationId;
use crate::protocol::SocketResponse;

// ============================================================================
// Types
// ============================================================================

/// Completion channel of one request.
pub type Completion = oneshot::Sender<Result<SocketResponse>>;

// ============================================================================
// PendingTable
// ============================================================================

/// Open requests keyed by correlation id.
#[derive(Debug)]
pub struct PendingTable {
    entries: FxHashMap<CorrelationId, Completion>,
    limit: usize,
}

impl PendingTable {
    /// Creates an empty table holding at most `limit` entries.
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self {
            entries: FxHashMap::default(),
            limit,
        }
    }

    /// Registers a completion under `id`.
    ///
    /// Returns `false` if the table is full or `id` is already pending; the
    /// completion is then failed with [`Error::Protocol`].
    pub fn register(&mut self, id: CorrelationId, completion: Completion) -> bool {
        if self.entries.len() >= self.limit {
            warn!(
                pending = self.entries.len(),
                max = self.limit,
                "Too many pending requests"
            );
            let _ = completion.send(Err(Error::protocol(format!(
                "Too many pending requests: {}/{}",
                self.entries.len(),
                self.limit
            ))));
            return false;
        }

        match self.entries.entry(id) {
            Entry::Occupied(entry) => {
                warn!(id = %entry.key(), "Correlation id already pending");
                let _ = completion.send(Err(Error::protocol(format!(
                    "Correlation id already pending: {}",
                    entry.key()
                ))));
                false
            }
            Entry::Vacant(entry) => {
                entry.insert(completion);
                true
            }
        }
    }

    /// Removes the entry for `id` and fulfills it with `response`.
    ///
    /// Returns `false` if no entry was pending under `id`.
    pub fn resolve(&mut self, id: &CorrelationId, response: SocketResponse) -> bool {
        let Some(completion) = self.entries.remove(id) else {
            return false;
        };

        if completion.send(Ok(response)).is_err() {
            trace!(%id, "Response handle dropped before completion");
        }
        true
    }

    /// Removes the entry for `id` and fails it with `error`.
    pub fn fail(&mut self, id: &CorrelationId, error: Error) -> bool {
        match self.entries.remove(id) {
            Some(completion) => {
                let _ = completion.send(Err(error));
                true
            }
            None => false,
        }
    }

    /// Abandons every entry, completing each with [`Error::ConnectionClosed`].
    ///
    /// Returns the number of abandoned entries.
    pub fn abandon_all(&mut self) -> usize {
        let count = self.entries.len();

        for (_, completion) in self.entries.drain() {
            let _ = completion.send(Err(Error::ConnectionClosed));
        }

        if count > 0 {
            debug!(count, "Abandoned pending requests");
        }
        count
    }

    /// Returns `true` if `id` is pending.
    #[inline]
    #[must_use]
    pub fn contains(&self, id: &CorrelationId) -> bool {
        self.entries.contains_key(id)
    }

    /// Returns the number of pending entries.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is pending.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the entry limit.
    #[inline]
    #[must_use]
    pub fn limit(&self) -> usize {
        self.limit
    }
}

// ============================================================================
// Tests
// ============================================================================
