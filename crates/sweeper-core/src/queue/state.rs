//! Directory state machine for tracked paths.

use serde::{Deserialize, Serialize};

/// State of a tracked directory.
///
/// State transitions:
/// - Pending -> Deleting -> (record removed)
/// - Pending -> Deleting -> RetryScheduled -> Deleting -> ... (until deleted or given up)
///
/// Terminal outcomes remove the record instead of storing a terminal state,
/// so the record table doubles as the set of paths currently tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DirectoryState {
    /// Waiting for its first expiration.
    Pending,

    /// Popped; a delete call is in flight.
    Deleting,

    /// Was non-empty; waiting for the retry instant.
    RetryScheduled,
}

impl DirectoryState {
    /// Is an entry for this path expected to be in the heap?
    pub fn is_queued(self) -> bool {
        matches!(self, DirectoryState::Pending | DirectoryState::RetryScheduled)
    }
}
