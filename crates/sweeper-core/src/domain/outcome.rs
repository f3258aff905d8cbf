//! Outcome model: how one deletion attempt ended.
//!
//! Kept separate from the worker so the same classification can be logged,
//! counted and serialized without depending on queue internals.

use serde::{Deserialize, Serialize};

/// Classification of a deletion attempt, as reported to the event sink.
///
/// Serialized as SCREAMING_SNAKE_CASE (DELETED / RETRY_SCHEDULED / ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutcomeKind {
    /// Directory removed (or would have been, in dry-run).
    Deleted,

    /// Directory already gone. Not an error.
    AlreadyGone,

    /// Directory still had children; re-queued with backoff.
    RetryScheduled,

    /// Non-retryable failure (permission, I/O, ...).
    Failed,

    /// Retry cap exceeded while the directory stayed non-empty.
    GivenUp,
}

impl OutcomeKind {
    /// Does this outcome end tracking of the path?
    pub fn is_terminal(self) -> bool {
        !matches!(self, OutcomeKind::RetryScheduled)
    }

    /// Should this outcome be surfaced as an error?
    pub fn is_error(self) -> bool {
        matches!(self, OutcomeKind::Failed | OutcomeKind::GivenUp)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OutcomeKind::Deleted => "DELETED",
            OutcomeKind::AlreadyGone => "ALREADY_GONE",
            OutcomeKind::RetryScheduled => "RETRY_SCHEDULED",
            OutcomeKind::Failed => "FAILED",
            OutcomeKind::GivenUp => "GIVEN_UP",
        }
    }
}
