//! Directory record: metadata for a tracked path.

use std::time::Duration;

use chrono::{DateTime, Utc};

use super::DirectoryState;
use crate::domain::TenantId;

/// Metadata for a directory in the queue.
///
/// Design:
/// - The heap holds `(expire_at, path)` only.
/// - Everything else about the path lives here, keyed by path.
/// - All state transitions happen here.
#[derive(Debug, Clone)]
pub struct DirectoryRecord {
    pub tenant: TenantId,
    pub state: DirectoryState,

    /// Decoded from the path.
    pub created_at: DateTime<Utc>,

    /// Retention used to compute `due_at`.
    pub retention: Duration,

    /// `created_at + retention`; never changes on retry.
    pub due_at: DateTime<Utc>,

    /// `expire_at` of the entry currently in the heap.
    pub expire_at: DateTime<Utc>,

    /// Number of NotEmpty retries so far.
    pub retries: u32,

    /// Last NotEmpty/other failure message (if any).
    pub last_error: Option<String>,
}

impl DirectoryRecord {
    pub fn new(
        tenant: TenantId,
        created_at: DateTime<Utc>,
        retention: Duration,
        due_at: DateTime<Utc>,
    ) -> Self {
        Self {
            tenant,
            state: DirectoryState::Pending,
            created_at,
            retention,
            due_at,
            expire_at: due_at,
            retries: 0,
            last_error: None,
        }
    }

    /// Mark as popped and in flight.
    pub fn start_delete(&mut self) {
        self.state = DirectoryState::Deleting;
    }

    /// Schedule the next attempt after a NotEmpty.
    pub fn schedule_retry(&mut self, next_expire_at: DateTime<Utc>, error: String) {
        self.state = DirectoryState::RetryScheduled;
        self.retries += 1;
        self.expire_at = next_expire_at;
        self.last_error = Some(error);
    }
}
