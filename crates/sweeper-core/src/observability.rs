use serde::{Deserialize, Serialize};

/// Snapshot of scheduler state plus lifetime totals.
///
/// `pending`, `in_flight` and `retry_scheduled` describe tracked paths right
/// now; the remaining fields only grow.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepCounts {
    pub tracked: usize,
    pub pending: usize,
    pub in_flight: usize,
    pub retry_scheduled: usize,

    pub scanned: u64,
    pub malformed: u64,
    pub deleted: u64,
    pub already_gone: u64,
    pub retries: u64,
    pub failed: u64,
    pub given_up: u64,
}
