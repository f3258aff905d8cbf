//! Scheduler configuration.
//!
//! The retention table itself lives in [`crate::policy`]; this struct holds
//! everything that shapes how the scheduler loop runs.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::codec::{PathSchema, TIME_COMPONENTS};
use crate::queue::RetryPolicy;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweeperConfig {
    pub schema: PathSchema,

    /// How often due entries are processed.
    pub tick_interval: Duration,

    /// How often the tree is rescanned for new partitions.
    pub rescan_interval: Duration,

    pub retry: RetryPolicy,

    /// Only track this tenant's directories.
    pub only_tenant: Option<String>,

    /// Upper bound on delete calls per second (None = unlimited).
    pub delete_rate_per_sec: Option<u32>,

    /// Delete calls allowed in flight at once within a tick. Entries are
    /// still dispatched in expiration order; with more than one worker they
    /// may complete out of order.
    pub delete_concurrency: usize,

    /// Log scan progress every N candidates (0 = only the final summary).
    pub log_every: usize,

    /// After a successful delete, try to remove this many now-empty
    /// ancestors (1 = hour, 2 = hour and day, ...). Capped at 4 (year).
    pub prune_parent_levels: usize,
}

impl SweeperConfig {
    pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(5);
    pub const DEFAULT_RESCAN_INTERVAL: Duration = Duration::from_secs(300);
    pub const MAX_PRUNE_LEVELS: usize = TIME_COMPONENTS - 1;
    pub const DEFAULT_LOG_EVERY: usize = 1_000;

    /// Prune levels clamped to the time components above the minute.
    pub fn prune_levels(&self) -> usize {
        self.prune_parent_levels.min(Self::MAX_PRUNE_LEVELS)
    }
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            schema: PathSchema::default(),
            tick_interval: Self::DEFAULT_TICK_INTERVAL,
            rescan_interval: Self::DEFAULT_RESCAN_INTERVAL,
            retry: RetryPolicy::default(),
            only_tenant: None,
            delete_rate_per_sec: None,
            delete_concurrency: 1,
            log_every: Self::DEFAULT_LOG_EVERY,
            prune_parent_levels: 0,
        }
    }
}
