//! Retry policy: backoff delay and the cap for non-empty directories.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// Retry policy for directories that were still non-empty when due.
///
/// The delay is fixed: each retry moves `expire_at` to `now + delay`.
/// Either cap, when set, turns the next NotEmpty into `GivenUp`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Delay before the next attempt.
    pub delay: Duration,

    /// Maximum number of retries per path.
    pub max_retries: Option<u32>,

    /// Maximum time spent retrying, measured from the original due instant.
    pub max_age: Option<Duration>,
}

impl RetryPolicy {
    pub const DEFAULT_DELAY: Duration = Duration::from_secs(60);

    /// One day of per-minute retries.
    pub const DEFAULT_MAX_RETRIES: u32 = 1_440;

    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            max_retries: Some(Self::DEFAULT_MAX_RETRIES),
            max_age: None,
        }
    }

    /// Instant of the next attempt after a NotEmpty observed at `now`.
    ///
    /// A zero delay is bumped to one second so a re-pushed entry is never
    /// due again within the same tick.
    pub fn next_attempt_at(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let delay = TimeDelta::from_std(self.delay)
            .unwrap_or(TimeDelta::MAX)
            .max(TimeDelta::seconds(1));
        now.checked_add_signed(delay).unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// At least one cap is set, so a NotEmpty directory is eventually given up.
    pub fn is_bounded(&self) -> bool {
        self.max_retries.is_some() || self.max_age.is_some()
    }

    /// Has a path exhausted its retries?
    ///
    /// # Arguments
    /// * `retries` - Retries already performed (0 on the first NotEmpty).
    /// * `first_due_at` - When the path first became due.
    /// * `now` - Current instant.
    pub fn is_exhausted(&self, retries: u32, first_due_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        if let Some(max) = self.max_retries
            && retries >= max
        {
            return true;
        }
        if let Some(max_age) = self.max_age {
            let waited = (now - first_due_at).to_std().unwrap_or(Duration::ZERO);
            if waited >= max_age {
                return true;
            }
        }
        false
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_DELAY)
    }
}
