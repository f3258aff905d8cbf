//! Queue entry: one pending deletion.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

/// A directory waiting for its expiration instant.
///
/// Ordering is `(expire_at, path)` where paths compare by their raw bytes.
/// The path tie-break only exists to make pop order reproducible.
///
/// Equality follows the same key, so two entries whose paths differ only in
/// redundant separators are distinct.
#[derive(Debug, Clone)]
pub struct Entry {
    pub expire_at: DateTime<Utc>,
    pub path: PathBuf,
}

impl Entry {
    pub fn new(expire_at: DateTime<Utc>, path: impl Into<PathBuf>) -> Self {
        Self {
            expire_at,
            path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Is this entry eligible for deletion at `now`?
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.expire_at <= now
    }
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.expire_at
            .cmp(&other.expire_at)
            .then_with(|| self.path.as_os_str().cmp(other.path.as_os_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn earlier_expiry_sorts_first() {
        let a = Entry::new(at(10), "/z");
        let b = Entry::new(at(20), "/a");
        assert!(a < b);
    }

    #[test]
    fn equal_expiry_breaks_tie_on_path() {
        let a = Entry::new(at(10), "/data/a");
        let b = Entry::new(at(10), "/data/b");
        assert!(a < b);
        assert_eq!(a.cmp(&a.clone()), Ordering::Equal);
    }

    #[test]
    fn due_is_inclusive() {
        let e = Entry::new(at(100), "/x");
        assert!(e.is_due(at(100)));
        assert!(!e.is_due(at(99)));
    }
}
