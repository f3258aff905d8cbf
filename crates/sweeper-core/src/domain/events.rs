//! SweepEvent - one structured record per finalize or retry.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{OutcomeKind, TenantId};

/// Emitted by the deletion worker for every terminal outcome and every retry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepEvent {
    pub path: PathBuf,
    pub tenant: TenantId,

    /// `expire_at` of the entry that was processed (not the retry's).
    pub expire_at: DateTime<Utc>,
    pub outcome: OutcomeKind,

    /// Retries performed so far for this path.
    pub retries: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl SweepEvent {
    pub fn new(
        path: impl Into<PathBuf>,
        tenant: TenantId,
        expire_at: DateTime<Utc>,
        outcome: OutcomeKind,
    ) -> Self {
        Self {
            path: path.into(),
            tenant,
            expire_at,
            outcome,
            retries: 0,
            detail: None,
        }
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}
