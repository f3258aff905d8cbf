//! DryRunBackend - 削除せずに監査ログだけ出す

use std::path::Path;

use async_trait::async_trait;

use crate::error::DeleteError;
use crate::policy::SECS_PER_DAY;
use crate::ports::{DeleteRequest, DeletionBackend};

/// Reports every due directory as deleted without touching it.
///
/// Each would-be delete is logged with the path and the retention that made
/// it due, so a dry run doubles as an audit of the retention table.
#[derive(Debug, Clone, Copy, Default)]
pub struct DryRunBackend;

#[async_trait]
impl DeletionBackend for DryRunBackend {
    async fn delete(&self, request: &DeleteRequest) -> Result<(), DeleteError> {
        tracing::info!(
            path = %request.path.display(),
            tenant = %request.tenant,
            retention_days = request.retention.as_secs() / SECS_PER_DAY,
            expire_at = %request.expire_at.to_rfc3339(),
            "DRY RUN: would delete"
        );
        Ok(())
    }

    async fn remove_empty_dir(&self, path: &Path) -> Result<(), DeleteError> {
        tracing::info!(path = %path.display(), "DRY RUN: would remove empty directory");
        Ok(())
    }

    fn is_dry_run(&self) -> bool {
        true
    }
}
