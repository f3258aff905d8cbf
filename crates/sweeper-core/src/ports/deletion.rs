//! DeletionBackend port - ディレクトリ削除の抽象化
//!
//! # 実装
//! - FsDeletionBackend: 実際に削除する
//! - DryRunBackend: 削除せずに監査ログだけ出す

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::TenantId;
use crate::error::DeleteError;

/// Everything known about a due directory at delete time.
#[derive(Debug, Clone)]
pub struct DeleteRequest {
    pub path: PathBuf,
    pub tenant: TenantId,
    pub retention: Duration,
    pub expire_at: DateTime<Utc>,
}

/// Performs deletes and classifies failures.
///
/// Implementations map I/O errors through `DeleteError::from` so the worker
/// sees NotEmpty / NotFound / Other uniformly.
#[async_trait]
pub trait DeletionBackend: Send + Sync {
    /// Delete the minute directory named by `request`.
    async fn delete(&self, request: &DeleteRequest) -> Result<(), DeleteError>;

    /// Remove `path` only if it is an empty directory. Used to prune
    /// ancestors after a successful delete.
    async fn remove_empty_dir(&self, path: &Path) -> Result<(), DeleteError>;

    /// Dry-run backends never change the filesystem.
    fn is_dry_run(&self) -> bool {
        false
    }
}
