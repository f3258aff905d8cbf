//! FsDeletionBackend - 実際にディレクトリを削除する

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::DeleteError;
use crate::ports::{DeleteRequest, DeletionBackend};

/// How a due minute directory is removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteMode {
    /// `rmdir`: succeeds only when empty, NotEmpty otherwise.
    #[default]
    EmptyOnly,

    /// Remove the directory and everything below it. Symlinks inside are
    /// removed, not followed.
    Recursive,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FsDeletionBackend {
    mode: DeleteMode,
}

impl FsDeletionBackend {
    pub fn new(mode: DeleteMode) -> Self {
        Self { mode }
    }
}

#[async_trait]
impl DeletionBackend for FsDeletionBackend {
    async fn delete(&self, request: &DeleteRequest) -> Result<(), DeleteError> {
        match self.mode {
            DeleteMode::EmptyOnly => tokio::fs::remove_dir(&request.path).await?,
            DeleteMode::Recursive => tokio::fs::remove_dir_all(&request.path).await?,
        }
        Ok(())
    }

    async fn remove_empty_dir(&self, path: &Path) -> Result<(), DeleteError> {
        tokio::fs::remove_dir(path).await?;
        Ok(())
    }
}
