//! FsScanSource - ファイルシステムを走査して minute directory を列挙
//!
//! # 実装詳細
//! - spawn_blocking 上で深さ優先に走査（std::fs は blocking なので）
//! - 見つけたパスは bounded channel で逐次送る（受信側が遅ければ走査も待つ）
//! - symlink は辿らない（DirEntry::file_type は link 自体の種別を返す）
//! - 読めないディレクトリは warn を出してスキップ

use std::fs;
use std::path::{Path, PathBuf};

use tokio::sync::mpsc;

use crate::codec::PathSchema;
use crate::ports::ScanSource;

const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Walks `root` and yields directories exactly `schema.depth()` levels below it.
#[derive(Debug, Clone)]
pub struct FsScanSource {
    root: PathBuf,
    depth: usize,
    only_tenant: Option<String>,
    channel_capacity: usize,
}

impl FsScanSource {
    pub fn new(root: impl Into<PathBuf>, schema: PathSchema) -> Self {
        Self {
            root: root.into(),
            depth: schema.depth(),
            only_tenant: None,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }

    /// Walk only `root/<tenant>`.
    pub fn only_tenant(mut self, tenant: impl Into<String>) -> Self {
        self.only_tenant = Some(tenant.into());
        self
    }

    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ScanSource for FsScanSource {
    fn scan(&self) -> mpsc::Receiver<PathBuf> {
        let (tx, rx) = mpsc::channel(self.channel_capacity);
        let walk = Walk {
            root: self.root.clone(),
            depth: self.depth,
            only_tenant: self.only_tenant.clone(),
        };

        // JoinHandle is dropped on purpose: completion is signalled by the
        // channel closing.
        tokio::task::spawn_blocking(move || walk.run(&tx));
        rx
    }
}

struct Walk {
    root: PathBuf,
    depth: usize,
    only_tenant: Option<String>,
}

impl Walk {
    fn run(&self, tx: &mpsc::Sender<PathBuf>) {
        let mut stack: Vec<(PathBuf, usize)> = Vec::new();

        match &self.only_tenant {
            Some(tenant) => {
                let dir = self.root.join(tenant);
                match fs::symlink_metadata(&dir) {
                    Ok(meta) if meta.is_dir() => stack.push((dir, 1)),
                    Ok(_) => {
                        tracing::warn!(path = %dir.display(), "scan: tenant path is not a directory");
                    }
                    Err(e) => {
                        tracing::warn!(path = %dir.display(), error = %e, "scan: cannot stat tenant directory");
                    }
                }
            }
            None => stack.push((self.root.clone(), 0)),
        }

        let mut visited = 0usize;
        let mut yielded = 0usize;

        while let Some((dir, level)) = stack.pop() {
            visited += 1;
            let mut children = match self.child_dirs(&dir) {
                Ok(children) => children,
                Err(e) => {
                    tracing::warn!(path = %dir.display(), error = %e, "scan: cannot read directory, skipping subtree");
                    continue;
                }
            };

            let child_level = level + 1;
            if child_level == self.depth {
                children.sort();
                for child in children {
                    if tx.blocking_send(child).is_err() {
                        tracing::debug!("scan: receiver dropped, stopping walk");
                        return;
                    }
                    yielded += 1;
                }
            } else {
                // reverse so the stack pops in name order
                children.sort_by(|a, b| b.cmp(a));
                stack.extend(children.into_iter().map(|c| (c, child_level)));
            }
        }

        tracing::debug!(root = %self.root.display(), visited, yielded, "scan finished");
    }

    /// Sub-directories of `dir`, symlinks excluded.
    fn child_dirs(&self, dir: &Path) -> std::io::Result<Vec<PathBuf>> {
        let mut out = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!(path = %dir.display(), error = %e, "scan: bad directory entry");
                    continue;
                }
            };
            match entry.file_type() {
                Ok(ft) if ft.is_dir() => out.push(entry.path()),
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(path = %entry.path().display(), error = %e, "scan: cannot read file type");
                }
            }
        }
        Ok(out)
    }
}
