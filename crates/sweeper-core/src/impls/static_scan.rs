//! StaticScanSource - 固定リストを返す ScanSource（テスト・再生用）

use std::path::PathBuf;
use std::sync::Mutex;

use tokio::sync::mpsc;

use crate::ports::ScanSource;

/// Yields a fixed list of paths on every scan.
///
/// The list can be replaced between scans to simulate directories that
/// appear after the initial load.
#[derive(Debug, Default)]
pub struct StaticScanSource {
    paths: Mutex<Vec<PathBuf>>,
}

impl StaticScanSource {
    pub fn new<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            paths: Mutex::new(paths.into_iter().map(Into::into).collect()),
        }
    }

    pub fn push(&self, path: impl Into<PathBuf>) {
        self.paths
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(path.into());
    }
}

impl ScanSource for StaticScanSource {
    fn scan(&self) -> mpsc::Receiver<PathBuf> {
        let paths = self.paths.lock().unwrap_or_else(|e| e.into_inner()).clone();
        let (tx, rx) = mpsc::channel(paths.len().max(1));
        for p in paths {
            // capacity equals the list length, so this never fails
            let _ = tx.try_send(p);
        }
        rx
    }
}
