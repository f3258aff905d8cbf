//! ScanSource port - 削除候補ディレクトリの列挙
//!
//! # 契約
//! - minute directory だけを返す（祖先ディレクトリは返さない）
//! - symbolic link を辿らない
//! - 副作用なし、何度呼んでもよい

use std::path::PathBuf;

use tokio::sync::mpsc;

/// Enumerates deletion candidates under a root.
///
/// `scan` starts one walk and returns immediately; paths arrive on the
/// channel as they are discovered and the channel closes when the walk ends.
/// Must be called from within a tokio runtime.
pub trait ScanSource: Send + Sync {
    fn scan(&self) -> mpsc::Receiver<PathBuf>;
}
