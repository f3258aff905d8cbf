//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **FsScanSource**: ファイルシステム走査
//! - **FsDeletionBackend** / **DryRunBackend**: 削除の実行 / 監査のみ
//! - **TracingEventSink** / **MemoryEventSink**: 結果の記録
//! - **StaticScanSource**: 固定リスト（テスト用）

pub mod dry_run;
pub mod events;
pub mod fs_delete;
pub mod fs_scan;
pub mod static_scan;

// 主要な型を再エクスポート
pub use self::dry_run::DryRunBackend;
pub use self::events::{MemoryEventSink, TracingEventSink};
pub use self::fs_delete::{DeleteMode, FsDeletionBackend};
pub use self::fs_scan::FsScanSource;
pub use self::static_scan::StaticScanSource;
