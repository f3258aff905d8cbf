//! App - アプリケーション層
//!
//! このモジュールは、ports を組み合わせて削除スケジューラを実装します。
//!
//! # 主要コンポーネント
//! - **SweeperBuilder**: 構築とワイヤリング
//! - **RetentionScheduler**: スキャン結果の取り込みと期限キュー
//! - **DeletionWorker**: 期限切れの削除（take_due→delete→classify→finish/reschedule）
//! - **Sweeper / SweeperHandle**: tick と再スキャンのループ、shutdown

pub mod builder;
pub mod runner;
pub mod scheduler;
pub mod worker;

// 主要な型を再エクスポート
pub use self::builder::{BuildError, SweeperBuilder};
pub use self::runner::{Sweeper, SweeperHandle};
pub use self::scheduler::{IngestReport, RetentionScheduler, TrackResult};
pub use self::worker::{DeletionWorker, TickReport};
