//! EventSink port - イベント記録の抽象化
//!
//! # 実装
//! - TracingEventSink: tracing の構造化ログとして出力（本番用）
//! - MemoryEventSink: メモリに溜める（テスト用）

use crate::domain::SweepEvent;

/// EventSink は削除の結果を記録
///
/// Called once per terminal outcome and once per retry, outside the queue
/// lock. Implementations must not block for long.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &SweepEvent);
}
