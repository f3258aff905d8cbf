//! Ports - 抽象化レイヤー
//!
//! 各 trait は外部（ファイルシステム、時計、ログ出力）へのインターフェースを
//! 提供し、実装の詳細を隠蔽します。実装は `impls` にあります。

pub mod clock;
pub mod deletion;
pub mod event_sink;
pub mod scan_source;

// 主要な trait を再エクスポート
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::deletion::{DeleteRequest, DeletionBackend};
pub use self::event_sink::EventSink;
pub use self::scan_source::ScanSource;
