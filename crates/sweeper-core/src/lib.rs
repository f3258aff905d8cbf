//! sweeper-core
//!
//! Time-partitioned directory retention: scan `<root>/<tenant>/<device>/YYYY/MM/DD/HH/MM`
//! trees, compute each minute directory's expiration from a per-tenant policy,
//! and delete it once due.
//!
//! # モジュール構成
//! - **codec**: パス → (tenant, 作成時刻) のデコード
//! - **policy**: テナント別保持日数
//! - **queue**: 期限ヒープ、レコード、リトライポリシー
//! - **domain**: Entry, TenantId, OutcomeKind, SweepEvent
//! - **ports**: 抽象化レイヤー（ScanSource, DeletionBackend, Clock, EventSink）
//! - **impls**: ファイルシステム / dry-run / tracing などの実装
//! - **app**: builder, scheduler, worker, runner

pub mod app;
pub mod codec;
pub mod config;
pub mod domain;
pub mod error;
pub mod impls;
pub mod observability;
pub mod policy;
pub mod ports;
pub mod queue;

pub use app::{Sweeper, SweeperBuilder, SweeperHandle};
pub use config::SweeperConfig;
pub use error::SweeperError;
pub use policy::RetentionPolicy;
