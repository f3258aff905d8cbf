//! SweeperBuilder - 部品のワイヤリング
//!
//! # 学習ポイント
//! - Builder パターンの実装
//! - 起動時検証（Fail-fast 設計）
//! - 省略可能な部品にはデフォルト（TracingEventSink / SystemClock）

use std::sync::Arc;
use std::time::Duration;

use super::runner::Sweeper;
use super::scheduler::RetentionScheduler;
use super::worker::DeletionWorker;
use crate::codec::PathTimeCodec;
use crate::config::SweeperConfig;
use crate::domain::TenantId;
use crate::impls::TracingEventSink;
use crate::policy::RetentionPolicy;
use crate::ports::{Clock, DeletionBackend, EventSink, ScanSource, SystemClock};

/// SweeperBuilder は Sweeper を構築
///
/// # 使用例
/// ```ignore
/// let sweeper = SweeperBuilder::new(policy)
///     .source(Arc::new(FsScanSource::new("/data", PathSchema::with_device())))
///     .backend(Arc::new(FsDeletionBackend::default()))
///     .build()?;
/// ```
///
/// # Fail-fast 設計
/// - source / backend が無ければ BuildError
/// - tick / rescan 間隔が 0 なら BuildError（tokio の interval は 0 を受け付けない）
/// - リトライに上限が無い、または並列数が 0 なら BuildError
pub struct SweeperBuilder {
    policy: Arc<RetentionPolicy>,
    source: Option<Arc<dyn ScanSource>>,
    backend: Option<Arc<dyn DeletionBackend>>,
    events: Arc<dyn EventSink>,
    clock: Arc<dyn Clock>,
    config: SweeperConfig,
}

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("no scan source configured")]
    MissingSource,

    #[error("no deletion backend configured")]
    MissingBackend,

    #[error("{0} must be greater than zero")]
    ZeroInterval(&'static str),

    #[error("retry policy has neither max_retries nor max_age; non-empty directories would be retried forever")]
    UnboundedRetry,

    #[error("delete concurrency must be at least 1")]
    ZeroConcurrency,
}

impl SweeperBuilder {
    pub fn new(policy: impl Into<Arc<RetentionPolicy>>) -> Self {
        Self {
            policy: policy.into(),
            source: None,
            backend: None,
            events: Arc::new(TracingEventSink),
            clock: Arc::new(SystemClock),
            config: SweeperConfig::default(),
        }
    }

    pub fn source(mut self, source: Arc<dyn ScanSource>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn backend(mut self, backend: Arc<dyn DeletionBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(mut self, config: SweeperConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Result<Sweeper, BuildError> {
        let source = self.source.ok_or(BuildError::MissingSource)?;
        let backend = self.backend.ok_or(BuildError::MissingBackend)?;
        if self.config.tick_interval == Duration::ZERO {
            return Err(BuildError::ZeroInterval("tick interval"));
        }
        if self.config.rescan_interval == Duration::ZERO {
            return Err(BuildError::ZeroInterval("rescan interval"));
        }
        if !self.config.retry.is_bounded() {
            return Err(BuildError::UnboundedRetry);
        }
        if self.config.delete_concurrency == 0 {
            return Err(BuildError::ZeroConcurrency);
        }

        let scheduler = RetentionScheduler::new(self.policy, PathTimeCodec::new(self.config.schema))
            .with_tenant_filter(self.config.only_tenant.as_deref().map(TenantId::new))
            .with_progress_every(self.config.log_every);

        let worker = DeletionWorker::new(
            Arc::new(scheduler),
            backend,
            self.events,
            self.config.retry.clone(),
        )
        .with_prune_levels(self.config.prune_levels())
        .with_rate_limit(self.config.delete_rate_per_sec)
        .with_concurrency(self.config.delete_concurrency);

        Ok(Sweeper::new(
            worker,
            source,
            self.clock,
            self.config.tick_interval,
            self.config.rescan_interval,
        ))
    }
}
