//! Sweeper - スキャン / tick / 再スキャンのループ
//!
//! - 起動時に全体スキャン（initial）
//! - `tick_interval` ごとに期限切れを処理
//! - `rescan_interval` ごとに差分スキャン（incremental）
//! - shutdown が来たら進行中の tick を終えてから抜ける

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use super::scheduler::{IngestReport, RetentionScheduler};
use super::worker::{DeletionWorker, TickReport};
use crate::observability::SweepCounts;
use crate::ports::{Clock, ScanSource};

pub struct Sweeper {
    scheduler: Arc<RetentionScheduler>,
    worker: DeletionWorker,
    source: Arc<dyn ScanSource>,
    clock: Arc<dyn Clock>,
    tick_interval: Duration,
    rescan_interval: Duration,
}

impl Sweeper {
    pub(crate) fn new(
        worker: DeletionWorker,
        source: Arc<dyn ScanSource>,
        clock: Arc<dyn Clock>,
        tick_interval: Duration,
        rescan_interval: Duration,
    ) -> Self {
        Self {
            scheduler: Arc::clone(worker.scheduler()),
            worker,
            source,
            clock,
            tick_interval,
            rescan_interval,
        }
    }

    pub fn scheduler(&self) -> &Arc<RetentionScheduler> {
        &self.scheduler
    }

    pub async fn initial_scan(&self) -> IngestReport {
        self.scheduler.ingest_initial(self.source.as_ref()).await
    }

    pub async fn rescan(&self) -> IngestReport {
        self.scheduler.ingest_incremental(self.source.as_ref()).await
    }

    /// Process whatever is due according to the clock.
    pub async fn tick(&mut self) -> TickReport {
        let now = self.clock.now();
        self.worker.tick(now).await
    }

    pub async fn counts(&self) -> SweepCounts {
        self.scheduler.counts().await
    }

    /// Scan once and delete everything already due, then return.
    pub async fn run_once(mut self) -> SweepCounts {
        self.initial_scan().await;
        self.tick().await;
        self.counts().await
    }

    /// Run until `shutdown` flips to `true` or its sender is dropped.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> SweepCounts {
        self.initial_scan().await;

        let mut tick = tokio::time::interval(self.tick_interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // 起動直後は initial scan 済みなので、最初の再スキャンは 1 周期後
        let mut rescan =
            tokio::time::interval_at(Instant::now() + self.rescan_interval, self.rescan_interval);
        rescan.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
                _ = tick.tick() => {
                    self.tick().await;
                }
                _ = rescan.tick() => {
                    self.rescan().await;
                    self.log_summary().await;
                }
            }
        }

        tracing::info!("sweeper stopped");
        self.log_summary().await
    }

    async fn log_summary(&self) -> SweepCounts {
        let counts = self.counts().await;
        tracing::info!(
            tracked = counts.tracked,
            pending = counts.pending,
            retry_scheduled = counts.retry_scheduled,
            scanned = counts.scanned,
            malformed = counts.malformed,
            deleted = counts.deleted,
            already_gone = counts.already_gone,
            retries = counts.retries,
            failed = counts.failed,
            given_up = counts.given_up,
            "sweeper status"
        );
        counts
    }
}

/// Handle to a sweeper running on its own task.
/// - `shutdown_tx` を drop しても止まる
pub struct SweeperHandle {
    shutdown_tx: watch::Sender<bool>,
    join: JoinHandle<SweepCounts>,
}

impl SweeperHandle {
    pub fn spawn(sweeper: Sweeper) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let join = tokio::spawn(sweeper.run(shutdown_rx));
        Self { shutdown_tx, join }
    }

    /// Ask the loop to stop. An in-flight tick is allowed to finish.
    pub fn request_shutdown(&self) {
        // receiver may already be gone
        let _ = self.shutdown_tx.send(true);
    }

    /// Shutdown and wait. `None` if the sweeper task panicked.
    pub async fn shutdown_and_join(self) -> Option<SweepCounts> {
        self.request_shutdown();
        match self.join.await {
            Ok(counts) => Some(counts),
            Err(e) => {
                tracing::error!(error = %e, "sweeper task failed");
                None
            }
        }
    }
}
