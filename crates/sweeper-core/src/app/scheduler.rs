//! RetentionScheduler - 期限キューと追跡中ディレクトリの管理
//!
//! # 構成
//! - ExpiryQueue: `(expire_at, path)` だけを持つ min-heap
//! - records: path -> DirectoryRecord（追跡中の集合を兼ねる）
//! - settled: 失敗・断念したパス（再スキャンで拾い直さない）。
//!   最後に見えたスキャン世代を持ち、スキャンに現れなくなったら忘れる
//!
//! 3 つとも 1 つの Mutex の中にある。削除 syscall の間はロックを持たない。

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::Mutex;

use crate::codec::PathTimeCodec;
use crate::domain::{Entry, OutcomeKind, TenantId};
use crate::error::DecodeError;
use crate::observability::SweepCounts;
use crate::policy::RetentionPolicy;
use crate::ports::ScanSource;
use crate::queue::{DirectoryRecord, DirectoryState, ExpiryQueue};

/// Result of offering one path to the scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackResult {
    /// New entry pushed with this expiration.
    Enqueued(DateTime<Utc>),

    /// Path already has a live entry (or a delete in flight).
    AlreadyTracked,

    /// Path was finalized as failed/given up, or deleted in dry-run.
    Settled,

    /// Tenant does not match the configured filter.
    FilteredOut,
}

/// Totals for one pass over a ScanSource.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub scanned: usize,
    pub enqueued: usize,
    pub already_tracked: usize,
    pub settled: usize,
    pub filtered_out: usize,
    pub malformed: usize,
    /// Settled paths dropped because this scan no longer saw them.
    pub forgotten: usize,
}

/// A due entry handed to the worker together with its record data.
#[derive(Debug, Clone)]
pub(crate) struct DueEntry {
    pub entry: Entry,
    pub tenant: TenantId,
    pub retention: std::time::Duration,
    pub due_at: DateTime<Utc>,
    pub retries: u32,
}

#[derive(Debug, Default)]
struct Totals {
    scanned: u64,
    malformed: u64,
    deleted: u64,
    already_gone: u64,
    retries: u64,
    failed: u64,
    given_up: u64,
}

#[derive(Debug, Default)]
struct SchedulerState {
    queue: ExpiryQueue,
    records: HashMap<PathBuf, DirectoryRecord>,
    /// path -> scan generation that last saw it
    settled: HashMap<PathBuf, u64>,
    generation: u64,
    totals: Totals,
}

impl SchedulerState {
    fn counts(&self) -> SweepCounts {
        let mut counts = SweepCounts {
            tracked: self.records.len(),
            scanned: self.totals.scanned,
            malformed: self.totals.malformed,
            deleted: self.totals.deleted,
            already_gone: self.totals.already_gone,
            retries: self.totals.retries,
            failed: self.totals.failed,
            given_up: self.totals.given_up,
            ..SweepCounts::default()
        };
        for record in self.records.values() {
            match record.state {
                DirectoryState::Pending => counts.pending += 1,
                DirectoryState::Deleting => counts.in_flight += 1,
                DirectoryState::RetryScheduled => counts.retry_scheduled += 1,
            }
        }
        counts
    }
}

/// Owns the expiry queue and decides which paths enter it.
///
/// Shared between the ingest side and the [`DeletionWorker`] through `Arc`.
///
/// [`DeletionWorker`]: crate::app::DeletionWorker
pub struct RetentionScheduler {
    state: Mutex<SchedulerState>,
    policy: Arc<RetentionPolicy>,
    codec: PathTimeCodec,
    only_tenant: Option<TenantId>,
    progress_every: usize,
}

impl RetentionScheduler {
    pub fn new(policy: Arc<RetentionPolicy>, codec: PathTimeCodec) -> Self {
        Self {
            state: Mutex::new(SchedulerState::default()),
            policy,
            codec,
            only_tenant: None,
            progress_every: 0,
        }
    }

    /// Ignore candidates of every other tenant.
    pub fn with_tenant_filter(mut self, tenant: Option<TenantId>) -> Self {
        self.only_tenant = tenant;
        self
    }

    /// Log scan progress every `n` candidates. 0 disables it.
    pub fn with_progress_every(mut self, n: usize) -> Self {
        self.progress_every = n;
        self
    }

    pub fn policy(&self) -> &RetentionPolicy {
        &self.policy
    }

    /// One-time bulk load at startup.
    pub async fn ingest_initial(&self, source: &dyn ScanSource) -> IngestReport {
        let report = self.ingest(source).await;
        tracing::info!(
            scanned = report.scanned,
            enqueued = report.enqueued,
            malformed = report.malformed,
            filtered_out = report.filtered_out,
            "initial scan complete"
        );
        report
    }

    /// Periodic rescan; paths already tracked are skipped.
    pub async fn ingest_incremental(&self, source: &dyn ScanSource) -> IngestReport {
        let report = self.ingest(source).await;
        if report.enqueued > 0 || report.malformed > 0 {
            tracing::info!(
                scanned = report.scanned,
                enqueued = report.enqueued,
                already_tracked = report.already_tracked,
                malformed = report.malformed,
                forgotten = report.forgotten,
                "rescan picked up new directories"
            );
        } else {
            tracing::debug!(scanned = report.scanned, "rescan found nothing new");
        }
        report
    }

    async fn ingest(&self, source: &dyn ScanSource) -> IngestReport {
        let mut report = IngestReport::default();
        let generation = {
            let mut state = self.state.lock().await;
            state.generation += 1;
            state.generation
        };
        let mut rx = source.scan();

        while let Some(path) = rx.recv().await {
            report.scanned += 1;
            match self.track(path).await {
                Ok(TrackResult::Enqueued(_)) => report.enqueued += 1,
                Ok(TrackResult::AlreadyTracked) => report.already_tracked += 1,
                Ok(TrackResult::Settled) => report.settled += 1,
                Ok(TrackResult::FilteredOut) => report.filtered_out += 1,
                Err(e) => {
                    tracing::warn!(error = %e, "skipping candidate");
                    report.malformed += 1;
                }
            }
            if self.progress_every > 0 && report.scanned % self.progress_every == 0 {
                tracing::info!(
                    scanned = report.scanned,
                    enqueued = report.enqueued,
                    malformed = report.malformed,
                    "scan progress"
                );
            }
        }

        let mut state = self.state.lock().await;
        let before = state.settled.len();
        state.settled.retain(|_, seen| *seen >= generation);
        report.forgotten = before - state.settled.len();
        state.totals.scanned += report.scanned as u64;
        state.totals.malformed += report.malformed as u64;
        report
    }

    /// Decode `path`, compute its expiration and push it unless tracked.
    pub async fn track(&self, path: PathBuf) -> Result<TrackResult, DecodeError> {
        let decoded = self.codec.decode(&path)?;

        if let Some(only) = &self.only_tenant
            && *only != decoded.tenant
        {
            return Ok(TrackResult::FilteredOut);
        }

        let retention = self.policy.resolve(&decoded.tenant);
        let due_at = TimeDelta::from_std(retention)
            .ok()
            .and_then(|r| decoded.created_at.checked_add_signed(r))
            .ok_or_else(|| DecodeError::malformed(&path, "expiration out of range"))?;

        let mut state = self.state.lock().await;
        if state.records.contains_key(&path) {
            return Ok(TrackResult::AlreadyTracked);
        }
        let generation = state.generation;
        if let Some(seen) = state.settled.get_mut(&path) {
            *seen = generation;
            return Ok(TrackResult::Settled);
        }

        let record = DirectoryRecord::new(decoded.tenant, decoded.created_at, retention, due_at);
        state.queue.push(Entry::new(due_at, path.clone()));
        state.records.insert(path, record);
        Ok(TrackResult::Enqueued(due_at))
    }

    /// Pop the next due entry and mark its record in flight.
    pub(crate) async fn take_due(&self, now: DateTime<Utc>) -> Option<DueEntry> {
        let mut state = self.state.lock().await;
        loop {
            let entry = state.queue.pop_due(now)?;
            let Some(record) = state.records.get_mut(&entry.path) else {
                tracing::warn!(path = %entry.path.display(), "queue entry without record, dropping");
                continue;
            };
            if !record.state.is_queued() {
                tracing::warn!(
                    path = %entry.path.display(),
                    state = ?record.state,
                    "stale queue entry, dropping"
                );
                continue;
            }
            record.start_delete();
            return Some(DueEntry {
                tenant: record.tenant.clone(),
                retention: record.retention,
                due_at: record.due_at,
                retries: record.retries,
                entry,
            });
        }
    }

    /// Re-queue `path` at `next_expire_at` after a NotEmpty.
    pub(crate) async fn reschedule(&self, path: &Path, next_expire_at: DateTime<Utc>, error: String) {
        let mut state = self.state.lock().await;
        let Some(record) = state.records.get_mut(path) else {
            return;
        };
        record.schedule_retry(next_expire_at, error);
        state.queue.push(Entry::new(next_expire_at, path));
        state.totals.retries += 1;
    }

    /// Stop tracking `path` after a terminal outcome.
    ///
    /// With `remember`, later scans will not pick the path up again.
    pub(crate) async fn finish(&self, path: &Path, outcome: OutcomeKind, remember: bool) {
        let mut state = self.state.lock().await;
        state.records.remove(path);
        if remember {
            let generation = state.generation;
            state.settled.insert(path.to_path_buf(), generation);
        }
        let totals = &mut state.totals;
        match outcome {
            OutcomeKind::Deleted => totals.deleted += 1,
            OutcomeKind::AlreadyGone => totals.already_gone += 1,
            OutcomeKind::Failed => totals.failed += 1,
            OutcomeKind::GivenUp => totals.given_up += 1,
            OutcomeKind::RetryScheduled => {}
        }
    }

    /// Number of entries in the heap.
    pub async fn len(&self) -> usize {
        self.state.lock().await.queue.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.lock().await.queue.is_empty()
    }

    /// Earliest expiration currently queued.
    pub async fn next_due(&self) -> Option<DateTime<Utc>> {
        self.state.lock().await.queue.peek_min().map(|e| e.expire_at)
    }

    pub async fn is_tracked(&self, path: &Path) -> bool {
        self.state.lock().await.records.contains_key(path)
    }

    pub async fn counts(&self) -> SweepCounts {
        self.state.lock().await.counts()
    }
}
