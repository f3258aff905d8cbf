//! DeletionWorker - 期限切れエントリの削除とリトライ
//!
//! # フロー（tick ごと）
//! 1. 期限切れのエントリを取り出す（ロック内、期限順）
//! 2. ロックを離して削除を実行（最大 `concurrency` 件を同時に）
//! 3. 結果で分岐: 成功 / 既に無い / 空でない（リトライ） / その他の失敗
//! 4. 期限切れが無くなり、実行中の削除も終わるまで繰り返す

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinSet;
use tokio::time::{Interval, MissedTickBehavior};

use super::scheduler::{DueEntry, RetentionScheduler};
use crate::domain::{OutcomeKind, SweepEvent};
use crate::error::DeleteError;
use crate::ports::{DeleteRequest, DeletionBackend, EventSink};
use crate::queue::RetryPolicy;

/// What one `tick` did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub processed: usize,
    pub deleted: usize,
    pub already_gone: usize,
    pub retried: usize,
    pub failed: usize,
    pub given_up: usize,
}

impl TickReport {
    fn record(&mut self, outcome: OutcomeKind) {
        self.processed += 1;
        match outcome {
            OutcomeKind::Deleted => self.deleted += 1,
            OutcomeKind::AlreadyGone => self.already_gone += 1,
            OutcomeKind::RetryScheduled => self.retried += 1,
            OutcomeKind::Failed => self.failed += 1,
            OutcomeKind::GivenUp => self.given_up += 1,
        }
    }
}

/// The part of the worker each spawned delete task gets a copy of.
#[derive(Clone)]
struct DeleteStep {
    scheduler: Arc<RetentionScheduler>,
    backend: Arc<dyn DeletionBackend>,
    events: Arc<dyn EventSink>,
    retry: RetryPolicy,
    prune_levels: usize,
}

pub struct DeletionWorker {
    step: DeleteStep,
    concurrency: usize,
    rate_period: Option<Duration>,
    limiter: Option<Interval>,
}

impl DeletionWorker {
    pub fn new(
        scheduler: Arc<RetentionScheduler>,
        backend: Arc<dyn DeletionBackend>,
        events: Arc<dyn EventSink>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            step: DeleteStep {
                scheduler,
                backend,
                events,
                retry,
                prune_levels: 0,
            },
            concurrency: 1,
            rate_period: None,
            limiter: None,
        }
    }

    /// Remove up to `levels` empty ancestors after each successful delete.
    pub fn with_prune_levels(mut self, levels: usize) -> Self {
        self.step.prune_levels = levels;
        self
    }

    /// Throttle delete calls to `per_sec` per second. `None` or 0 disables it.
    pub fn with_rate_limit(mut self, per_sec: Option<u32>) -> Self {
        self.rate_period = per_sec.filter(|n| *n > 0).map(|n| Duration::from_secs(1) / n);
        self.limiter = None;
        self
    }

    /// Allow up to `n` delete calls in flight at once (at least 1).
    pub fn with_concurrency(mut self, n: usize) -> Self {
        self.concurrency = n.max(1);
        self
    }

    pub fn scheduler(&self) -> &Arc<RetentionScheduler> {
        &self.step.scheduler
    }

    /// Process every entry due at `now`.
    ///
    /// Entries are taken in expiration order. Entries re-queued during this
    /// call land at `now + delay` and are not revisited until a later tick.
    pub async fn tick(&mut self, now: DateTime<Utc>) -> TickReport {
        let mut report = TickReport::default();
        let mut in_flight = JoinSet::new();

        loop {
            while in_flight.len() < self.concurrency {
                let Some(due) = self.step.scheduler.take_due(now).await else {
                    break;
                };
                self.wait_for_token().await;
                let step = self.step.clone();
                in_flight.spawn(async move { step.process(due, now).await });
            }

            match in_flight.join_next().await {
                Some(Ok(outcome)) => report.record(outcome),
                Some(Err(e)) => tracing::error!(error = %e, "delete task failed"),
                None => break,
            }
        }

        if report.processed > 0 {
            tracing::debug!(
                processed = report.processed,
                deleted = report.deleted,
                retried = report.retried,
                failed = report.failed,
                "tick complete"
            );
        }
        report
    }

    async fn wait_for_token(&mut self) {
        let Some(period) = self.rate_period else {
            return;
        };
        // interval はランタイム内でしか作れないので初回に作る
        let limiter = self.limiter.get_or_insert_with(|| {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval
        });
        limiter.tick().await;
    }
}

impl DeleteStep {
    async fn process(&self, due: DueEntry, now: DateTime<Utc>) -> OutcomeKind {
        let request = DeleteRequest {
            path: due.entry.path.clone(),
            tenant: due.tenant.clone(),
            retention: due.retention,
            expire_at: due.entry.expire_at,
        };

        // ここではロックを持たない（削除 syscall は遅いことがある）
        let result = self.backend.delete(&request).await;

        let path = &request.path;
        let event = |outcome| SweepEvent::new(path.clone(), due.tenant.clone(), due.entry.expire_at, outcome);

        let (outcome, event) = match result {
            Ok(()) => {
                if !self.backend.is_dry_run() {
                    self.prune_parents(path).await;
                }
                (OutcomeKind::Deleted, event(OutcomeKind::Deleted).with_retries(due.retries))
            }
            Err(DeleteError::NotFound) => (
                OutcomeKind::AlreadyGone,
                event(OutcomeKind::AlreadyGone).with_retries(due.retries),
            ),
            Err(DeleteError::NotEmpty) if self.retry.is_exhausted(due.retries, due.due_at, now) => (
                OutcomeKind::GivenUp,
                event(OutcomeKind::GivenUp)
                    .with_retries(due.retries)
                    .with_detail("directory still not empty, retry limit reached"),
            ),
            Err(DeleteError::NotEmpty) => {
                let next = self.retry.next_attempt_at(now);
                self.scheduler
                    .reschedule(path, next, DeleteError::NotEmpty.to_string())
                    .await;
                (
                    OutcomeKind::RetryScheduled,
                    event(OutcomeKind::RetryScheduled)
                        .with_retries(due.retries + 1)
                        .with_detail(format!("next attempt at {}", next.to_rfc3339())),
                )
            }
            Err(DeleteError::Other(e)) => (
                OutcomeKind::Failed,
                event(OutcomeKind::Failed)
                    .with_retries(due.retries)
                    .with_detail(e.to_string()),
            ),
        };

        if outcome.is_terminal() {
            // dry-run では削除済み扱いでも実物が残るので、再スキャンで拾わない
            let remember =
                outcome.is_error() || (self.backend.is_dry_run() && outcome == OutcomeKind::Deleted);
            self.scheduler.finish(path, outcome, remember).await;
        }
        self.events.emit(&event);
        outcome
    }

    /// Remove empty ancestors (hour, day, ...) of a deleted minute directory.
    async fn prune_parents(&self, path: &Path) {
        for parent in path.ancestors().skip(1).take(self.prune_levels) {
            match self.backend.remove_empty_dir(parent).await {
                Ok(()) => tracing::debug!(path = %parent.display(), "pruned empty parent"),
                Err(DeleteError::NotEmpty | DeleteError::NotFound) => break,
                Err(DeleteError::Other(e)) => {
                    tracing::warn!(path = %parent.display(), error = %e, "failed to prune parent");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{PathSchema, PathTimeCodec};
    use crate::domain::TenantId;
    use crate::impls::{DryRunBackend, FsDeletionBackend, MemoryEventSink};
    use crate::policy::RetentionPolicy;
    use async_trait::async_trait;
    use rstest::rstest;
    use chrono::{TimeDelta, TimeZone};
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const PATH: &str = "/data/acme/devA/2023/01/01/00/00";

    #[derive(Debug, Clone, Copy)]
    enum Scripted {
        NotEmpty,
        NotFound,
        Denied,
    }

    impl Scripted {
        fn result(self) -> Result<(), DeleteError> {
            match self {
                Scripted::NotEmpty => Err(DeleteError::NotEmpty),
                Scripted::NotFound => Err(DeleteError::NotFound),
                Scripted::Denied => Err(DeleteError::Other(std::io::Error::from(
                    std::io::ErrorKind::PermissionDenied,
                ))),
            }
        }
    }

    /// Backend with scripted results per path; unscripted paths succeed.
    #[derive(Default)]
    struct ScriptedBackend {
        results: Mutex<HashMap<PathBuf, Vec<Scripted>>>,
        calls: Mutex<Vec<PathBuf>>,
        pruned: Mutex<Vec<PathBuf>>,
    }

    impl ScriptedBackend {
        fn always_not_empty(path: &str) -> Self {
            Self::default().script(path, vec![Scripted::NotEmpty; 1_000])
        }

        fn script(self, path: &str, results: Vec<Scripted>) -> Self {
            self.results.lock().unwrap().insert(PathBuf::from(path), results);
            self
        }

        fn calls(&self) -> Vec<PathBuf> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl DeletionBackend for ScriptedBackend {
        async fn delete(&self, request: &DeleteRequest) -> Result<(), DeleteError> {
            self.calls.lock().unwrap().push(request.path.clone());
            let mut results = self.results.lock().unwrap();
            match results.get_mut(&request.path) {
                Some(script) if !script.is_empty() => script.remove(0).result(),
                _ => Ok(()),
            }
        }

        async fn remove_empty_dir(&self, path: &Path) -> Result<(), DeleteError> {
            self.pruned.lock().unwrap().push(path.to_path_buf());
            Ok(())
        }
    }

    struct Fixture {
        worker: DeletionWorker,
        backend: Arc<ScriptedBackend>,
        events: Arc<MemoryEventSink>,
    }

    async fn fixture(days: u32, backend: ScriptedBackend, retry: RetryPolicy) -> Fixture {
        let scheduler = Arc::new(RetentionScheduler::new(
            Arc::new(RetentionPolicy::with_default(30).with_override("acme", days)),
            PathTimeCodec::new(PathSchema::with_device()),
        ));
        scheduler.track(PathBuf::from(PATH)).await.unwrap();

        let backend = Arc::new(backend);
        let events = Arc::new(MemoryEventSink::new());
        let worker = DeletionWorker::new(scheduler, backend.clone(), events.clone(), retry);
        Fixture {
            worker,
            backend,
            events,
        }
    }

    fn feb_first() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 2, 1, 0, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn due_entry_is_deleted_and_finalized() {
        let mut f = fixture(30, ScriptedBackend::default(), RetryPolicy::default()).await;

        let report = f.worker.tick(feb_first()).await;

        assert_eq!(report.deleted, 1);
        assert_eq!(f.backend.calls(), vec![PathBuf::from(PATH)]);
        assert!(f.worker.scheduler().is_empty().await);
        assert!(!f.worker.scheduler().is_tracked(Path::new(PATH)).await);

        let events = f.events.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].outcome, OutcomeKind::Deleted);
        assert_eq!(events[0].tenant, TenantId::new("acme"));
        assert_eq!(
            events[0].expire_at,
            Utc.with_ymd_and_hms(2023, 1, 31, 0, 0, 0).unwrap()
        );
    }

    #[tokio::test]
    async fn entry_not_yet_due_is_not_attempted() {
        let mut f = fixture(60, ScriptedBackend::default(), RetryPolicy::default()).await;

        let report = f.worker.tick(feb_first()).await;

        assert_eq!(report, TickReport::default());
        assert!(f.backend.calls().is_empty());
        assert_eq!(f.worker.scheduler().len().await, 1);
    }

    #[tokio::test]
    async fn not_empty_is_retried_after_delay() {
        let backend = ScriptedBackend::default().script(PATH, vec![Scripted::NotEmpty]);
        let mut f = fixture(30, backend, RetryPolicy::default()).await;
        let now = feb_first();

        let report = f.worker.tick(now).await;
        assert_eq!(report.retried, 1);
        assert_eq!(
            f.worker.scheduler().next_due().await,
            Some(now + TimeDelta::seconds(60))
        );

        let report = f.worker.tick(now + TimeDelta::seconds(59)).await;
        assert_eq!(report.processed, 0);
        assert_eq!(f.backend.calls().len(), 1);

        let report = f.worker.tick(now + TimeDelta::seconds(61)).await;
        assert_eq!(report.deleted, 1);
        assert_eq!(f.backend.calls().len(), 2);

        assert_eq!(
            f.events.outcomes(),
            vec![OutcomeKind::RetryScheduled, OutcomeKind::Deleted]
        );
        assert_eq!(f.events.events()[1].retries, 1);
    }

    #[tokio::test]
    async fn retry_expiry_grows_by_fixed_backoff() {
        let retry = RetryPolicy {
            max_retries: Some(100),
            ..RetryPolicy::default()
        };
        let mut f = fixture(30, ScriptedBackend::always_not_empty(PATH), retry).await;

        let mut now = feb_first();
        let mut last = f.worker.scheduler().next_due().await.unwrap();
        for _ in 0..10 {
            let report = f.worker.tick(now).await;
            assert_eq!(report.retried, 1, "one attempt per tick, no livelock");

            let next = f.worker.scheduler().next_due().await.unwrap();
            assert!(next > last);
            assert_eq!(next, now + TimeDelta::seconds(60));
            last = next;
            now = next;
        }
        assert_eq!(f.worker.scheduler().counts().await.retries, 10);
    }

    #[tokio::test]
    async fn retry_cap_gives_up() {
        let retry = RetryPolicy {
            max_retries: Some(2),
            ..RetryPolicy::default()
        };
        let mut f = fixture(30, ScriptedBackend::always_not_empty(PATH), retry).await;

        let mut now = feb_first();
        for _ in 0..3 {
            f.worker.tick(now).await;
            now += TimeDelta::seconds(61);
        }

        assert_eq!(
            f.events.outcomes(),
            vec![
                OutcomeKind::RetryScheduled,
                OutcomeKind::RetryScheduled,
                OutcomeKind::GivenUp
            ]
        );
        assert!(f.worker.scheduler().is_empty().await);
        assert_eq!(f.worker.scheduler().counts().await.given_up, 1);

        // nothing left to do
        assert_eq!(f.worker.tick(now + TimeDelta::days(1)).await.processed, 0);
    }

    #[tokio::test]
    async fn not_found_is_silent_success() {
        let backend = ScriptedBackend::default().script(PATH, vec![Scripted::NotFound]);
        let mut f = fixture(30, backend, RetryPolicy::default()).await;

        let report = f.worker.tick(feb_first()).await;

        assert_eq!(report.already_gone, 1);
        assert_eq!(f.events.outcomes(), vec![OutcomeKind::AlreadyGone]);
        assert!(!f.events.events()[0].outcome.is_error());
    }

    #[tokio::test]
    async fn other_failure_is_reported_once_and_dropped() {
        let backend = ScriptedBackend::default().script(PATH, vec![Scripted::Denied]);
        let mut f = fixture(30, backend, RetryPolicy::default()).await;

        let report = f.worker.tick(feb_first()).await;
        assert_eq!(report.failed, 1);
        assert!(f.worker.scheduler().is_empty().await);

        let later = f.worker.tick(feb_first() + TimeDelta::days(1)).await;
        assert_eq!(later.processed, 0);
        assert_eq!(f.backend.calls().len(), 1);
        assert!(f.events.events()[0].detail.is_some());
    }

    #[tokio::test]
    async fn tick_drains_every_due_entry_in_order() {
        let mut f = fixture(30, ScriptedBackend::default(), RetryPolicy::default()).await;
        let scheduler = f.worker.scheduler().clone();
        for p in [
            "/data/zeta/devA/2023/01/01/00/02",
            "/data/zeta/devA/2023/01/01/00/01",
            "/data/zeta/devA/2023/06/01/00/00",
        ] {
            scheduler.track(PathBuf::from(p)).await.unwrap();
        }

        let report = f.worker.tick(feb_first()).await;

        assert_eq!(report.deleted, 3);
        assert_eq!(
            f.backend.calls(),
            vec![
                PathBuf::from(PATH),
                PathBuf::from("/data/zeta/devA/2023/01/01/00/01"),
                PathBuf::from("/data/zeta/devA/2023/01/01/00/02"),
            ]
        );
        assert_eq!(scheduler.len().await, 1);
    }

    #[tokio::test]
    async fn prunes_requested_number_of_parents() {
        let f = fixture(30, ScriptedBackend::default(), RetryPolicy::default()).await;
        let mut worker = f.worker.with_prune_levels(2);

        worker.tick(feb_first()).await;

        assert_eq!(
            *f.backend.pruned.lock().unwrap(),
            vec![
                PathBuf::from("/data/acme/devA/2023/01/01/00"),
                PathBuf::from("/data/acme/devA/2023/01/01"),
            ]
        );
    }

    #[tokio::test]
    async fn dry_run_deletes_nothing_and_does_not_reenqueue() {
        let tmp = tempfile::TempDir::new().unwrap();
        let dir = tmp.path().join("acme/devA/2023/01/01/00/00");
        std::fs::create_dir_all(&dir).unwrap();

        let scheduler = Arc::new(RetentionScheduler::new(
            Arc::new(RetentionPolicy::with_default(30)),
            PathTimeCodec::default(),
        ));
        scheduler.track(dir.clone()).await.unwrap();
        let events = Arc::new(MemoryEventSink::new());
        let mut worker = DeletionWorker::new(
            scheduler.clone(),
            Arc::new(DryRunBackend),
            events.clone(),
            RetryPolicy::default(),
        )
        .with_prune_levels(2);

        let report = worker.tick(feb_first()).await;

        assert_eq!(report.deleted, 1);
        assert!(dir.exists());
        assert_eq!(
            scheduler.track(dir).await.unwrap(),
            crate::app::TrackResult::Settled
        );
    }

    #[tokio::test]
    async fn filesystem_delete_end_to_end() {
        let tmp = tempfile::TempDir::new().unwrap();
        let dir = tmp.path().join("acme/devA/2023/01/01/00/00");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("clip.ts"), b"x").unwrap();

        let scheduler = Arc::new(RetentionScheduler::new(
            Arc::new(RetentionPolicy::with_default(30)),
            PathTimeCodec::default(),
        ));
        scheduler.track(dir.clone()).await.unwrap();
        let events = Arc::new(MemoryEventSink::new());
        let mut worker = DeletionWorker::new(
            scheduler.clone(),
            Arc::new(FsDeletionBackend::default()),
            events.clone(),
            RetryPolicy::default(),
        )
        .with_prune_levels(1);

        let now = feb_first();
        assert_eq!(worker.tick(now).await.retried, 1);
        assert!(dir.exists());

        std::fs::remove_file(dir.join("clip.ts")).unwrap();
        assert_eq!(worker.tick(now + TimeDelta::seconds(61)).await.deleted, 1);
        assert!(!dir.exists());
        // the hour directory was emptied and pruned, the day directory kept
        assert!(!tmp.path().join("acme/devA/2023/01/01/00").exists());
        assert!(tmp.path().join("acme/devA/2023/01/01").exists());
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limit_spaces_out_deletes() {
        let f = fixture(30, ScriptedBackend::default(), RetryPolicy::default()).await;
        let scheduler = f.worker.scheduler().clone();
        for m in 1..5 {
            scheduler
                .track(PathBuf::from(format!("/data/acme/devA/2023/01/01/00/{m:02}")))
                .await
                .unwrap();
        }
        let mut worker = f.worker.with_rate_limit(Some(2));

        let start = tokio::time::Instant::now();
        let report = worker.tick(feb_first()).await;

        assert_eq!(report.deleted, 5);
        // first token is immediate, then one every 500ms
        assert!(start.elapsed() >= Duration::from_millis(2_000));
    }

    /// Backend that sleeps inside delete and records how many calls overlap.
    #[derive(Default)]
    struct SlowBackend {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl DeletionBackend for SlowBackend {
        async fn delete(&self, _request: &DeleteRequest) -> Result<(), DeleteError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(())
        }

        async fn remove_empty_dir(&self, _path: &Path) -> Result<(), DeleteError> {
            Ok(())
        }
    }

    #[rstest]
    #[case::serial(1, 1)]
    #[case::bounded(4, 4)]
    #[case::more_workers_than_entries(16, 8)]
    #[tokio::test(start_paused = true)]
    async fn deletes_overlap_up_to_concurrency(#[case] workers: usize, #[case] expected_peak: usize) {
        let scheduler = Arc::new(RetentionScheduler::new(
            Arc::new(RetentionPolicy::with_default(30)),
            PathTimeCodec::default(),
        ));
        for m in 0..8 {
            scheduler
                .track(PathBuf::from(format!("/data/zeta/devA/2023/01/01/00/{m:02}")))
                .await
                .unwrap();
        }
        let backend = Arc::new(SlowBackend::default());
        let events = Arc::new(MemoryEventSink::new());
        let mut worker = DeletionWorker::new(
            scheduler.clone(),
            backend.clone(),
            events.clone(),
            RetryPolicy::default(),
        )
        .with_concurrency(workers);

        let report = worker.tick(feb_first()).await;

        assert_eq!(report.deleted, 8);
        assert_eq!(backend.peak.load(Ordering::SeqCst), expected_peak);
        assert_eq!(backend.in_flight.load(Ordering::SeqCst), 0);
        assert!(scheduler.is_empty().await);
        assert_eq!(events.outcomes().len(), 8);
    }

    #[tokio::test]
    async fn concurrent_retries_are_rescheduled_not_lost() {
        let backend = ScriptedBackend::always_not_empty(PATH)
            .script("/data/acme/devA/2023/01/01/00/01", vec![Scripted::Denied]);
        let mut f = fixture(30, backend, RetryPolicy::default()).await;
        let scheduler = f.worker.scheduler().clone();
        for m in 1..4 {
            scheduler
                .track(PathBuf::from(format!("/data/acme/devA/2023/01/01/00/{m:02}")))
                .await
                .unwrap();
        }
        let mut worker = f.worker.with_concurrency(3);

        let report = worker.tick(feb_first()).await;

        assert_eq!(report.processed, 4);
        assert_eq!(report.retried, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.deleted, 2);
        assert!(scheduler.is_tracked(Path::new(PATH)).await);
        assert_eq!(scheduler.len().await, 1);
    }
}
