//! EventSink implementations.

use std::sync::Mutex;

use crate::domain::{OutcomeKind, SweepEvent};
use crate::ports::EventSink;

/// Writes each event as one structured `tracing` record.
///
/// Levels: deleted at info, retry and already-gone at debug, given-up at
/// warn, failures at error.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn emit(&self, event: &SweepEvent) {
        let path = event.path.display();
        let tenant = event.tenant.as_str();
        let expire_at = event.expire_at.to_rfc3339();
        let outcome = event.outcome.as_str();
        let detail = event.detail.as_deref().unwrap_or("");

        match event.outcome {
            OutcomeKind::Deleted => tracing::info!(
                %path, tenant, %expire_at, outcome, retries = event.retries,
                "directory deleted"
            ),
            OutcomeKind::AlreadyGone => tracing::debug!(
                %path, tenant, %expire_at, outcome,
                "directory already gone"
            ),
            OutcomeKind::RetryScheduled => tracing::debug!(
                %path, tenant, %expire_at, outcome, retries = event.retries, detail,
                "directory not empty, retry scheduled"
            ),
            OutcomeKind::GivenUp => tracing::warn!(
                %path, tenant, %expire_at, outcome, retries = event.retries, detail,
                "giving up on directory"
            ),
            OutcomeKind::Failed => tracing::error!(
                %path, tenant, %expire_at, outcome, retries = event.retries, detail,
                "failed to delete directory"
            ),
        }
    }
}

/// Keeps every event in memory (for tests and embedding).
#[derive(Debug, Default)]
pub struct MemoryEventSink {
    events: Mutex<Vec<SweepEvent>>,
}

impl MemoryEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<SweepEvent> {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn outcomes(&self) -> Vec<OutcomeKind> {
        self.events().into_iter().map(|e| e.outcome).collect()
    }
}

impl EventSink for MemoryEventSink {
    fn emit(&self, event: &SweepEvent) {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event.clone());
    }
}
