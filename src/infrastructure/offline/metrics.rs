use crate::domain::entities::SyncResult;
use crate::domain::value_objects::{ActionId, ActionKind};
use serde::Serialize;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ActionOutcome {
    Success,
    Failure,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SyncMetricsSnapshot {
    pub total_success: u64,
    pub total_failure: u64,
    pub consecutive_failure: u64,
    pub passes: u64,
    pub skipped_passes: u64,
    pub last_success_ms: Option<u64>,
    pub last_failure_ms: Option<u64>,
    pub last_outcome: Option<ActionOutcome>,
    pub last_action_id: Option<i64>,
    pub last_action_kind: Option<ActionKind>,
    pub last_pass_duration_ms: Option<u64>,
    pub last_pass_synced: Option<u32>,
    pub last_pass_failed: Option<u32>,
    pub last_pass_at_ms: Option<u64>,
}

#[derive(Default, Clone)]
struct LastOutcome {
    outcome: Option<ActionOutcome>,
    action_id: Option<i64>,
    action_kind: Option<ActionKind>,
    pass_duration_ms: Option<u64>,
    pass_synced: Option<u32>,
    pass_failed: Option<u32>,
    pass_at_ms: Option<u64>,
}

/// Replay outcome counters owned by one coordinator.
pub struct SyncMetrics {
    success: AtomicU64,
    failure: AtomicU64,
    consecutive_failure: AtomicU64,
    passes: AtomicU64,
    skipped_passes: AtomicU64,
    last_success_ms: AtomicU64,
    last_failure_ms: AtomicU64,
    last: Mutex<LastOutcome>,
}

impl SyncMetrics {
    pub fn new() -> Self {
        Self {
            success: AtomicU64::new(0),
            failure: AtomicU64::new(0),
            consecutive_failure: AtomicU64::new(0),
            passes: AtomicU64::new(0),
            skipped_passes: AtomicU64::new(0),
            last_success_ms: AtomicU64::new(0),
            last_failure_ms: AtomicU64::new(0),
            last: Mutex::new(LastOutcome::default()),
        }
    }

    pub fn record_action(&self, outcome: ActionOutcome, id: ActionId, kind: ActionKind) {
        match outcome {
            ActionOutcome::Success => {
                self.success.fetch_add(1, Ordering::Relaxed);
                self.last_success_ms
                    .store(current_unix_ms(), Ordering::Relaxed);
                self.consecutive_failure.store(0, Ordering::Relaxed);
            }
            ActionOutcome::Failure => {
                self.failure.fetch_add(1, Ordering::Relaxed);
                self.last_failure_ms
                    .store(current_unix_ms(), Ordering::Relaxed);
                self.consecutive_failure.fetch_add(1, Ordering::Relaxed);
            }
        }

        if let Ok(mut guard) = self.last.lock() {
            guard.outcome = Some(outcome);
            guard.action_id = Some(id.value());
            guard.action_kind = Some(kind);
        }
    }

    pub fn record_pass(&self, duration: Duration, result: &SyncResult) {
        self.passes.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut guard) = self.last.lock() {
            guard.pass_duration_ms = Some(duration.as_millis() as u64);
            guard.pass_synced = Some(result.synced);
            guard.pass_failed = Some(result.failed);
            guard.pass_at_ms = Some(current_unix_ms());
        }
    }

    pub fn record_skip(&self) {
        self.skipped_passes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> SyncMetricsSnapshot {
        let last = self
            .last
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default();

        SyncMetricsSnapshot {
            total_success: self.success.load(Ordering::Relaxed),
            total_failure: self.failure.load(Ordering::Relaxed),
            consecutive_failure: self.consecutive_failure.load(Ordering::Relaxed),
            passes: self.passes.load(Ordering::Relaxed),
            skipped_passes: self.skipped_passes.load(Ordering::Relaxed),
            last_success_ms: to_option(self.last_success_ms.load(Ordering::Relaxed)),
            last_failure_ms: to_option(self.last_failure_ms.load(Ordering::Relaxed)),
            last_outcome: last.outcome,
            last_action_id: last.action_id,
            last_action_kind: last.action_kind,
            last_pass_duration_ms: last.pass_duration_ms,
            last_pass_synced: last.pass_synced,
            last_pass_failed: last.pass_failed,
            last_pass_at_ms: last.pass_at_ms,
        }
    }
}

impl Default for SyncMetrics {
    fn default() -> Self {
        Self::new()
    }
}

fn to_option(value: u64) -> Option<u64> {
    if value == 0 { None } else { Some(value) }
}

fn current_unix_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_resets_consecutive_failures() {
        let metrics = SyncMetrics::new();
        let id = ActionId::new(1).unwrap();

        metrics.record_action(ActionOutcome::Failure, id, ActionKind::CheckIn);
        metrics.record_action(ActionOutcome::Failure, id, ActionKind::CheckIn);
        assert_eq!(metrics.snapshot().consecutive_failure, 2);

        metrics.record_action(ActionOutcome::Success, id, ActionKind::CheckIn);
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.total_success, 1);
        assert_eq!(snapshot.total_failure, 2);
        assert_eq!(snapshot.consecutive_failure, 0);
        assert_eq!(snapshot.last_outcome, Some(ActionOutcome::Success));
        assert_eq!(snapshot.last_action_id, Some(1));
        assert!(snapshot.last_success_ms.is_some());
    }

    #[test]
    fn pass_and_skip_are_counted_separately() {
        let metrics = SyncMetrics::new();
        let mut result = SyncResult::new();
        result.record_synced();

        metrics.record_pass(Duration::from_millis(120), &result);
        metrics.record_skip();

        let snapshot = metrics.snapshot();
        assert_eq!((snapshot.passes, snapshot.skipped_passes), (1, 1));
        assert_eq!(snapshot.last_pass_duration_ms, Some(120));
        assert_eq!(snapshot.last_pass_synced, Some(1));
        assert!(snapshot.last_outcome.is_none());
    }
}
