use crate::domain::entities::SyncResult;

/// Progress sink for sync-status UI. Called from inside the pass, so
/// implementations should return quickly.
pub trait SyncObserver: Send + Sync {
    fn on_progress(&self, _current: usize, _total: usize) {}
    fn on_complete(&self, _result: &SyncResult) {}
}
