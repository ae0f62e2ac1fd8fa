use crate::application::ports::{
    Connectivity, EntityCache, MutationQueue, RemoteRequest, RemoteTransport, SyncMetadataStore,
    SyncObserver,
};
use crate::domain::entities::{
    CachedBudgetItem, CachedGuest, CachedRecord, CachedVendor, PendingAction, SkipReason,
    SyncErrorEntry, SyncResult,
};
use crate::domain::value_objects::offline::CheckInPayload;
use crate::domain::value_objects::{ActionPayload, EntityKind};
use crate::infrastructure::offline::{ActionOutcome, SyncMetrics, SyncMetricsSnapshot};
use crate::shared::error::AppError;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock as StdRwLock};
use std::time::Instant;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

// Ten years; larger thresholds mean "never stale".
const MAX_STALE_THRESHOLD_MINUTES: i64 = 10 * 365 * 24 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    Idle,
    Syncing,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    pub state: SyncState,
    pub last_result: Option<SyncResult>,
    pub last_sync_at: Option<DateTime<Utc>>,
}

/// The three cache families written by sync side effects.
#[derive(Clone)]
pub struct EntityCaches {
    pub guests: Arc<dyn EntityCache<CachedGuest>>,
    pub budgets: Arc<dyn EntityCache<CachedBudgetItem>>,
    pub vendors: Arc<dyn EntityCache<CachedVendor>>,
}

/// Holds the single-flight flag for one pass and clears it when dropped,
/// including when the pass task panics.
struct SyncingGuard {
    flag: Arc<AtomicBool>,
}

impl SyncingGuard {
    fn acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag: flag.clone() })
    }
}

impl Drop for SyncingGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Replays the mutation queue against the remote API, one pass at a time.
///
/// Every trigger (connectivity edge, manual call, host background task) ends
/// up in [`SyncCoordinator::run_sync`]. A trigger that arrives while a pass is
/// running is reported as skipped rather than queued. The pass itself runs on
/// its own task, so a caller that gives up waiting does not cut it short.
#[derive(Clone)]
pub struct SyncCoordinator {
    queue: Arc<dyn MutationQueue>,
    transport: Arc<dyn RemoteTransport>,
    connectivity: Arc<dyn Connectivity>,
    metadata: Arc<dyn SyncMetadataStore>,
    caches: EntityCaches,
    observers: Arc<StdRwLock<Vec<Arc<dyn SyncObserver>>>>,
    syncing: Arc<AtomicBool>,
    last_result: Arc<RwLock<Option<SyncResult>>>,
    metrics: Arc<SyncMetrics>,
    auto_sync: bool,
}

impl SyncCoordinator {
    pub fn new(
        queue: Arc<dyn MutationQueue>,
        transport: Arc<dyn RemoteTransport>,
        connectivity: Arc<dyn Connectivity>,
        metadata: Arc<dyn SyncMetadataStore>,
        caches: EntityCaches,
    ) -> Self {
        Self {
            queue,
            transport,
            connectivity,
            metadata,
            caches,
            observers: Arc::new(StdRwLock::new(Vec::new())),
            syncing: Arc::new(AtomicBool::new(false)),
            last_result: Arc::new(RwLock::new(None)),
            metrics: Arc::new(SyncMetrics::new()),
            auto_sync: true,
        }
    }

    pub fn with_auto_sync(mut self, enabled: bool) -> Self {
        self.auto_sync = enabled;
        self
    }

    pub fn subscribe(&self, observer: Arc<dyn SyncObserver>) {
        if let Ok(mut observers) = self.observers.write() {
            observers.push(observer);
        }
    }

    pub async fn run_sync(&self) -> Result<SyncResult, AppError> {
        if !self.connectivity.is_online() {
            info!(target: "offline::sync", "sync skipped: offline");
            self.metrics.record_skip();
            return Ok(SyncResult::skipped(SkipReason::Offline));
        }

        let Some(guard) = SyncingGuard::acquire(&self.syncing) else {
            debug!(target: "offline::sync", "sync skipped: pass already running");
            self.metrics.record_skip();
            return Ok(SyncResult::skipped(SkipReason::AlreadySyncing));
        };

        let coordinator = self.clone();
        let pass = tokio::spawn(async move {
            let _guard = guard;
            let outcome = coordinator.run_pass().await;
            if let Ok(result) = &outcome {
                *coordinator.last_result.write().await = Some(result.clone());
            }
            outcome
        });

        pass.await
            .map_err(|err| AppError::Internal(format!("sync pass task failed: {err}")))?
    }

    /// Moves failed actions under the retry ceiling back to pending, then runs
    /// a pass.
    pub async fn retry_failed(&self) -> Result<SyncResult, AppError> {
        let requeued = self.queue.requeue_failed().await?;
        debug!(target: "offline::sync", requeued, "retrying failed actions");
        self.run_sync().await
    }

    /// Runs a pass on every offline -> online transition.
    pub fn spawn_online_listener(&self) -> JoinHandle<()> {
        let coordinator = self.clone();
        let mut changes = self.connectivity.subscribe();
        tokio::spawn(async move {
            let mut was_online = *changes.borrow_and_update();
            while changes.changed().await.is_ok() {
                let online = *changes.borrow_and_update();
                let came_online = online && !was_online;
                was_online = online;
                if !came_online || !coordinator.auto_sync {
                    continue;
                }

                info!(target: "offline::sync", "connectivity restored; starting sync");
                match coordinator.run_sync().await {
                    Ok(result) => debug!(
                        target: "offline::sync",
                        synced = result.synced,
                        failed = result.failed,
                        "online-triggered sync finished"
                    ),
                    Err(err) if err.is_fatal() => {
                        error!(
                            target: "offline::sync",
                            error = %err,
                            "store unusable; stopping connectivity listener"
                        );
                        break;
                    }
                    Err(err) => error!(
                        target: "offline::sync",
                        error = %err,
                        "online-triggered sync failed"
                    ),
                }
            }
            debug!(target: "offline::sync", "connectivity listener stopped");
        })
    }

    pub async fn status(&self) -> Result<SyncStatus, AppError> {
        let state = if self.syncing.load(Ordering::Acquire) {
            SyncState::Syncing
        } else {
            SyncState::Idle
        };
        let last_result = self.last_result.read().await.clone();
        Ok(SyncStatus {
            state,
            last_result,
            last_sync_at: self.metadata.last_sync_at().await?,
        })
    }

    pub fn metrics(&self) -> SyncMetricsSnapshot {
        self.metrics.snapshot()
    }

    /// True when no pass has completed within `threshold_minutes`.
    pub async fn is_data_stale(&self, threshold_minutes: u64) -> Result<bool, AppError> {
        let Some(last) = self.metadata.last_sync_at().await? else {
            return Ok(true);
        };
        let minutes = i64::try_from(threshold_minutes)
            .unwrap_or(MAX_STALE_THRESHOLD_MINUTES)
            .min(MAX_STALE_THRESHOLD_MINUTES);
        Ok(Utc::now() - last > Duration::minutes(minutes))
    }

    pub async fn cache_guests(&self, guests: Vec<CachedGuest>) -> Result<usize, AppError> {
        self.caches.guests.upsert_all(guests).await
    }

    pub async fn cache_budget_items(&self, items: Vec<CachedBudgetItem>) -> Result<usize, AppError> {
        self.caches.budgets.upsert_all(items).await
    }

    pub async fn cache_vendors(&self, vendors: Vec<CachedVendor>) -> Result<usize, AppError> {
        self.caches.vendors.upsert_all(vendors).await
    }

    pub async fn refresh_guests(
        &self,
        wedding_id: &str,
        guests: Vec<CachedGuest>,
    ) -> Result<usize, AppError> {
        self.caches.guests.replace_for_parent(wedding_id, guests).await
    }

    pub async fn refresh_budget_items(
        &self,
        wedding_id: &str,
        items: Vec<CachedBudgetItem>,
    ) -> Result<usize, AppError> {
        self.caches.budgets.replace_for_parent(wedding_id, items).await
    }

    pub async fn refresh_vendors(
        &self,
        wedding_id: &str,
        vendors: Vec<CachedVendor>,
    ) -> Result<usize, AppError> {
        self.caches.vendors.replace_for_parent(wedding_id, vendors).await
    }

    pub async fn get_cached_guests(&self, wedding_id: &str) -> Result<Vec<CachedGuest>, AppError> {
        self.caches.guests.list_for_parent(wedding_id).await
    }

    pub async fn get_cached_budget_items(
        &self,
        wedding_id: &str,
    ) -> Result<Vec<CachedBudgetItem>, AppError> {
        self.caches.budgets.list_for_parent(wedding_id).await
    }

    pub async fn get_cached_vendors(&self, wedding_id: &str) -> Result<Vec<CachedVendor>, AppError> {
        self.caches.vendors.list_for_parent(wedding_id).await
    }

    async fn run_pass(&self) -> Result<SyncResult, AppError> {
        let pass_id = Uuid::new_v4();
        let started = Instant::now();
        let actions = self.queue.list_pending().await?;
        let total = actions.len();
        info!(target: "offline::sync", %pass_id, total, "sync pass started");

        let mut result = SyncResult::new();
        for (index, action) in actions.iter().enumerate() {
            self.replay(pass_id, action, &mut result).await;
            self.notify_progress(index + 1, total);
        }

        let finished_at = Utc::now();
        if let Err(err) = self.metadata.set_last_sync_at(finished_at).await {
            warn!(
                target: "offline::sync",
                %pass_id,
                error = %err,
                "failed to record last sync time"
            );
        }

        self.metrics.record_pass(started.elapsed(), &result);
        self.notify_complete(&result);
        info!(
            target: "offline::sync",
            %pass_id,
            synced = result.synced,
            failed = result.failed,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "sync pass finished"
        );
        Ok(result)
    }

    async fn replay(&self, pass_id: Uuid, action: &PendingAction, result: &mut SyncResult) {
        let action = match self.queue.mark_syncing(action.id).await {
            Ok(updated) => updated,
            Err(err) => {
                warn!(
                    target: "offline::sync",
                    %pass_id,
                    action_id = %action.id,
                    kind = %action.kind(),
                    error = %err,
                    "could not claim action; left untouched"
                );
                result.record_failure(SyncErrorEntry {
                    action_id: action.id,
                    kind: action.kind(),
                    message: err.to_string(),
                    retry_count: action.retry_count,
                });
                return;
            }
        };

        let response = match self.transport.send(RemoteRequest::from_action(&action)).await {
            Ok(response) if response.is_success() => Ok(response),
            Ok(response) => Err(response.into_error()),
            Err(err) => Err(err),
        };

        match response {
            Ok(response) => match self.queue.remove(action.id).await {
                Ok(()) => {
                    result.record_synced();
                    self.metrics
                        .record_action(ActionOutcome::Success, action.id, action.kind());
                    debug!(
                        target: "offline::sync",
                        %pass_id,
                        action_id = %action.id,
                        kind = %action.kind(),
                        status = response.status,
                        "action synced"
                    );
                    self.apply_cache_effects(&action, response.body).await;
                }
                Err(err) => {
                    // Acknowledged remotely but still queued; it will be replayed.
                    let err = AppError::Internal(format!("acknowledged but not removed: {err}"));
                    self.fail(pass_id, &action, err, result).await;
                }
            },
            Err(err) => {
                self.fail(pass_id, &action, err, result).await;
            }
        }
    }

    async fn fail(
        &self,
        pass_id: Uuid,
        action: &PendingAction,
        err: AppError,
        result: &mut SyncResult,
    ) {
        let message = err.to_string();
        let updated = match self.queue.mark_failed(action.id, &message).await {
            Ok(updated) => Some(updated),
            Err(mark_err) => {
                error!(
                    target: "offline::sync",
                    %pass_id,
                    action_id = %action.id,
                    error = %mark_err,
                    "could not record action failure"
                );
                None
            }
        };
        let retry_count = updated
            .as_ref()
            .map_or(action.retry_count, |updated| updated.retry_count);

        if err.is_replay_failure() {
            warn!(
                target: "offline::sync",
                %pass_id,
                action_id = %action.id,
                kind = %action.kind(),
                retry_count,
                error = %message,
                "action failed"
            );
        } else {
            error!(
                target: "offline::sync",
                %pass_id,
                action_id = %action.id,
                kind = %action.kind(),
                retry_count,
                error = %message,
                "action failed outside the remote call"
            );
        }
        if updated.as_ref().is_some_and(PendingAction::is_exhausted) {
            let exhausted = AppError::RetryExhausted(format!(
                "action {} failed {retry_count} times",
                action.id
            ));
            warn!(
                target: "offline::sync",
                %pass_id,
                action_id = %action.id,
                kind = %action.kind(),
                error = %exhausted,
                "action left for manual intervention"
            );
        }

        self.metrics
            .record_action(ActionOutcome::Failure, action.id, action.kind());
        result.record_failure(SyncErrorEntry {
            action_id: action.id,
            kind: action.kind(),
            message,
            retry_count,
        });
    }

    async fn apply_cache_effects(&self, action: &PendingAction, body: Option<Value>) {
        let outcome = match &action.payload {
            ActionPayload::CreateEntity(payload) => self.cache_response(payload.entity, body).await,
            ActionPayload::EditEntity(payload) => self.cache_response(payload.entity, body).await,
            ActionPayload::DeleteEntity(payload) => {
                self.evict(payload.entity, &payload.entity_id).await
            }
            ActionPayload::CheckIn(payload) => self.patch_check_in(payload).await,
            ActionPayload::Other(_) => Ok(()),
        };
        if let Err(err) = outcome {
            warn!(
                target: "offline::cache",
                action_id = %action.id,
                kind = %action.kind(),
                error = %err,
                "cache update after sync failed"
            );
        }
    }

    async fn cache_response(&self, entity: EntityKind, body: Option<Value>) -> Result<(), AppError> {
        let Some(body) = body.filter(Value::is_object) else {
            return Ok(());
        };
        match entity {
            EntityKind::Guest => upsert_response(self.caches.guests.as_ref(), body).await,
            EntityKind::BudgetItem => upsert_response(self.caches.budgets.as_ref(), body).await,
            EntityKind::Vendor => upsert_response(self.caches.vendors.as_ref(), body).await,
        }
    }

    async fn evict(&self, entity: EntityKind, id: &str) -> Result<(), AppError> {
        let removed = match entity {
            EntityKind::Guest => self.caches.guests.remove(id).await?,
            EntityKind::BudgetItem => self.caches.budgets.remove(id).await?,
            EntityKind::Vendor => self.caches.vendors.remove(id).await?,
        };
        debug!(target: "offline::cache", %entity, id, removed, "cached record evicted");
        Ok(())
    }

    async fn patch_check_in(&self, check_in: &CheckInPayload) -> Result<(), AppError> {
        let Some(mut guest) = self.caches.guests.get(&check_in.guest_id).await? else {
            return Ok(());
        };
        guest.apply_check_in(check_in);
        self.caches.guests.upsert_all(vec![guest]).await?;
        Ok(())
    }

    fn observers(&self) -> Vec<Arc<dyn SyncObserver>> {
        self.observers
            .read()
            .map(|observers| observers.clone())
            .unwrap_or_default()
    }

    fn notify_progress(&self, current: usize, total: usize) {
        for observer in self.observers() {
            observer.on_progress(current, total);
        }
    }

    fn notify_complete(&self, result: &SyncResult) {
        for observer in self.observers() {
            observer.on_complete(result);
        }
    }
}

async fn upsert_response<R: CachedRecord>(
    cache: &dyn EntityCache<R>,
    body: Value,
) -> Result<(), AppError> {
    match serde_json::from_value::<R>(body) {
        Ok(record) => {
            cache.upsert_all(vec![record]).await?;
            Ok(())
        }
        Err(err) => {
            debug!(
                target: "offline::cache",
                entity = %R::ENTITY,
                error = %err,
                "response body is not a cacheable record"
            );
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::RemoteResponse;
    use crate::domain::entities::{NewAction, QueueStats};
    use crate::domain::value_objects::offline::{CreateEntityPayload, DeleteEntityPayload};
    use crate::domain::value_objects::{ActionStatus, HttpMethod, RemoteTarget};
    use crate::infrastructure::cache::StoreEntityCache;
    use crate::infrastructure::network::ConnectivityMonitor;
    use crate::infrastructure::offline::{STORE_VERSION, StoreMutationQueue, StoreSyncMetadata, upgrade};
    use crate::infrastructure::store::{PersistentStore, StoreOptions};
    use async_trait::async_trait;
    use mockall::{Sequence, mock};
    use serde_json::{Map, json};
    use std::sync::Mutex;
    use tempfile::TempDir;

    mock! {
        pub Transport {}

        #[async_trait]
        impl RemoteTransport for Transport {
            async fn send(&self, request: RemoteRequest) -> Result<RemoteResponse, AppError>;
        }
    }

    struct Harness {
        _dir: TempDir,
        queue: Arc<StoreMutationQueue>,
        connectivity: Arc<ConnectivityMonitor>,
        coordinator: SyncCoordinator,
    }

    async fn harness(transport: MockTransport, online: bool) -> Harness {
        let dir = TempDir::new().unwrap();
        let url = format!("sqlite://{}", dir.path().join("sync.db").display());
        let store = PersistentStore::open(StoreOptions::new(url, "test"), STORE_VERSION, upgrade)
            .await
            .unwrap();
        let queue = Arc::new(StoreMutationQueue::open(&store).await.unwrap());
        let connectivity = Arc::new(ConnectivityMonitor::new(online));
        let caches = EntityCaches {
            guests: Arc::new(StoreEntityCache::<CachedGuest>::open(&store).unwrap()),
            budgets: Arc::new(StoreEntityCache::<CachedBudgetItem>::open(&store).unwrap()),
            vendors: Arc::new(StoreEntityCache::<CachedVendor>::open(&store).unwrap()),
        };
        let coordinator = SyncCoordinator::new(
            queue.clone(),
            Arc::new(transport),
            connectivity.clone(),
            Arc::new(StoreSyncMetadata::open(&store).unwrap()),
            caches,
        );
        Harness {
            _dir: dir,
            queue,
            connectivity,
            coordinator,
        }
    }

    fn note(path: &str) -> NewAction {
        NewAction::new(
            ActionPayload::Other(json!({ "path": path })),
            RemoteTarget::new(path).unwrap(),
            HttpMethod::Post,
        )
    }

    #[derive(Default)]
    struct RecordingObserver {
        progress: Mutex<Vec<(usize, usize)>>,
        completed: Mutex<Vec<SyncResult>>,
    }

    impl SyncObserver for RecordingObserver {
        fn on_progress(&self, current: usize, total: usize) {
            self.progress.lock().unwrap().push((current, total));
        }

        fn on_complete(&self, result: &SyncResult) {
            self.completed.lock().unwrap().push(result.clone());
        }
    }

    #[tokio::test]
    async fn replays_in_order_and_continues_after_failure() {
        let mut transport = MockTransport::new();
        let mut seq = Sequence::new();
        transport
            .expect_send()
            .withf(|request| request.target.as_str() == "/a")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(RemoteResponse::new(201, "")));
        transport
            .expect_send()
            .withf(|request| request.target.as_str() == "/b")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(RemoteResponse::json(422, json!({"error": "bad input"}))));
        transport
            .expect_send()
            .withf(|request| request.target.as_str() == "/c")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(AppError::Transport("connection reset".into())));
        transport
            .expect_send()
            .withf(|request| request.target.as_str() == "/d")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(RemoteResponse::new(204, "")));

        let h = harness(transport, true).await;
        let observer = Arc::new(RecordingObserver::default());
        h.coordinator.subscribe(observer.clone());
        for path in ["/a", "/b", "/c", "/d"] {
            h.queue.enqueue(note(path)).await.unwrap();
        }

        let result = h.coordinator.run_sync().await.unwrap();

        assert!(!result.success);
        assert_eq!((result.synced, result.failed), (2, 2));
        assert_eq!(result.errors[0].message, "Remote rejected request (422): bad input");
        assert_eq!(result.errors[0].retry_count, 1);
        assert!(result.errors[1].message.contains("connection reset"));

        let failed = h.queue.list_failed().await.unwrap();
        assert_eq!(failed.len(), 2);
        assert!(failed.iter().all(|a| a.status == ActionStatus::Failed));

        assert_eq!(
            *observer.progress.lock().unwrap(),
            vec![(1, 4), (2, 4), (3, 4), (4, 4)]
        );
        assert_eq!(observer.completed.lock().unwrap().len(), 1);

        let metrics = h.coordinator.metrics();
        assert_eq!((metrics.total_success, metrics.total_failure), (2, 2));
        let status = h.coordinator.status().await.unwrap();
        assert_eq!(status.state, SyncState::Idle);
        assert!(status.last_sync_at.is_some());
        assert_eq!(status.last_result, Some(result));
    }

    #[tokio::test]
    async fn local_send_errors_still_mark_action_failed() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .times(3)
            .returning(|_| Err(AppError::ConfigurationError("bad client".into())));

        let h = harness(transport, true).await;
        let id = h.queue.enqueue(note("/a")).await.unwrap();

        let result = h.coordinator.run_sync().await.unwrap();
        assert_eq!(result.failed, 1);
        assert_eq!(result.errors[0].message, "Configuration error: bad client");

        h.coordinator.retry_failed().await.unwrap();
        let result = h.coordinator.retry_failed().await.unwrap();
        assert_eq!(result.errors[0].retry_count, 3);

        let action = h.queue.get(id).await.unwrap().unwrap();
        assert!(action.is_exhausted());
        assert_eq!(h.queue.requeue_failed().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn status_is_idle_again_after_each_pass() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .times(1)
            .returning(|_| Ok(RemoteResponse::new(204, "")));
        let h = harness(transport, true).await;
        h.queue.enqueue(note("/a")).await.unwrap();

        h.coordinator.run_sync().await.unwrap();
        assert_eq!(h.coordinator.status().await.unwrap().state, SyncState::Idle);

        let second = h.coordinator.run_sync().await.unwrap();
        assert_eq!(second.skipped, None);
        assert_eq!(second.attempted(), 0);
    }

    #[tokio::test]
    async fn offline_pass_does_nothing() {
        let mut transport = MockTransport::new();
        transport.expect_send().never();
        let h = harness(transport, false).await;
        h.queue.enqueue(note("/a")).await.unwrap();

        let result = h.coordinator.run_sync().await.unwrap();

        assert_eq!(result.skipped, Some(SkipReason::Offline));
        assert_eq!((result.synced, result.failed), (0, 0));
        assert_eq!(h.queue.list_pending().await.unwrap().len(), 1);
        assert!(h.coordinator.status().await.unwrap().last_sync_at.is_none());
        assert!(h.coordinator.is_data_stale(15).await.unwrap());
    }

    #[tokio::test]
    async fn empty_queue_still_records_sync_time() {
        let mut transport = MockTransport::new();
        transport.expect_send().never();
        let h = harness(transport, true).await;

        let result = h.coordinator.run_sync().await.unwrap();

        assert!(result.success);
        assert_eq!(result.skipped, None);
        assert_eq!(result.attempted(), 0);
        assert!(!h.coordinator.is_data_stale(15).await.unwrap());
    }

    #[tokio::test]
    async fn successful_writes_update_caches() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .withf(|request| request.method == HttpMethod::Post)
            .times(1)
            .returning(|_| {
                Ok(RemoteResponse::json(
                    201,
                    json!({"id": "g-1", "weddingId": "w-1", "firstName": "Ada", "lastName": "Byron"}),
                ))
            });
        transport
            .expect_send()
            .withf(|request| request.method == HttpMethod::Delete)
            .times(1)
            .returning(|_| Ok(RemoteResponse::new(204, "")));

        let h = harness(transport, true).await;
        h.coordinator
            .cache_vendors(vec![CachedVendor::new("v-1", "w-1", "Florist")])
            .await
            .unwrap();

        let mut data = Map::new();
        data.insert("firstName".into(), json!("Ada"));
        h.queue
            .enqueue(NewAction::new(
                ActionPayload::CreateEntity(CreateEntityPayload {
                    entity: EntityKind::Guest,
                    parent_id: "w-1".into(),
                    data,
                }),
                RemoteTarget::new("/api/weddings/w-1/guests").unwrap(),
                HttpMethod::Post,
            ))
            .await
            .unwrap();
        h.queue
            .enqueue(NewAction::new(
                ActionPayload::DeleteEntity(DeleteEntityPayload {
                    entity: EntityKind::Vendor,
                    entity_id: "v-1".into(),
                    parent_id: "w-1".into(),
                }),
                RemoteTarget::new("/api/weddings/w-1/vendors/v-1").unwrap(),
                HttpMethod::Delete,
            ))
            .await
            .unwrap();

        let result = h.coordinator.run_sync().await.unwrap();
        assert_eq!(result.synced, 2);

        let guests = h.coordinator.get_cached_guests("w-1").await.unwrap();
        assert_eq!(guests.len(), 1);
        assert_eq!(guests[0].last_name, "Byron");
        assert!(h.coordinator.get_cached_vendors("w-1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn retry_failed_requeues_then_replays() {
        let mut transport = MockTransport::new();
        let mut seq = Sequence::new();
        transport
            .expect_send()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(RemoteResponse::new(503, "unavailable")));
        transport
            .expect_send()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(RemoteResponse::new(200, "{}")));

        let h = harness(transport, true).await;
        let id = h.queue.enqueue(note("/a")).await.unwrap();

        let first = h.coordinator.run_sync().await.unwrap();
        assert_eq!(first.failed, 1);
        assert_eq!(first.errors[0].message, "Remote rejected request (503): unavailable");

        let second = h.coordinator.retry_failed().await.unwrap();
        assert_eq!(second.synced, 1);
        assert!(h.queue.get(id).await.unwrap().is_none());
        assert_eq!(h.queue.stats().await.unwrap(), QueueStats::default());
    }

    #[tokio::test]
    async fn online_edge_triggers_a_pass() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .times(1)
            .returning(|_| Ok(RemoteResponse::new(200, "")));

        let h = harness(transport, false).await;
        h.queue.enqueue(note("/a")).await.unwrap();

        let observer = Arc::new(RecordingObserver::default());
        h.coordinator.subscribe(observer.clone());
        let listener = h.coordinator.spawn_online_listener();

        h.connectivity.set_online(true);
        for _ in 0..100 {
            if !observer.completed.lock().unwrap().is_empty() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        listener.abort();

        assert_eq!(observer.completed.lock().unwrap().len(), 1);
        assert!(h.queue.list_pending().await.unwrap().is_empty());
    }
}
