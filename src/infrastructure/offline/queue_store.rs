use super::clock::LogicalClock;
use super::mappers::{pending_action_from_row, row_from_new_action};
use super::rows::PendingActionRow;
use super::schema::{QUEUE_COLLECTION, STATUS_INDEX};
use crate::application::ports::MutationQueue;
use crate::domain::entities::{MAX_RETRIES, NewAction, PendingAction, QueueStats};
use crate::domain::value_objects::{ActionId, ActionStatus};
use crate::infrastructure::store::{Collection, PersistentStore, StoreError};
use crate::shared::error::AppError;
use async_trait::async_trait;
use tracing::{debug, info, warn};

pub const INTERRUPTED_ERROR: &str = "interrupted";

/// `MutationQueue` backed by the `offlineQueue` collection.
pub struct StoreMutationQueue {
    queue: Collection,
    clock: LogicalClock,
}

impl StoreMutationQueue {
    /// Opens the queue, seeding the clock from persisted actions and moving
    /// actions left in `Syncing` by a previous process to `Failed`.
    pub async fn open(store: &PersistentStore) -> Result<Self, AppError> {
        let queue = store.collection(QUEUE_COLLECTION)?;
        let rows: Vec<PendingActionRow> = queue.get_all().await?;
        let newest = rows.iter().map(|row| row.enqueued_at).max().unwrap_or(0);
        let clock = LogicalClock::seeded(newest);

        let this = Self { queue, clock };
        let recovered = this.recover_interrupted().await?;
        if recovered > 0 {
            warn!(
                target: "offline::queue",
                recovered,
                "actions interrupted mid-sync marked failed"
            );
        }
        Ok(this)
    }

    async fn recover_interrupted(&self) -> Result<u64, AppError> {
        let rows = self.rows_with_status(ActionStatus::Syncing).await?;
        let mut recovered = 0;
        for row in rows {
            let Some(id) = row.id else { continue };
            let id = ActionId::new(id).map_err(AppError::DeserializationError)?;
            self.transition(id, ActionStatus::Failed, Some(INTERRUPTED_ERROR))
                .await?;
            recovered += 1;
        }
        Ok(recovered)
    }

    async fn rows_with_status(&self, status: ActionStatus) -> Result<Vec<PendingActionRow>, AppError> {
        let mut rows: Vec<PendingActionRow> = self
            .queue
            .get_all_by_index(STATUS_INDEX, status.as_str())
            .await?;
        rows.sort_by_key(|row| (row.enqueued_at, row.id));
        Ok(rows)
    }

    async fn actions_with_status(&self, status: ActionStatus) -> Result<Vec<PendingAction>, AppError> {
        self.rows_with_status(status)
            .await?
            .into_iter()
            .map(pending_action_from_row)
            .collect()
    }

    async fn transition(
        &self,
        id: ActionId,
        next: ActionStatus,
        error: Option<&str>,
    ) -> Result<PendingAction, AppError> {
        let updated = self
            .queue
            .update(id.value(), |mut row: PendingActionRow| {
                if !row.status.can_transition_to(next) {
                    return Err(StoreError::Rejected(format!(
                        "action {id} cannot move from {} to {next}",
                        row.status
                    )));
                }
                match next {
                    ActionStatus::Failed => {
                        row.retry_count += 1;
                        row.last_error = error.map(str::to_string);
                    }
                    ActionStatus::Pending if row.retry_count >= MAX_RETRIES => {
                        return Err(StoreError::Rejected(format!(
                            "action {id} has exhausted its {MAX_RETRIES} retries"
                        )));
                    }
                    _ => {}
                }
                row.status = next;
                Ok(row)
            })
            .await?;

        match updated {
            Some(row) => pending_action_from_row(row),
            None => Err(AppError::NotFound(format!("action {id}"))),
        }
    }

    async fn require(&self, id: ActionId) -> Result<PendingAction, AppError> {
        self.get(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("action {id}")))
    }
}

#[async_trait]
impl MutationQueue for StoreMutationQueue {
    async fn enqueue(&self, action: NewAction) -> Result<ActionId, AppError> {
        let kind = action.kind();
        let row = row_from_new_action(action, self.clock.tick())?;
        let key = self.queue.put(&row).await?;
        let id = key
            .as_int()
            .ok_or_else(|| AppError::Internal(format!("queue assigned non-integer key {key}")))
            .and_then(|value| ActionId::new(value).map_err(AppError::Internal))?;

        debug!(
            target: "offline::queue",
            action_id = %id,
            kind = %kind,
            target_path = %row.target,
            "action enqueued"
        );
        Ok(id)
    }

    async fn get(&self, id: ActionId) -> Result<Option<PendingAction>, AppError> {
        let row: Option<PendingActionRow> = self.queue.get(id.value()).await?;
        row.map(pending_action_from_row).transpose()
    }

    async fn list_pending(&self) -> Result<Vec<PendingAction>, AppError> {
        self.actions_with_status(ActionStatus::Pending).await
    }

    async fn list_failed(&self) -> Result<Vec<PendingAction>, AppError> {
        self.actions_with_status(ActionStatus::Failed).await
    }

    async fn list_all(&self) -> Result<Vec<PendingAction>, AppError> {
        let mut rows: Vec<PendingActionRow> = self.queue.get_all().await?;
        rows.sort_by_key(|row| (row.enqueued_at, row.id));
        rows.into_iter().map(pending_action_from_row).collect()
    }

    async fn mark_syncing(&self, id: ActionId) -> Result<PendingAction, AppError> {
        self.transition(id, ActionStatus::Syncing, None).await
    }

    async fn mark_failed(&self, id: ActionId, error: &str) -> Result<PendingAction, AppError> {
        let action = self.transition(id, ActionStatus::Failed, Some(error)).await?;
        if action.is_exhausted() {
            warn!(
                target: "offline::queue",
                action_id = %id,
                kind = %action.kind(),
                retry_count = action.retry_count,
                error,
                "action reached retry ceiling; manual intervention required"
            );
        }
        Ok(action)
    }

    async fn remove(&self, id: ActionId) -> Result<(), AppError> {
        let action = self.require(id).await?;
        if action.status != ActionStatus::Syncing {
            return Err(AppError::InvalidTransition(format!(
                "action {id} is {} and cannot be removed as synced",
                action.status
            )));
        }
        self.queue.delete(id.value()).await?;
        debug!(target: "offline::queue", action_id = %id, "action removed after sync");
        Ok(())
    }

    async fn requeue_failed(&self) -> Result<u64, AppError> {
        let failed = self.actions_with_status(ActionStatus::Failed).await?;
        let mut requeued = 0;
        let mut exhausted = 0;
        for action in failed {
            if !action.is_requeueable() {
                exhausted += 1;
                continue;
            }
            self.transition(action.id, ActionStatus::Pending, None).await?;
            requeued += 1;
        }
        info!(
            target: "offline::queue",
            requeued,
            exhausted,
            "failed actions requeued"
        );
        Ok(requeued)
    }

    async fn discard(&self, id: ActionId) -> Result<PendingAction, AppError> {
        let action = self.require(id).await?;
        if action.status != ActionStatus::Failed {
            return Err(AppError::InvalidTransition(format!(
                "only failed actions can be discarded; action {id} is {}",
                action.status
            )));
        }
        self.queue.delete(id.value()).await?;
        warn!(
            target: "offline::queue",
            action_id = %id,
            kind = %action.kind(),
            retry_count = action.retry_count,
            last_error = action.last_error.as_deref().unwrap_or_default(),
            "failed action discarded by operator"
        );
        Ok(action)
    }

    async fn stats(&self) -> Result<QueueStats, AppError> {
        let pending = self.rows_with_status(ActionStatus::Pending).await?;
        let syncing = self
            .queue
            .count_by_index(STATUS_INDEX, ActionStatus::Syncing.as_str())
            .await?;
        let failed = self.rows_with_status(ActionStatus::Failed).await?;

        Ok(QueueStats {
            pending: pending.len() as u64,
            syncing,
            failed: failed.len() as u64,
            exhausted: failed
                .iter()
                .filter(|row| row.retry_count >= MAX_RETRIES)
                .count() as u64,
            oldest_pending_at: pending.first().map(|row| row.enqueued_at),
        })
    }
}
