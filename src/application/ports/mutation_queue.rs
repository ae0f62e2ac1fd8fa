use crate::domain::entities::{NewAction, PendingAction, QueueStats};
use crate::domain::value_objects::ActionId;
use crate::shared::error::AppError;
use async_trait::async_trait;

/// Durable FIFO log of actions that have not reached the server yet.
#[async_trait]
pub trait MutationQueue: Send + Sync {
    async fn enqueue(&self, action: NewAction) -> Result<ActionId, AppError>;
    async fn get(&self, id: ActionId) -> Result<Option<PendingAction>, AppError>;
    /// Pending actions in replay order.
    async fn list_pending(&self) -> Result<Vec<PendingAction>, AppError>;
    async fn list_failed(&self) -> Result<Vec<PendingAction>, AppError>;
    async fn list_all(&self) -> Result<Vec<PendingAction>, AppError>;
    async fn mark_syncing(&self, id: ActionId) -> Result<PendingAction, AppError>;
    async fn mark_failed(&self, id: ActionId, error: &str) -> Result<PendingAction, AppError>;
    /// Deletes a syncing action after the server acknowledged it.
    async fn remove(&self, id: ActionId) -> Result<(), AppError>;
    /// Moves failed actions below the retry ceiling back to pending.
    async fn requeue_failed(&self) -> Result<u64, AppError>;
    /// Operator-only removal of a failed action.
    async fn discard(&self, id: ActionId) -> Result<PendingAction, AppError>;
    async fn stats(&self) -> Result<QueueStats, AppError>;
}
