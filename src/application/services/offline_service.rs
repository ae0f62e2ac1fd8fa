use crate::application::ports::MutationQueue;
use crate::domain::entities::{NewAction, PendingAction, QueueStats};
use crate::domain::value_objects::offline::{
    CheckInPayload, CreateEntityPayload, DeleteEntityPayload, EditEntityPayload,
};
use crate::domain::value_objects::{ActionId, ActionPayload, EntityKind, HttpMethod, RemoteTarget};
use crate::shared::error::AppError;
use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};
use std::sync::Arc;

/// UI-facing side of the queue: submit mutations and read queue state.
/// Status changes belong to the sync coordinator.
#[async_trait]
pub trait OfflineServiceTrait: Send + Sync {
    async fn enqueue(&self, action: NewAction) -> Result<ActionId, AppError>;
    async fn queue_check_in(
        &self,
        wedding_id: &str,
        guest_id: &str,
        checked_in: bool,
    ) -> Result<ActionId, AppError>;
    async fn queue_create(
        &self,
        entity: EntityKind,
        wedding_id: &str,
        data: Value,
    ) -> Result<ActionId, AppError>;
    async fn queue_edit(
        &self,
        entity: EntityKind,
        wedding_id: &str,
        entity_id: &str,
        changes: Value,
    ) -> Result<ActionId, AppError>;
    async fn queue_delete(
        &self,
        entity: EntityKind,
        wedding_id: &str,
        entity_id: &str,
    ) -> Result<ActionId, AppError>;
    async fn get_action(&self, id: ActionId) -> Result<Option<PendingAction>, AppError>;
    async fn list_pending(&self) -> Result<Vec<PendingAction>, AppError>;
    async fn list_failed(&self) -> Result<Vec<PendingAction>, AppError>;
    async fn stats(&self) -> Result<QueueStats, AppError>;
}

pub struct OfflineService {
    queue: Arc<dyn MutationQueue>,
}

impl OfflineService {
    pub fn new(queue: Arc<dyn MutationQueue>) -> Self {
        Self { queue }
    }

    fn collection_path(entity: EntityKind, wedding_id: &str) -> Result<String, AppError> {
        let wedding_id = require_segment("wedding id", wedding_id)?;
        let segment = match entity {
            EntityKind::Guest => "guests",
            EntityKind::BudgetItem => "budget-items",
            EntityKind::Vendor => "vendors",
        };
        Ok(format!("/api/weddings/{wedding_id}/{segment}"))
    }

    fn target(path: String) -> Result<RemoteTarget, AppError> {
        RemoteTarget::new(path).map_err(AppError::ValidationError)
    }
}

fn require_segment<'a>(label: &str, value: &'a str) -> Result<&'a str, AppError> {
    let value = value.trim();
    if value.is_empty() || value.contains('/') {
        return Err(AppError::ValidationError(format!("invalid {label}: {value:?}")));
    }
    Ok(value)
}

fn require_object(label: &str, value: Value) -> Result<Map<String, Value>, AppError> {
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(AppError::ValidationError(format!(
            "{label} must be a JSON object"
        ))),
    }
}

#[async_trait]
impl OfflineServiceTrait for OfflineService {
    async fn enqueue(&self, action: NewAction) -> Result<ActionId, AppError> {
        self.queue.enqueue(action).await
    }

    async fn queue_check_in(
        &self,
        wedding_id: &str,
        guest_id: &str,
        checked_in: bool,
    ) -> Result<ActionId, AppError> {
        let guest_id = require_segment("guest id", guest_id)?;
        let path = format!(
            "{}/{guest_id}/check-in",
            Self::collection_path(EntityKind::Guest, wedding_id)?
        );
        let payload = ActionPayload::CheckIn(CheckInPayload {
            guest_id: guest_id.to_string(),
            wedding_id: wedding_id.trim().to_string(),
            checked_in,
            checked_in_at: Utc::now(),
        });
        self.queue
            .enqueue(NewAction::new(payload, Self::target(path)?, HttpMethod::Post))
            .await
    }

    async fn queue_create(
        &self,
        entity: EntityKind,
        wedding_id: &str,
        data: Value,
    ) -> Result<ActionId, AppError> {
        let path = Self::collection_path(entity, wedding_id)?;
        let payload = ActionPayload::CreateEntity(CreateEntityPayload {
            entity,
            parent_id: wedding_id.trim().to_string(),
            data: require_object("data", data)?,
        });
        self.queue
            .enqueue(NewAction::new(payload, Self::target(path)?, HttpMethod::Post))
            .await
    }

    async fn queue_edit(
        &self,
        entity: EntityKind,
        wedding_id: &str,
        entity_id: &str,
        changes: Value,
    ) -> Result<ActionId, AppError> {
        let entity_id = require_segment("entity id", entity_id)?;
        let path = format!("{}/{entity_id}", Self::collection_path(entity, wedding_id)?);
        let payload = ActionPayload::EditEntity(EditEntityPayload {
            entity,
            entity_id: entity_id.to_string(),
            parent_id: wedding_id.trim().to_string(),
            changes: require_object("changes", changes)?,
        });
        self.queue
            .enqueue(NewAction::new(payload, Self::target(path)?, HttpMethod::Patch))
            .await
    }

    async fn queue_delete(
        &self,
        entity: EntityKind,
        wedding_id: &str,
        entity_id: &str,
    ) -> Result<ActionId, AppError> {
        let entity_id = require_segment("entity id", entity_id)?;
        let path = format!("{}/{entity_id}", Self::collection_path(entity, wedding_id)?);
        let payload = ActionPayload::DeleteEntity(DeleteEntityPayload {
            entity,
            entity_id: entity_id.to_string(),
            parent_id: wedding_id.trim().to_string(),
        });
        self.queue
            .enqueue(NewAction::new(payload, Self::target(path)?, HttpMethod::Delete))
            .await
    }

    async fn get_action(&self, id: ActionId) -> Result<Option<PendingAction>, AppError> {
        self.queue.get(id).await
    }

    async fn list_pending(&self) -> Result<Vec<PendingAction>, AppError> {
        self.queue.list_pending().await
    }

    async fn list_failed(&self) -> Result<Vec<PendingAction>, AppError> {
        self.queue.list_failed().await
    }

    async fn stats(&self) -> Result<QueueStats, AppError> {
        self.queue.stats().await
    }
}
