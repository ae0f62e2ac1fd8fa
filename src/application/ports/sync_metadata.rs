use crate::shared::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[async_trait]
pub trait SyncMetadataStore: Send + Sync {
    async fn last_sync_at(&self) -> Result<Option<DateTime<Utc>>, AppError>;
    async fn set_last_sync_at(&self, at: DateTime<Utc>) -> Result<(), AppError>;
}
