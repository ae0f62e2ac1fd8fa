use crate::domain::entities::CachedRecord;
use crate::shared::error::AppError;
use async_trait::async_trait;

#[async_trait]
pub trait EntityCache<R: CachedRecord>: Send + Sync {
    /// Whole-record upsert, stamping `updatedAt`.
    async fn upsert_all(&self, records: Vec<R>) -> Result<usize, AppError>;
    /// Replaces every record of `parent_id` with `records`.
    async fn replace_for_parent(
        &self,
        parent_id: &str,
        records: Vec<R>,
    ) -> Result<usize, AppError>;
    async fn get(&self, id: &str) -> Result<Option<R>, AppError>;
    /// Records of one parent sorted by display key.
    async fn list_for_parent(&self, parent_id: &str) -> Result<Vec<R>, AppError>;
    async fn remove(&self, id: &str) -> Result<bool, AppError>;
    async fn clear(&self) -> Result<u64, AppError>;
}
