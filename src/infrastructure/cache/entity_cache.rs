use crate::application::ports::EntityCache;
use crate::domain::entities::CachedRecord;
use crate::infrastructure::offline::schema::PARENT_INDEX;
use crate::infrastructure::store::{Collection, PersistentStore};
use crate::shared::error::AppError;
use async_trait::async_trait;
use chrono::Utc;
use std::marker::PhantomData;
use tracing::debug;

/// `EntityCache` for one record family, stored in the family's collection.
pub struct StoreEntityCache<R> {
    collection: Collection,
    _record: PhantomData<fn() -> R>,
}

impl<R: CachedRecord> StoreEntityCache<R> {
    pub fn open(store: &PersistentStore) -> Result<Self, AppError> {
        Ok(Self {
            collection: store.collection(R::COLLECTION)?,
            _record: PhantomData,
        })
    }

    fn stamp(mut records: Vec<R>) -> Result<Vec<R>, AppError> {
        let now = Utc::now();
        for record in &mut records {
            if record.id().trim().is_empty() {
                return Err(AppError::ValidationError(format!(
                    "{} record without id",
                    R::ENTITY
                )));
            }
            if record.parent_id().trim().is_empty() {
                return Err(AppError::ValidationError(format!(
                    "{} {} has no parent id",
                    R::ENTITY,
                    record.id()
                )));
            }
            record.set_updated_at(now);
        }
        Ok(records)
    }
}

#[async_trait]
impl<R: CachedRecord> EntityCache<R> for StoreEntityCache<R> {
    async fn upsert_all(&self, records: Vec<R>) -> Result<usize, AppError> {
        let records = Self::stamp(records)?;
        let written = self.collection.put_all(&records).await?.len();
        debug!(
            target: "offline::cache",
            collection = R::COLLECTION,
            written,
            "cache upserted"
        );
        Ok(written)
    }

    async fn replace_for_parent(
        &self,
        parent_id: &str,
        records: Vec<R>,
    ) -> Result<usize, AppError> {
        if let Some(stray) = records.iter().find(|record| record.parent_id() != parent_id) {
            return Err(AppError::ValidationError(format!(
                "{} {} belongs to {}, not {parent_id}",
                R::ENTITY,
                stray.id(),
                stray.parent_id()
            )));
        }
        let records = Self::stamp(records)?;
        let written = self
            .collection
            .replace_by_index(PARENT_INDEX, parent_id, &records)
            .await?
            .len();
        debug!(
            target: "offline::cache",
            collection = R::COLLECTION,
            parent_id,
            written,
            "cache replaced for parent"
        );
        Ok(written)
    }

    async fn get(&self, id: &str) -> Result<Option<R>, AppError> {
        Ok(self.collection.get(id).await?)
    }

    async fn list_for_parent(&self, parent_id: &str) -> Result<Vec<R>, AppError> {
        let mut records: Vec<R> = self
            .collection
            .get_all_by_index(PARENT_INDEX, parent_id)
            .await?;
        records.sort_by(|a, b| {
            a.display_key()
                .cmp(&b.display_key())
                .then_with(|| a.id().cmp(b.id()))
        });
        Ok(records)
    }

    async fn remove(&self, id: &str) -> Result<bool, AppError> {
        Ok(self.collection.delete(id).await?)
    }

    async fn clear(&self) -> Result<u64, AppError> {
        Ok(self.collection.clear().await?)
    }
}
