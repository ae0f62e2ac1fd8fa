use super::rows::MetadataRow;
use super::schema::METADATA_COLLECTION;
use crate::application::ports::SyncMetadataStore;
use crate::infrastructure::store::{Collection, PersistentStore};
use crate::shared::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

pub const LAST_SYNC_AT_KEY: &str = "lastSyncAt";

/// Key/value sync metadata kept in the `metadata` collection.
pub struct StoreSyncMetadata {
    metadata: Collection,
}

impl StoreSyncMetadata {
    pub fn open(store: &PersistentStore) -> Result<Self, AppError> {
        Ok(Self {
            metadata: store.collection(METADATA_COLLECTION)?,
        })
    }

    pub async fn get_value(&self, key: &str) -> Result<Option<Value>, AppError> {
        let row: Option<MetadataRow> = self.metadata.get(key).await?;
        Ok(row.map(|row| row.value))
    }

    pub async fn set_value(&self, key: &str, value: Value) -> Result<(), AppError> {
        self.metadata
            .put(&MetadataRow {
                key: key.to_string(),
                value,
            })
            .await?;
        Ok(())
    }
}

#[async_trait]
impl SyncMetadataStore for StoreSyncMetadata {
    async fn last_sync_at(&self) -> Result<Option<DateTime<Utc>>, AppError> {
        match self.get_value(LAST_SYNC_AT_KEY).await? {
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|err| AppError::DeserializationError(err.to_string())),
            None => Ok(None),
        }
    }

    async fn set_last_sync_at(&self, at: DateTime<Utc>) -> Result<(), AppError> {
        self.set_value(LAST_SYNC_AT_KEY, serde_json::to_value(at)?)
            .await
    }
}
