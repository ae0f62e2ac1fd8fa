use super::error::StoreError;
use super::key::{bind_key, bind_key_as, read_path, write_path, StoreKey};
use super::schema::{json_expr, CollectionDef};
use super::store::PersistentStore;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use sqlx::SqliteConnection;
use std::sync::Arc;

/// Handle to one named collection. Records are whole JSON documents; `put`
/// always replaces the stored record for its key.
#[derive(Clone)]
pub struct Collection {
    store: PersistentStore,
    def: Arc<CollectionDef>,
}

impl Collection {
    pub(crate) fn new(store: PersistentStore, def: Arc<CollectionDef>) -> Self {
        Self { store, def }
    }

    pub fn name(&self) -> &str {
        &self.def.name
    }

    pub fn definition(&self) -> &CollectionDef {
        &self.def
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        key: impl Into<StoreKey>,
    ) -> Result<Option<T>, StoreError> {
        let key = key.into();
        let sql = format!(
            "SELECT record_value FROM {} WHERE record_key = ?1",
            self.def.table()
        );
        let raw = self
            .store
            .run("get", |pool| {
                let sql = sql.clone();
                let key = key.clone();
                async move {
                    let row: Option<(String,)> = bind_key_as(sqlx::query_as(&sql), &key)
                        .fetch_optional(&pool)
                        .await?;
                    Ok::<_, StoreError>(row.map(|(value,)| value))
                }
            })
            .await?;
        raw.map(|value| decode(&value)).transpose()
    }

    /// Upserts a whole record and returns its key. Auto-increment collections
    /// assign the next key when the record has none.
    pub async fn put<T: Serialize>(&self, record: &T) -> Result<StoreKey, StoreError> {
        let value = serde_json::to_value(record)?;
        let def = self.def.clone();
        self.store
            .run("put", |pool| {
                let value = value.clone();
                let def = def.clone();
                async move {
                    let mut tx = pool.begin().await?;
                    let key = put_value(&mut *tx, &def, value).await?;
                    tx.commit().await?;
                    Ok::<_, StoreError>(key)
                }
            })
            .await
    }

    /// Upserts several records in one transaction.
    pub async fn put_all<T: Serialize>(&self, records: &[T]) -> Result<Vec<StoreKey>, StoreError> {
        let values = records
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()?;
        let def = self.def.clone();
        self.store
            .run("put_all", |pool| {
                let values = values.clone();
                let def = def.clone();
                async move {
                    let mut tx = pool.begin().await?;
                    let mut keys = Vec::with_capacity(values.len());
                    for value in values {
                        keys.push(put_value(&mut *tx, &def, value).await?);
                    }
                    tx.commit().await?;
                    Ok::<_, StoreError>(keys)
                }
            })
            .await
    }

    /// Replaces every record whose index value equals `value` with `records`,
    /// atomically.
    pub async fn replace_by_index<T: Serialize>(
        &self,
        index: &str,
        value: impl Into<StoreKey>,
        records: &[T],
    ) -> Result<Vec<StoreKey>, StoreError> {
        let key_path = self.index_path(index)?.to_string();
        let value = value.into();
        let values = records
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()?;
        let def = self.def.clone();
        let delete_sql = format!(
            "DELETE FROM {} WHERE {} = ?1",
            self.def.table(),
            json_expr(&key_path)
        );
        self.store
            .run("replace_by_index", |pool| {
                let values = values.clone();
                let def = def.clone();
                let delete_sql = delete_sql.clone();
                let value = value.clone();
                async move {
                    let mut tx = pool.begin().await?;
                    bind_key(sqlx::query(&delete_sql), &value)
                        .execute(&mut *tx)
                        .await?;
                    let mut keys = Vec::with_capacity(values.len());
                    for record in values {
                        keys.push(put_value(&mut *tx, &def, record).await?);
                    }
                    tx.commit().await?;
                    Ok::<_, StoreError>(keys)
                }
            })
            .await
    }

    /// Read-modify-write of one record inside a single transaction. Returns
    /// `None` when the key does not exist. `mutate` may refuse the change by
    /// returning `StoreError::Rejected`, in which case nothing is written.
    pub async fn update<T, F>(
        &self,
        key: impl Into<StoreKey>,
        mutate: F,
    ) -> Result<Option<T>, StoreError>
    where
        T: Serialize + DeserializeOwned,
        F: Fn(T) -> Result<T, StoreError>,
    {
        let key = key.into();
        let select_sql = format!(
            "SELECT record_value FROM {} WHERE record_key = ?1",
            self.def.table()
        );
        let update_sql = format!(
            "UPDATE {} SET record_value = ?1 WHERE record_key = ?2",
            self.def.table()
        );
        let def = self.def.clone();
        let mutate = &mutate;
        self.store
            .run("update", |pool| {
                let key = key.clone();
                let select_sql = select_sql.clone();
                let update_sql = update_sql.clone();
                let def = def.clone();
                async move {
                    let mut tx = pool.begin().await?;
                    let row: Option<(String,)> = bind_key_as(sqlx::query_as(&select_sql), &key)
                        .fetch_optional(&mut *tx)
                        .await?;
                    let Some((raw,)) = row else {
                        return Ok(None);
                    };

                    let updated = mutate(decode::<T>(&raw)?)?;
                    let mut value = serde_json::to_value(&updated)?;
                    // The key is owned by the store; a mutation cannot move the record.
                    write_path(&mut value, &def.key_path, key.to_json());
                    bind_key(
                        sqlx::query(&update_sql).bind(serde_json::to_string(&value)?),
                        &key,
                    )
                    .execute(&mut *tx)
                    .await?;
                    tx.commit().await?;
                    Ok::<_, StoreError>(Some(serde_json::from_value::<T>(value)?))
                }
            })
            .await
    }

    pub async fn delete(&self, key: impl Into<StoreKey>) -> Result<bool, StoreError> {
        let key = key.into();
        let sql = format!("DELETE FROM {} WHERE record_key = ?1", self.def.table());
        self.store
            .run("delete", |pool| {
                let sql = sql.clone();
                let key = key.clone();
                async move {
                    let result = bind_key(sqlx::query(&sql), &key).execute(&pool).await?;
                    Ok::<_, StoreError>(result.rows_affected() > 0)
                }
            })
            .await
    }

    /// All records in ascending key order.
    pub async fn get_all<T: DeserializeOwned>(&self) -> Result<Vec<T>, StoreError> {
        let sql = format!(
            "SELECT record_value FROM {} ORDER BY record_key",
            self.def.table()
        );
        let rows = self
            .store
            .run("get_all", |pool| {
                let sql = sql.clone();
                async move {
                    let rows: Vec<(String,)> = sqlx::query_as(&sql).fetch_all(&pool).await?;
                    Ok::<_, StoreError>(rows)
                }
            })
            .await?;
        rows.iter().map(|(value,)| decode(value)).collect()
    }

    pub async fn get_all_by_index<T: DeserializeOwned>(
        &self,
        index: &str,
        value: impl Into<StoreKey>,
    ) -> Result<Vec<T>, StoreError> {
        let key_path = self.index_path(index)?;
        let value = value.into();
        let sql = format!(
            "SELECT record_value FROM {} WHERE {} = ?1 ORDER BY record_key",
            self.def.table(),
            json_expr(key_path)
        );
        let rows = self
            .store
            .run("get_all_by_index", |pool| {
                let sql = sql.clone();
                let value = value.clone();
                async move {
                    let rows: Vec<(String,)> = bind_key_as(sqlx::query_as(&sql), &value)
                        .fetch_all(&pool)
                        .await?;
                    Ok::<_, StoreError>(rows)
                }
            })
            .await?;
        rows.iter().map(|(value,)| decode(value)).collect()
    }

    pub async fn count(&self) -> Result<u64, StoreError> {
        let sql = format!("SELECT COUNT(*) FROM {}", self.def.table());
        self.store
            .run("count", |pool| {
                let sql = sql.clone();
                async move {
                    let (count,): (i64,) = sqlx::query_as(&sql).fetch_one(&pool).await?;
                    Ok::<_, StoreError>(count.max(0) as u64)
                }
            })
            .await
    }

    pub async fn count_by_index(
        &self,
        index: &str,
        value: impl Into<StoreKey>,
    ) -> Result<u64, StoreError> {
        let key_path = self.index_path(index)?;
        let value = value.into();
        let sql = format!(
            "SELECT COUNT(*) FROM {} WHERE {} = ?1",
            self.def.table(),
            json_expr(key_path)
        );
        self.store
            .run("count_by_index", |pool| {
                let sql = sql.clone();
                let value = value.clone();
                async move {
                    let (count,): (i64,) = bind_key_as(sqlx::query_as(&sql), &value)
                        .fetch_one(&pool)
                        .await?;
                    Ok::<_, StoreError>(count.max(0) as u64)
                }
            })
            .await
    }

    pub async fn clear(&self) -> Result<u64, StoreError> {
        let sql = format!("DELETE FROM {}", self.def.table());
        self.store
            .run("clear", |pool| {
                let sql = sql.clone();
                async move {
                    let result = sqlx::query(&sql).execute(&pool).await?;
                    Ok::<_, StoreError>(result.rows_affected())
                }
            })
            .await
    }

    fn index_path(&self, index: &str) -> Result<&str, StoreError> {
        self.def
            .index(index)
            .map(|def| def.key_path.as_str())
            .ok_or_else(|| StoreError::UnknownIndex {
                collection: self.def.name.clone(),
                index: index.to_string(),
            })
    }
}

fn decode<T: DeserializeOwned>(raw: &str) -> Result<T, StoreError> {
    serde_json::from_str(raw).map_err(|err| StoreError::Serialization(err.to_string()))
}

async fn put_value(
    conn: &mut SqliteConnection,
    def: &CollectionDef,
    mut value: Value,
) -> Result<StoreKey, StoreError> {
    if !value.is_object() {
        return Err(StoreError::Serialization(format!(
            "records in {} must be JSON objects",
            def.name
        )));
    }

    let existing = read_path(&value, &def.key_path).and_then(StoreKey::from_json);
    let key = match existing {
        Some(key) => {
            if def.auto_increment {
                if let Some(explicit) = key.as_int() {
                    sqlx::query(
                        "UPDATE store_collections SET next_key = MAX(next_key, ?1) WHERE name = ?2",
                    )
                    .bind(explicit.saturating_add(1))
                    .bind(&def.name)
                    .execute(&mut *conn)
                    .await?;
                }
            }
            key
        }
        None if def.auto_increment => {
            // Generated keys are never reused, even after the record is deleted.
            let (next,): (i64,) = sqlx::query_as(
                "UPDATE store_collections SET next_key = next_key + 1 WHERE name = ?1 RETURNING next_key - 1",
            )
            .bind(&def.name)
            .fetch_one(&mut *conn)
            .await?;
            let key = StoreKey::Int(next);
            write_path(&mut value, &def.key_path, key.to_json());
            key
        }
        None => return Err(StoreError::MissingKey(def.key_path.clone())),
    };

    let sql = format!(
        r#"
        INSERT INTO {} (record_key, record_value) VALUES (?1, ?2)
        ON CONFLICT(record_key) DO UPDATE SET record_value = excluded.record_value
        "#,
        def.table()
    );
    bind_key(sqlx::query(&sql), &key)
        .bind(serde_json::to_string(&value)?)
        .execute(&mut *conn)
        .await?;

    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::store::{StoreOptions, UpgradePlan};
    use serde::Deserialize;
    use serde_json::json;
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Note {
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<i64>,
        tag: String,
        body: String,
    }

    fn note(tag: &str, body: &str) -> Note {
        Note {
            id: None,
            tag: tag.into(),
            body: body.into(),
        }
    }

    async fn open_store(dir: &TempDir) -> PersistentStore {
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("c.db").display());
        PersistentStore::open(
            StoreOptions::new(url, "collection-tests"),
            1,
            |plan: &mut UpgradePlan, _, _| {
                plan.create_collection("notes", "id", true)?
                    .create_index("notes", "tag", "tag")?
                    .create_collection("people", "id", false)?
                    .create_index("people", "parentId", "weddingId")?;
                Ok(())
            },
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_put_assigns_monotonic_keys_never_reused() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir).await;
        let notes = store.collection("notes").unwrap();

        let first = notes.put(&note("a", "one")).await.unwrap();
        let second = notes.put(&note("a", "two")).await.unwrap();
        assert_eq!(first, StoreKey::Int(1));
        assert_eq!(second, StoreKey::Int(2));

        assert!(notes.delete(2).await.unwrap());
        let third = notes.put(&note("b", "three")).await.unwrap();
        assert_eq!(third, StoreKey::Int(3));

        let stored: Note = notes.get(3).await.unwrap().unwrap();
        assert_eq!(stored.id, Some(3));
    }

    #[tokio::test]
    async fn test_put_replaces_whole_record() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir).await;
        let people = store.collection("people").unwrap();

        people
            .put(&json!({"id": "g1", "weddingId": "w1", "name": "Ada", "note": "vegan"}))
            .await
            .unwrap();
        people
            .put(&json!({"id": "g1", "weddingId": "w1", "name": "Ada L."}))
            .await
            .unwrap();

        let stored: Value = people.get("g1").await.unwrap().unwrap();
        assert_eq!(stored, json!({"id": "g1", "weddingId": "w1", "name": "Ada L."}));
        assert_eq!(people.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_missing_key_without_auto_increment_is_rejected() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir).await;
        let people = store.collection("people").unwrap();

        let result = people.put(&json!({"weddingId": "w1"})).await;
        assert!(matches!(result, Err(StoreError::MissingKey(_))));
    }

    #[tokio::test]
    async fn test_index_lookup_and_counts() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir).await;
        let notes = store.collection("notes").unwrap();

        notes
            .put_all(&[note("a", "1"), note("b", "2"), note("a", "3")])
            .await
            .unwrap();

        let tagged: Vec<Note> = notes.get_all_by_index("tag", "a").await.unwrap();
        assert_eq!(
            tagged.iter().map(|n| n.body.as_str()).collect::<Vec<_>>(),
            vec!["1", "3"]
        );
        assert_eq!(notes.count_by_index("tag", "b").await.unwrap(), 1);
        assert!(matches!(
            notes.get_all_by_index::<Note>("nope", "a").await,
            Err(StoreError::UnknownIndex { .. })
        ));

        assert_eq!(notes.clear().await.unwrap(), 3);
        assert_eq!(notes.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_update_applies_or_rejects_atomically() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir).await;
        let notes = store.collection("notes").unwrap();
        notes.put(&note("a", "draft")).await.unwrap();

        let updated: Option<Note> = notes
            .update(1, |mut n: Note| {
                n.body = "final".into();
                n.id = Some(99);
                Ok(n)
            })
            .await
            .unwrap();
        let updated = updated.unwrap();
        assert_eq!(updated.body, "final");
        assert_eq!(updated.id, Some(1));

        let rejected = notes
            .update(1, |_: Note| Err(StoreError::Rejected("no".into())))
            .await;
        assert!(matches!(rejected, Err(StoreError::Rejected(_))));
        let stored: Note = notes.get(1).await.unwrap().unwrap();
        assert_eq!(stored.body, "final");

        let missing: Option<Note> = notes.update(42, Ok).await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_replace_by_index_only_touches_matching_records() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir).await;
        let people = store.collection("people").unwrap();
        people
            .put_all(&[
                json!({"id": "g1", "weddingId": "w1"}),
                json!({"id": "g2", "weddingId": "w1"}),
                json!({"id": "g3", "weddingId": "w2"}),
            ])
            .await
            .unwrap();

        people
            .replace_by_index("parentId", "w1", &[json!({"id": "g4", "weddingId": "w1"})])
            .await
            .unwrap();

        let w1: Vec<Value> = people.get_all_by_index("parentId", "w1").await.unwrap();
        assert_eq!(w1, vec![json!({"id": "g4", "weddingId": "w1"})]);
        assert_eq!(people.count_by_index("parentId", "w2").await.unwrap(), 1);
    }
}
