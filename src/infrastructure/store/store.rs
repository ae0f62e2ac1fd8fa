use super::collection::Collection;
use super::error::StoreError;
use super::schema::{
    index_name, json_expr, table_name, CollectionDef, IndexDef, SchemaChange, UpgradePlan,
};
use crate::shared::config::DatabaseConfig;
use chrono::Utc;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous,
};
use sqlx::{Row, SqlitePool};
use std::collections::HashMap;
use std::future::Future;
use std::path::Path;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock as StdRwLock};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct StoreOptions {
    pub url: String,
    pub name: String,
    pub max_connections: u32,
    pub busy_timeout: Duration,
}

impl StoreOptions {
    pub fn new(url: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            name: name.into(),
            max_connections: 4,
            busy_timeout: Duration::from_secs(5),
        }
    }

    pub fn from_config(config: &DatabaseConfig) -> Self {
        Self {
            url: config.url.clone(),
            name: config.name.clone(),
            max_connections: config.max_connections.max(1),
            busy_timeout: Duration::from_secs(config.busy_timeout_secs),
        }
    }

    pub fn max_connections(mut self, value: u32) -> Self {
        self.max_connections = value.max(1);
        self
    }
}

struct StoreInner {
    options: StoreOptions,
    version: u32,
    pool: RwLock<Option<SqlitePool>>,
    catalog: StdRwLock<HashMap<String, Arc<CollectionDef>>>,
    reconnects: AtomicU64,
}

/// Versioned collection store on top of a single SQLite database.
///
/// Every mutating call returns only after SQLite has committed it. The pool is
/// reopened transparently when it is found closed, and an operation that hits a
/// stale connection is retried exactly once before the error is surfaced.
#[derive(Clone)]
pub struct PersistentStore {
    inner: Arc<StoreInner>,
}

impl PersistentStore {
    /// Opens (creating if absent) the store and brings its schema to `version`.
    ///
    /// `upgrade` runs once, before any other operation, when the stored version
    /// is older. Its plan and the version bump commit atomically.
    pub async fn open<F>(options: StoreOptions, version: u32, upgrade: F) -> Result<Self, StoreError>
    where
        F: FnOnce(&mut UpgradePlan, u32, u32) -> Result<(), StoreError>,
    {
        if version == 0 {
            return Err(StoreError::Schema("store version must be at least 1".into()));
        }

        let pool = connect(&options)
            .await
            .map_err(|err| StoreError::Schema(format!("failed to open {}: {err}", options.url)))?;
        sqlx::migrate!("./migrations").run(&pool).await?;

        let current = read_version(&pool, &options.name).await.map_err(as_schema)?;
        if current > version {
            pool.close().await;
            return Err(StoreError::Schema(format!(
                "store {} is at version {current}, newer than requested {version}",
                options.name
            )));
        }

        if current < version {
            let mut plan = UpgradePlan::default();
            if let Err(err) = upgrade(&mut plan, current, version) {
                pool.close().await;
                return Err(StoreError::Schema(format!(
                    "upgrade {current} -> {version} failed: {err}"
                )));
            }
            if let Err(err) = apply_plan(&pool, &options.name, version, &plan).await {
                pool.close().await;
                return Err(StoreError::Schema(format!(
                    "upgrade {current} -> {version} failed: {err}"
                )));
            }
            info!(
                target: "offline::store",
                store = %options.name,
                from = current,
                to = version,
                changes = plan.changes().len(),
                "store schema upgraded"
            );
        }

        let catalog = load_catalog(&pool).await.map_err(as_schema)?;
        debug!(
            target: "offline::store",
            store = %options.name,
            collections = catalog.len(),
            "store opened"
        );

        Ok(Self {
            inner: Arc::new(StoreInner {
                options,
                version,
                pool: RwLock::new(Some(pool)),
                catalog: StdRwLock::new(catalog),
                reconnects: AtomicU64::new(0),
            }),
        })
    }

    pub fn name(&self) -> &str {
        &self.inner.options.name
    }

    pub fn version(&self) -> u32 {
        self.inner.version
    }

    pub fn reconnect_count(&self) -> u64 {
        self.inner.reconnects.load(Ordering::Relaxed)
    }

    pub fn collection(&self, name: &str) -> Result<Collection, StoreError> {
        let catalog = self
            .inner
            .catalog
            .read()
            .map_err(|_| StoreError::Database("store catalog lock poisoned".into()))?;
        catalog
            .get(name)
            .cloned()
            .map(|def| Collection::new(self.clone(), def))
            .ok_or_else(|| StoreError::UnknownCollection(name.to_string()))
    }

    pub fn collection_names(&self) -> Vec<String> {
        match self.inner.catalog.read() {
            Ok(catalog) => {
                let mut names: Vec<String> = catalog.keys().cloned().collect();
                names.sort();
                names
            }
            Err(_) => Vec::new(),
        }
    }

    /// Current pool, reopening it if it was closed. Closing the returned pool is
    /// treated like any other out-of-band invalidation.
    pub async fn connection(&self) -> Result<SqlitePool, StoreError> {
        {
            let guard = self.inner.pool.read().await;
            if let Some(pool) = guard.as_ref() {
                if !pool.is_closed() {
                    return Ok(pool.clone());
                }
            }
        }

        let mut guard = self.inner.pool.write().await;
        if let Some(pool) = guard.as_ref() {
            if !pool.is_closed() {
                return Ok(pool.clone());
            }
        }

        let pool = self.reopen().await?;
        *guard = Some(pool.clone());
        Ok(pool)
    }

    /// Closes the pool; the next operation reopens it.
    pub async fn close(&self) {
        let pool = self.inner.pool.write().await.take();
        if let Some(pool) = pool {
            pool.close().await;
        }
    }

    async fn reopen(&self) -> Result<SqlitePool, StoreError> {
        let options = &self.inner.options;
        let pool = connect(options)
            .await
            .map_err(|err| StoreError::Connection(format!("reopen failed: {err}")))?;
        sqlx::migrate!("./migrations").run(&pool).await?;

        let stored = read_version(&pool, &options.name).await?;
        if stored != self.inner.version {
            pool.close().await;
            return Err(StoreError::Schema(format!(
                "store {} changed version underneath us ({} -> {stored})",
                options.name, self.inner.version
            )));
        }

        let reconnects = self.inner.reconnects.fetch_add(1, Ordering::Relaxed) + 1;
        info!(
            target: "offline::store",
            store = %options.name,
            reconnects,
            "store connection reopened"
        );
        Ok(pool)
    }

    async fn invalidate(&self) {
        let pool = self.inner.pool.write().await.take();
        if let Some(pool) = pool {
            if !pool.is_closed() {
                pool.close().await;
            }
        }
    }

    /// Runs `op` against the pool, retrying once on a stale connection.
    pub(crate) async fn run<T, F, Fut>(&self, op_name: &'static str, op: F) -> Result<T, StoreError>
    where
        F: Fn(SqlitePool) -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        let pool = self.connection().await?;
        match op(pool).await {
            Err(err) if err.is_connection() => {
                warn!(
                    target: "offline::store",
                    op = op_name,
                    error = %err,
                    "stale store connection, reopening and retrying once"
                );
                self.invalidate().await;
                let pool = self.connection().await?;
                op(pool).await
            }
            other => other,
        }
    }
}

fn as_schema(err: StoreError) -> StoreError {
    match err {
        StoreError::Schema(_) => err,
        other => StoreError::Schema(other.to_string()),
    }
}

async fn connect(options: &StoreOptions) -> Result<SqlitePool, sqlx::Error> {
    ensure_parent_dir(&options.url)?;

    let connect_options = SqliteConnectOptions::from_str(&options.url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Full)
        .foreign_keys(true)
        .busy_timeout(options.busy_timeout);

    SqlitePoolOptions::new()
        .max_connections(options.max_connections)
        .connect_with(connect_options)
        .await
}

fn ensure_parent_dir(url: &str) -> Result<(), sqlx::Error> {
    let Some(rest) = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))
    else {
        return Ok(());
    };
    let path = rest.split('?').next().unwrap_or_default();
    if path.is_empty() || path.starts_with(":memory:") {
        return Ok(());
    }
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

async fn read_version(pool: &SqlitePool, name: &str) -> Result<u32, StoreError> {
    let row: Option<(i64,)> = sqlx::query_as("SELECT version FROM store_meta WHERE name = ?1")
        .bind(name)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(|(v,)| v.max(0) as u32).unwrap_or(0))
}

async fn apply_plan(
    pool: &SqlitePool,
    name: &str,
    version: u32,
    plan: &UpgradePlan,
) -> Result<(), StoreError> {
    let now = Utc::now().timestamp_millis();
    let mut tx = pool.begin().await?;

    for change in plan.changes() {
        match change {
            SchemaChange::CreateCollection {
                name,
                key_path,
                auto_increment,
            } => {
                sqlx::query(&format!(
                    "CREATE TABLE IF NOT EXISTS {} (record_key PRIMARY KEY NOT NULL, record_value TEXT NOT NULL)",
                    table_name(name)
                ))
                .execute(&mut *tx)
                .await?;

                sqlx::query(
                    r#"
                    INSERT INTO store_collections (name, key_path, auto_increment, next_key, created_at)
                    VALUES (?1, ?2, ?3, 1, ?4)
                    ON CONFLICT(name) DO NOTHING
                    "#,
                )
                .bind(name)
                .bind(key_path)
                .bind(*auto_increment)
                .bind(now)
                .execute(&mut *tx)
                .await?;
            }
            SchemaChange::CreateIndex {
                collection,
                name,
                key_path,
            } => {
                let exists: Option<(String,)> =
                    sqlx::query_as("SELECT name FROM store_collections WHERE name = ?1")
                        .bind(collection)
                        .fetch_optional(&mut *tx)
                        .await?;
                if exists.is_none() {
                    return Err(StoreError::UnknownCollection(collection.clone()));
                }

                sqlx::query(&format!(
                    "CREATE INDEX IF NOT EXISTS {} ON {} ({})",
                    index_name(collection, name),
                    table_name(collection),
                    json_expr(key_path)
                ))
                .execute(&mut *tx)
                .await?;

                sqlx::query(
                    r#"
                    INSERT INTO store_indexes (collection, name, key_path)
                    VALUES (?1, ?2, ?3)
                    ON CONFLICT(collection, name) DO UPDATE SET key_path = excluded.key_path
                    "#,
                )
                .bind(collection)
                .bind(name)
                .bind(key_path)
                .execute(&mut *tx)
                .await?;
            }
            SchemaChange::DeleteIndex { collection, name } => {
                sqlx::query(&format!(
                    "DROP INDEX IF EXISTS {}",
                    index_name(collection, name)
                ))
                .execute(&mut *tx)
                .await?;

                sqlx::query("DELETE FROM store_indexes WHERE collection = ?1 AND name = ?2")
                    .bind(collection)
                    .bind(name)
                    .execute(&mut *tx)
                    .await?;
            }
        }
    }

    sqlx::query(
        r#"
        INSERT INTO store_meta (name, version, upgraded_at)
        VALUES (?1, ?2, ?3)
        ON CONFLICT(name) DO UPDATE SET
            version = excluded.version,
            upgraded_at = excluded.upgraded_at
        "#,
    )
    .bind(name)
    .bind(i64::from(version))
    .bind(now)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}

async fn load_catalog(pool: &SqlitePool) -> Result<HashMap<String, Arc<CollectionDef>>, StoreError> {
    let collections = sqlx::query("SELECT name, key_path, auto_increment FROM store_collections")
        .fetch_all(pool)
        .await?;
    let indexes = sqlx::query("SELECT collection, name, key_path FROM store_indexes ORDER BY name")
        .fetch_all(pool)
        .await?;

    let mut by_collection: HashMap<String, Vec<IndexDef>> = HashMap::new();
    for row in indexes {
        let collection: String = row.try_get("collection")?;
        by_collection.entry(collection).or_default().push(IndexDef {
            name: row.try_get("name")?,
            key_path: row.try_get("key_path")?,
        });
    }

    let mut catalog = HashMap::new();
    for row in collections {
        let name: String = row.try_get("name")?;
        let def = CollectionDef {
            key_path: row.try_get("key_path")?,
            auto_increment: row.try_get::<bool, _>("auto_increment")?,
            indexes: by_collection.remove(&name).unwrap_or_default(),
            name: name.clone(),
        };
        catalog.insert(name, Arc::new(def));
    }
    Ok(catalog)
}
