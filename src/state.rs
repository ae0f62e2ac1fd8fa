use crate::application::ports::RemoteTransport;
use crate::application::services::{EntityCaches, OfflineService, SyncCoordinator};
use crate::domain::entities::{CachedBudgetItem, CachedGuest, CachedVendor};
use crate::infrastructure::cache::StoreEntityCache;
use crate::infrastructure::network::{ConnectivityMonitor, HttpTransport};
use crate::infrastructure::offline::{STORE_VERSION, StoreMutationQueue, StoreSyncMetadata, upgrade};
use crate::infrastructure::store::{PersistentStore, StoreOptions};
use crate::shared::config::AppConfig;
use crate::shared::error::AppError;
use std::sync::Arc;
use tracing::info;

/// Everything the host needs, wired over one store.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: PersistentStore,
    pub queue: Arc<StoreMutationQueue>,
    pub connectivity: Arc<ConnectivityMonitor>,
    pub offline_service: Arc<OfflineService>,
    pub sync_coordinator: Arc<SyncCoordinator>,
}

impl AppState {
    pub async fn new(config: AppConfig) -> Result<Self, AppError> {
        let transport = Arc::new(HttpTransport::new(&config.remote)?);
        Self::with_transport(config, transport).await
    }

    /// Same as [`AppState::new`] with a caller-supplied transport.
    pub async fn with_transport(
        config: AppConfig,
        transport: Arc<dyn RemoteTransport>,
    ) -> Result<Self, AppError> {
        config.validate().map_err(AppError::ConfigurationError)?;

        let store = PersistentStore::open(
            StoreOptions::from_config(&config.database),
            STORE_VERSION,
            upgrade,
        )
        .await?;

        let queue = Arc::new(StoreMutationQueue::open(&store).await?);
        let metadata = Arc::new(StoreSyncMetadata::open(&store)?);
        let caches = EntityCaches {
            guests: Arc::new(StoreEntityCache::<CachedGuest>::open(&store)?),
            budgets: Arc::new(StoreEntityCache::<CachedBudgetItem>::open(&store)?),
            vendors: Arc::new(StoreEntityCache::<CachedVendor>::open(&store)?),
        };
        let connectivity = Arc::new(ConnectivityMonitor::new(true));

        let offline_service = Arc::new(OfflineService::new(queue.clone()));
        let sync_coordinator = Arc::new(
            SyncCoordinator::new(
                queue.clone(),
                transport,
                connectivity.clone(),
                metadata,
                caches,
            )
            .with_auto_sync(config.sync.auto_sync),
        );

        info!(
            target: "offline::store",
            store = %store.name(),
            version = store.version(),
            "offline state ready"
        );

        Ok(Self {
            config: Arc::new(config),
            store,
            queue,
            connectivity,
            offline_service,
            sync_coordinator,
        })
    }

    pub async fn shutdown(&self) {
        self.store.close().await;
    }
}
