pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod shared;
pub mod state;

pub use application::ports::{Connectivity, MutationQueue, RemoteTransport, SyncObserver};
pub use application::services::{OfflineService, OfflineServiceTrait, SyncCoordinator};
pub use domain::entities::{
    CachedBudgetItem, CachedGuest, CachedVendor, NewAction, PendingAction, QueueStats, SyncResult,
};
pub use domain::value_objects::{ActionId, ActionPayload, EntityKind, HttpMethod, RemoteTarget};
pub use shared::{AppConfig, AppError, Result};
pub use state::AppState;

/// Installs the global tracing subscriber. `RUST_LOG` overrides the default
/// filter.
pub fn init_logging() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "offline=debug,offline_sync=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
