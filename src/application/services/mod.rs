pub mod offline_service;
pub mod sync_coordinator;

pub use offline_service::{OfflineService, OfflineServiceTrait};
pub use sync_coordinator::{EntityCaches, SyncCoordinator, SyncState, SyncStatus};
