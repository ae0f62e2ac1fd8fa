pub mod clock;
pub mod mappers;
pub mod metadata_store;
pub mod metrics;
pub mod queue_store;
pub mod rows;
pub mod schema;

pub use clock::LogicalClock;
pub use metadata_store::StoreSyncMetadata;
pub use metrics::{ActionOutcome, SyncMetrics, SyncMetricsSnapshot};
pub use queue_store::StoreMutationQueue;
pub use schema::{STORE_VERSION, upgrade};
