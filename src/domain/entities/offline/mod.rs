pub mod pending_action;
pub mod queue_stats;
pub mod sync_result;

pub use pending_action::{MAX_RETRIES, NewAction, PendingAction};
pub use queue_stats::QueueStats;
pub use sync_result::{SkipReason, SyncErrorEntry, SyncResult};
