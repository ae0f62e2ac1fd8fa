pub mod cache;
pub mod offline;

pub use cache::{CachedBudgetItem, CachedGuest, CachedRecord, CachedVendor};
pub use offline::{
    MAX_RETRIES, NewAction, PendingAction, QueueStats, SkipReason, SyncErrorEntry, SyncResult,
};
