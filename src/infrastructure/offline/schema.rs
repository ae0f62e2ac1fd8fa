use crate::infrastructure::store::{StoreError, UpgradePlan};
use tracing::info;

pub const STORE_VERSION: u32 = 2;

pub const QUEUE_COLLECTION: &str = "offlineQueue";
pub const METADATA_COLLECTION: &str = "metadata";
pub const GUESTS_COLLECTION: &str = "guests";
pub const BUDGETS_COLLECTION: &str = "budgets";
pub const VENDORS_COLLECTION: &str = "vendors";

pub const CACHE_COLLECTIONS: [&str; 3] = [GUESTS_COLLECTION, BUDGETS_COLLECTION, VENDORS_COLLECTION];

pub const STATUS_INDEX: &str = "status";
pub const TIMESTAMP_INDEX: &str = "timestamp";
pub const KIND_INDEX: &str = "kind";
pub const PARENT_INDEX: &str = "parentId";
pub const UPDATED_INDEX: &str = "updatedAt";

/// Upgrade callback for the offline store. Each step is additive so older
/// stores keep their rows.
pub fn upgrade(plan: &mut UpgradePlan, old_version: u32, new_version: u32) -> Result<(), StoreError> {
    if old_version < 1 {
        plan.create_collection(QUEUE_COLLECTION, "id", true)?
            .create_index(QUEUE_COLLECTION, TIMESTAMP_INDEX, "enqueuedAt")?
            .create_index(QUEUE_COLLECTION, KIND_INDEX, "kind")?
            .create_index(QUEUE_COLLECTION, STATUS_INDEX, "status")?;
        for name in CACHE_COLLECTIONS {
            plan.create_collection(name, "id", false)?
                .create_index(name, PARENT_INDEX, "weddingId")?;
        }
        plan.create_collection(METADATA_COLLECTION, "key", false)?;
    }

    if old_version < 2 {
        for name in CACHE_COLLECTIONS {
            plan.create_index(name, UPDATED_INDEX, "updatedAt")?;
        }
    }

    info!(
        target: "offline::store",
        from = old_version,
        to = new_version,
        "planned offline store upgrade"
    );
    Ok(())
}
