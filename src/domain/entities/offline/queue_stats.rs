use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueStats {
    pub pending: u64,
    pub syncing: u64,
    pub failed: u64,
    /// Failed actions already at the retry ceiling.
    pub exhausted: u64,
    pub oldest_pending_at: Option<i64>,
}

impl QueueStats {
    pub fn total(&self) -> u64 {
        self.pending + self.syncing + self.failed
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}
