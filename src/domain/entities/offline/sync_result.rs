use crate::domain::value_objects::{ActionId, ActionKind};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    Offline,
    AlreadySyncing,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncErrorEntry {
    pub action_id: ActionId,
    pub kind: ActionKind,
    pub message: String,
    pub retry_count: u32,
}

/// Outcome of one sync pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResult {
    pub success: bool,
    pub synced: u32,
    pub failed: u32,
    pub errors: Vec<SyncErrorEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<SkipReason>,
}

impl SyncResult {
    pub fn new() -> Self {
        Self {
            success: true,
            synced: 0,
            failed: 0,
            errors: Vec::new(),
            skipped: None,
        }
    }

    pub fn skipped(reason: SkipReason) -> Self {
        Self {
            skipped: Some(reason),
            ..Self::new()
        }
    }

    pub fn record_synced(&mut self) {
        self.synced += 1;
    }

    pub fn record_failure(&mut self, entry: SyncErrorEntry) {
        self.failed += 1;
        self.success = false;
        self.errors.push(entry);
    }

    pub fn is_skipped(&self) -> bool {
        self.skipped.is_some()
    }

    pub fn attempted(&self) -> u32 {
        self.synced + self.failed
    }
}

impl Default for SyncResult {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_flips_success() {
        let mut result = SyncResult::new();
        result.record_synced();
        assert!(result.success);

        result.record_failure(SyncErrorEntry {
            action_id: ActionId::new(2).unwrap(),
            kind: ActionKind::EditEntity,
            message: "boom".into(),
            retry_count: 1,
        });
        assert!(!result.success);
        assert_eq!((result.synced, result.failed), (1, 1));
        assert_eq!(result.attempted(), 2);
    }

    #[test]
    fn skipped_result_is_empty_and_successful() {
        let result = SyncResult::skipped(SkipReason::Offline);
        assert!(result.success);
        assert_eq!(result.attempted(), 0);
        assert_eq!(result.skipped, Some(SkipReason::Offline));
    }
}
