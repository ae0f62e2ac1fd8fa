use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of a queued action. There is deliberately no succeeded state:
/// confirmed success deletes the action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    Pending,
    Syncing,
    Failed,
}

impl ActionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionStatus::Pending => "pending",
            ActionStatus::Syncing => "syncing",
            ActionStatus::Failed => "failed",
        }
    }

    /// Legal edges: Pending -> Syncing, Syncing -> Failed, Failed -> Pending.
    /// Syncing -> removed is a delete, not a status change.
    pub fn can_transition_to(&self, next: ActionStatus) -> bool {
        matches!(
            (self, next),
            (ActionStatus::Pending, ActionStatus::Syncing)
                | (ActionStatus::Syncing, ActionStatus::Failed)
                | (ActionStatus::Failed, ActionStatus::Pending)
        )
    }
}

impl fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ActionStatus {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "pending" => Ok(ActionStatus::Pending),
            "syncing" => Ok(ActionStatus::Syncing),
            "failed" => Ok(ActionStatus::Failed),
            other => Err(format!("Unknown action status: {other}")),
        }
    }
}
