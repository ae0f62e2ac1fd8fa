use crate::domain::value_objects::{ActionKind, ActionStatus, HttpMethod};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Stored shape of a queued action in the `offlineQueue` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingActionRow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub kind: ActionKind,
    pub target: String,
    pub method: HttpMethod,
    #[serde(default)]
    pub payload: Value,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra_headers: BTreeMap<String, String>,
    pub enqueued_at: i64,
    pub status: ActionStatus,
    #[serde(default)]
    pub retry_count: u32,
    #[serde(default)]
    pub last_error: Option<String>,
}

/// Stored shape of a `metadata` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataRow {
    pub key: String,
    pub value: Value,
}
