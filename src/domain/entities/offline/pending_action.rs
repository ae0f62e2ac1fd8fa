use crate::domain::value_objects::{
    ActionId, ActionKind, ActionPayload, ActionStatus, HttpMethod, RemoteTarget,
};
use serde::Serialize;
use std::collections::BTreeMap;

/// Number of failures after which an action is no longer requeued automatically.
pub const MAX_RETRIES: u32 = 3;

/// A queued mutation as read back from the queue.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingAction {
    pub id: ActionId,
    #[serde(flatten)]
    pub payload: ActionPayload,
    pub target: RemoteTarget,
    pub method: HttpMethod,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub extra_headers: BTreeMap<String, String>,
    /// Logical clock value in epoch milliseconds; the FIFO key.
    pub enqueued_at: i64,
    pub status: ActionStatus,
    pub retry_count: u32,
    pub last_error: Option<String>,
}

impl PendingAction {
    pub fn kind(&self) -> ActionKind {
        self.payload.kind()
    }

    pub fn is_requeueable(&self) -> bool {
        self.status == ActionStatus::Failed && self.retry_count < MAX_RETRIES
    }

    /// Failed and past the automatic retry ceiling; only an operator can clear it.
    pub fn is_exhausted(&self) -> bool {
        self.status == ActionStatus::Failed && self.retry_count >= MAX_RETRIES
    }
}

/// Caller-supplied part of an action, before the queue assigns id and clock.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAction {
    pub payload: ActionPayload,
    pub target: RemoteTarget,
    pub method: HttpMethod,
    pub extra_headers: BTreeMap<String, String>,
}

impl NewAction {
    pub fn new(payload: ActionPayload, target: RemoteTarget, method: HttpMethod) -> Self {
        Self {
            payload,
            target,
            method,
            extra_headers: BTreeMap::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_headers.insert(name.into(), value.into());
        self
    }

    pub fn with_headers(mut self, headers: BTreeMap<String, String>) -> Self {
        self.extra_headers.extend(headers);
        self
    }

    pub fn kind(&self) -> ActionKind {
        self.payload.kind()
    }
}
