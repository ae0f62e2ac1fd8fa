use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Closed tag naming the business operation behind a queued action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    CheckIn,
    CreateEntity,
    EditEntity,
    DeleteEntity,
    Other,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::CheckIn => "check_in",
            ActionKind::CreateEntity => "create_entity",
            ActionKind::EditEntity => "edit_entity",
            ActionKind::DeleteEntity => "delete_entity",
            ActionKind::Other => "other",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Entity families the planner keeps offline copies of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Guest,
    BudgetItem,
    Vendor,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Guest => "guest",
            EntityKind::BudgetItem => "budget_item",
            EntityKind::Vendor => "vendor",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckInPayload {
    pub guest_id: String,
    pub wedding_id: String,
    pub checked_in: bool,
    pub checked_in_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEntityPayload {
    pub entity: EntityKind,
    pub parent_id: String,
    pub data: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditEntityPayload {
    pub entity: EntityKind,
    pub entity_id: String,
    pub parent_id: String,
    pub changes: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteEntityPayload {
    pub entity: EntityKind,
    pub entity_id: String,
    pub parent_id: String,
}

/// Action data keyed by kind, so replay code can match exhaustively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload", rename_all = "snake_case")]
pub enum ActionPayload {
    CheckIn(CheckInPayload),
    CreateEntity(CreateEntityPayload),
    EditEntity(EditEntityPayload),
    DeleteEntity(DeleteEntityPayload),
    Other(Value),
}

impl ActionPayload {
    pub fn kind(&self) -> ActionKind {
        match self {
            ActionPayload::CheckIn(_) => ActionKind::CheckIn,
            ActionPayload::CreateEntity(_) => ActionKind::CreateEntity,
            ActionPayload::EditEntity(_) => ActionKind::EditEntity,
            ActionPayload::DeleteEntity(_) => ActionKind::DeleteEntity,
            ActionPayload::Other(_) => ActionKind::Other,
        }
    }

    pub fn entity(&self) -> Option<EntityKind> {
        match self {
            ActionPayload::CheckIn(_) => Some(EntityKind::Guest),
            ActionPayload::CreateEntity(p) => Some(p.entity),
            ActionPayload::EditEntity(p) => Some(p.entity),
            ActionPayload::DeleteEntity(p) => Some(p.entity),
            ActionPayload::Other(_) => None,
        }
    }

    /// JSON body sent to the remote API for this action.
    pub fn request_body(&self) -> Option<Value> {
        match self {
            ActionPayload::CheckIn(p) => Some(serde_json::json!({
                "checkedIn": p.checked_in,
                "checkedInAt": p.checked_in_at,
            })),
            ActionPayload::CreateEntity(p) => Some(Value::Object(p.data.clone())),
            ActionPayload::EditEntity(p) => Some(Value::Object(p.changes.clone())),
            ActionPayload::DeleteEntity(_) => None,
            ActionPayload::Other(value) if value.is_null() => None,
            ActionPayload::Other(value) => Some(value.clone()),
        }
    }

    /// Splits into the stored `(kind, payload)` pair.
    pub fn into_parts(self) -> Result<(ActionKind, Value), String> {
        let kind = self.kind();
        let mut tagged = serde_json::to_value(self).map_err(|e| e.to_string())?;
        let payload = tagged
            .get_mut("payload")
            .map(Value::take)
            .unwrap_or(Value::Null);
        Ok((kind, payload))
    }

    pub fn from_parts(kind: ActionKind, payload: Value) -> Result<Self, String> {
        serde_json::from_value(serde_json::json!({ "kind": kind, "payload": payload }))
            .map_err(|e| format!("Invalid {kind} payload: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn payload_kind_and_entity_follow_variant() {
        let payload = ActionPayload::DeleteEntity(DeleteEntityPayload {
            entity: EntityKind::Vendor,
            entity_id: "v-1".into(),
            parent_id: "w-1".into(),
        });
        assert_eq!(payload.kind(), ActionKind::DeleteEntity);
        assert_eq!(payload.entity(), Some(EntityKind::Vendor));
        assert!(payload.request_body().is_none());
    }

    #[test]
    fn parts_survive_storage_shape() {
        let mut data = Map::new();
        data.insert("firstName".into(), json!("Ada"));
        let payload = ActionPayload::CreateEntity(CreateEntityPayload {
            entity: EntityKind::Guest,
            parent_id: "w-1".into(),
            data,
        });

        let (kind, stored) = payload.clone().into_parts().unwrap();
        assert_eq!(kind, ActionKind::CreateEntity);
        assert_eq!(stored["entity"], json!("guest"));
        assert_eq!(ActionPayload::from_parts(kind, stored).unwrap(), payload);
    }

    #[test]
    fn mismatched_kind_and_payload_is_rejected() {
        let result = ActionPayload::from_parts(ActionKind::CheckIn, json!({"entity": "guest"}));
        assert!(result.is_err());
    }
}
