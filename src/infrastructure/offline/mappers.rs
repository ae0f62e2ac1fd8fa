use super::rows::PendingActionRow;
use crate::domain::entities::{NewAction, PendingAction};
use crate::domain::value_objects::{ActionId, ActionPayload, ActionStatus, RemoteTarget};
use crate::shared::error::AppError;

pub fn row_from_new_action(action: NewAction, enqueued_at: i64) -> Result<PendingActionRow, AppError> {
    let NewAction {
        payload,
        target,
        method,
        extra_headers,
    } = action;
    let (kind, payload) = payload.into_parts().map_err(AppError::SerializationError)?;

    Ok(PendingActionRow {
        id: None,
        kind,
        target: target.into(),
        method,
        payload,
        extra_headers,
        enqueued_at,
        status: ActionStatus::Pending,
        retry_count: 0,
        last_error: None,
    })
}

pub fn pending_action_from_row(row: PendingActionRow) -> Result<PendingAction, AppError> {
    let id = row
        .id
        .ok_or_else(|| AppError::DeserializationError("queued action without id".to_string()))
        .and_then(|id| ActionId::new(id).map_err(AppError::DeserializationError))?;
    let payload =
        ActionPayload::from_parts(row.kind, row.payload).map_err(AppError::DeserializationError)?;
    let target = RemoteTarget::new(row.target).map_err(AppError::DeserializationError)?;

    Ok(PendingAction {
        id,
        payload,
        target,
        method: row.method,
        extra_headers: row.extra_headers,
        enqueued_at: row.enqueued_at,
        status: row.status,
        retry_count: row.retry_count,
        last_error: row.last_error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::HttpMethod;
    use serde_json::json;

    #[test]
    fn new_action_becomes_fresh_pending_row() {
        let action = NewAction::new(
            ActionPayload::Other(json!({"a": 1})),
            RemoteTarget::new("/api/x").unwrap(),
            HttpMethod::Put,
        )
        .with_header("If-Match", "v3");

        let row = row_from_new_action(action, 42).unwrap();
        assert!(row.id.is_none());
        assert_eq!(row.status, ActionStatus::Pending);
        assert_eq!(row.retry_count, 0);
        assert_eq!(row.payload, json!({"a": 1}));

        let value = serde_json::to_value(&row).unwrap();
        assert!(value.get("id").is_none());
        assert_eq!(value["status"], json!("pending"));
        assert_eq!(value["extraHeaders"]["If-Match"], json!("v3"));
    }

    #[test]
    fn row_without_id_is_rejected() {
        let row = row_from_new_action(
            NewAction::new(
                ActionPayload::Other(json!(null)),
                RemoteTarget::new("/api/x").unwrap(),
                HttpMethod::Delete,
            ),
            1,
        )
        .unwrap();
        assert!(matches!(
            pending_action_from_row(row),
            Err(AppError::DeserializationError(_))
        ));
    }
}
