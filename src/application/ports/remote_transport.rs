use crate::domain::entities::PendingAction;
use crate::domain::value_objects::{HttpMethod, RemoteTarget};
use crate::shared::error::AppError;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub struct RemoteRequest {
    pub method: HttpMethod,
    pub target: RemoteTarget,
    pub headers: BTreeMap<String, String>,
    pub body: Option<Value>,
}

impl RemoteRequest {
    pub fn from_action(action: &PendingAction) -> Self {
        Self {
            method: action.method,
            target: action.target.clone(),
            headers: action.extra_headers.clone(),
            body: action.payload.request_body(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RemoteResponse {
    pub status: u16,
    pub body: Option<Value>,
    pub text: String,
}

impl RemoteResponse {
    pub fn new(status: u16, text: impl Into<String>) -> Self {
        let text = text.into();
        let body = serde_json::from_str(&text).ok();
        Self { status, body, text }
    }

    pub fn json(status: u16, body: Value) -> Self {
        Self {
            status,
            text: body.to_string(),
            body: Some(body),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Server-provided failure detail: `error` or `message` from a JSON body,
    /// otherwise the raw text.
    pub fn detail(&self) -> String {
        let from_body = self.body.as_ref().and_then(|body| {
            ["error", "message"]
                .iter()
                .find_map(|key| body.get(*key).and_then(Value::as_str))
                .map(str::to_string)
        });
        match from_body {
            Some(detail) => detail,
            None if self.text.trim().is_empty() => format!("HTTP {}", self.status),
            None => self.text.trim().to_string(),
        }
    }

    pub fn into_error(self) -> AppError {
        let detail = self.detail();
        AppError::remote_rejection(self.status, detail)
    }
}

/// Sends one replayed action to the remote API. Non-2xx responses are returned
/// as `Ok`; `Err` means the request never produced a response.
#[async_trait]
pub trait RemoteTransport: Send + Sync {
    async fn send(&self, request: RemoteRequest) -> Result<RemoteResponse, AppError>;
}
