use crate::infrastructure::store::StoreError;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Schema(String),
    Connection(String),
    Database(String),
    Transport(String),
    RemoteRejection { status: u16, detail: String },
    RetryExhausted(String),
    InvalidTransition(String),
    NotFound(String),
    InvalidInput(String),
    ValidationError(String),
    ConfigurationError(String),
    SerializationError(String),
    DeserializationError(String),
    Internal(String),
}

impl AppError {
    pub fn remote_rejection(status: u16, detail: impl Into<String>) -> Self {
        AppError::RemoteRejection {
            status,
            detail: detail.into(),
        }
    }

    /// Errors after which nothing else in the store can be trusted.
    pub fn is_fatal(&self) -> bool {
        matches!(self, AppError::Schema(_))
    }

    /// Errors raised while replaying a single action; these never abort a pass.
    pub fn is_replay_failure(&self) -> bool {
        matches!(
            self,
            AppError::Transport(_) | AppError::RemoteRejection { .. }
        )
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Schema(msg) => write!(f, "Schema error: {}", msg),
            AppError::Connection(msg) => write!(f, "Connection error: {}", msg),
            AppError::Database(msg) => write!(f, "Database error: {}", msg),
            AppError::Transport(msg) => write!(f, "Transport error: {}", msg),
            AppError::RemoteRejection { status, detail } => {
                write!(f, "Remote rejected request ({}): {}", status, detail)
            }
            AppError::RetryExhausted(msg) => write!(f, "Retries exhausted: {}", msg),
            AppError::InvalidTransition(msg) => write!(f, "Invalid transition: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            AppError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            AppError::ConfigurationError(msg) => write!(f, "Configuration error: {}", msg),
            AppError::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
            AppError::DeserializationError(msg) => write!(f, "Deserialization error: {}", msg),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Schema(msg) => AppError::Schema(msg),
            StoreError::Connection(msg) => AppError::Connection(msg),
            StoreError::Serialization(msg) => AppError::SerializationError(msg),
            StoreError::UnknownCollection(name) => {
                AppError::NotFound(format!("collection {name}"))
            }
            StoreError::UnknownIndex { collection, index } => {
                AppError::NotFound(format!("index {index} on {collection}"))
            }
            StoreError::InvalidName(msg) => AppError::InvalidInput(msg),
            StoreError::Rejected(msg) => AppError::InvalidTransition(msg),
            other => AppError::Database(other.to_string()),
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Database(err.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for AppError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        AppError::Schema(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::SerializationError(err.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AppError::Transport(format!("request timed out: {err}"))
        } else {
            AppError::Transport(err.to_string())
        }
    }
}

impl From<String> for AppError {
    fn from(err: String) -> Self {
        AppError::Internal(err)
    }
}

impl From<&str> for AppError {
    fn from(err: &str) -> Self {
        AppError::Internal(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
