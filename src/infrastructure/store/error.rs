use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid name: {0}")]
    InvalidName(String),

    #[error("Unknown collection: {0}")]
    UnknownCollection(String),

    #[error("Unknown index {index} on collection {collection}")]
    UnknownIndex { collection: String, index: String },

    #[error("Record has no key at path {0}")]
    MissingKey(String),

    #[error("Update rejected: {0}")]
    Rejected(String),
}

impl StoreError {
    /// Stale or closed connection; the store retries these once after reopening.
    pub fn is_connection(&self) -> bool {
        matches!(self, StoreError::Connection(_))
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolClosed
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::WorkerCrashed
            | sqlx::Error::Io(_) => StoreError::Connection(err.to_string()),
            other => StoreError::Database(other.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for StoreError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        StoreError::Schema(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
