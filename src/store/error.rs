// API key store error types

use std::path::PathBuf;

use thiserror::Error;

use super::models::KeyField;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to open key database at {}: {source}", .path.display())]
    InitFailure {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Key store is not open; call `open()` first")]
    NotInitialized,

    #[error("Invalid input: {field} must not be empty")]
    InvalidInput { field: KeyField },

    #[error("An API key with the same {field} already exists")]
    Conflict { field: KeyField },

    #[error("API key not found: {0}")]
    NotFound(i64),

    #[error("Activation was rolled back: {0}")]
    TransactionFailure(#[source] rusqlite::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Store worker failed: {0}")]
    Worker(String),
}

impl StoreError {
    /// True for errors the caller can recover from by re-prompting or refreshing.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            StoreError::InvalidInput { .. } | StoreError::Conflict { .. } | StoreError::NotFound(_)
        )
    }
}
