// apikeys — Top-level error types
//
// Aggregates errors from the store and config modules into a single
// error enum for the application boundary.

use thiserror::Error;

/// Top-level error type for all apikeys operations.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Store error: {0}")]
    Store(#[from] crate::store::StoreError),

    #[error("Config error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// True when the user can fix the problem by changing input or
    /// refreshing the key list.
    pub fn is_recoverable(&self) -> bool {
        match self {
            AppError::Store(e) => e.is_recoverable(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreError;

    #[test]
    fn test_only_store_input_errors_are_recoverable() {
        assert!(AppError::from(StoreError::NotFound(3)).is_recoverable());
        assert!(!AppError::from(StoreError::NotInitialized).is_recoverable());
        assert!(!AppError::Other("boom".to_string()).is_recoverable());
    }
}
