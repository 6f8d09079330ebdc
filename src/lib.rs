// apikeys — Library root
//
// Re-exports the store, config, and CLI modules.

pub mod cli;
pub mod config;
pub mod error;
pub mod store;

pub use error::{AppError, Result};
pub use store::{ApiKey, ApiKeyStore, StoreError};
