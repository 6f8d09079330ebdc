// apikeys — Store Module
//
// Local API key storage in SQLite. At most one key is active at a time;
// names and values are unique across all stored keys.

mod db;
mod error;
mod handle;
mod models;
mod repository;

pub use db::{Database, DEFAULT_BUSY_TIMEOUT};
pub use error::StoreError;
pub use handle::ApiKeyStore;
pub use models::{ApiKey, ApiKeySummary, KeyField, KeyStats, NewApiKey};
pub use repository::{ApiKeyRepository, SqliteApiKeyRepository};
