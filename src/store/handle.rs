// apikeys — Shared key store handle
//
// `ApiKeyStore` owns the database lifecycle (`open` / `close`) and exposes
// every repository operation as an async method. All access goes through
// one mutex and runs on tokio's blocking pool, so concurrent callers are
// serialized for their whole check-then-write sequence.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use super::db::{Database, DEFAULT_BUSY_TIMEOUT};
use super::models::{ApiKey, KeyStats, NewApiKey};
use super::repository::{ApiKeyRepository, SqliteApiKeyRepository};
use super::StoreError;

#[derive(Debug, Clone)]
enum Location {
    File { path: PathBuf, busy_timeout: Duration },
    Memory,
}

/// Clonable handle to the key store. Clones share one connection.
#[derive(Clone)]
pub struct ApiKeyStore {
    location: Location,
    db: Arc<Mutex<Option<Database>>>,
}

impl ApiKeyStore {
    /// A store backed by the database file at `path`. Nothing is opened yet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_busy_timeout(path, DEFAULT_BUSY_TIMEOUT)
    }

    pub fn with_busy_timeout(path: impl Into<PathBuf>, busy_timeout: Duration) -> Self {
        Self {
            location: Location::File {
                path: path.into(),
                busy_timeout,
            },
            db: Arc::new(Mutex::new(None)),
        }
    }

    /// A store backed by a private in-memory database.
    pub fn in_memory() -> Self {
        Self {
            location: Location::Memory,
            db: Arc::new(Mutex::new(None)),
        }
    }

    /// Database file path, or `None` for an in-memory store.
    pub fn path(&self) -> Option<&Path> {
        match &self.location {
            Location::File { path, .. } => Some(path),
            Location::Memory => None,
        }
    }

    /// Open the database and ensure the schema. A no-op when already open.
    pub async fn open(&self) -> Result<(), StoreError> {
        let db = Arc::clone(&self.db);
        let location = self.location.clone();

        run_blocking(move || {
            let mut guard = lock(&db);
            if guard.is_some() {
                return Ok(());
            }

            let opened = match location {
                Location::File { path, busy_timeout } => {
                    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                        std::fs::create_dir_all(parent).map_err(|e| StoreError::InitFailure {
                            path: path.clone(),
                            source: Box::new(e),
                        })?;
                    }
                    Database::open(&path, busy_timeout)?
                }
                Location::Memory => Database::open_in_memory()?,
            };

            *guard = Some(opened);
            tracing::debug!("Key store opened");
            Ok(())
        })
        .await
    }

    /// Release the connection. Later operations fail with `NotInitialized`
    /// until `open()` is called again.
    pub async fn close(&self) -> Result<(), StoreError> {
        let db = Arc::clone(&self.db);
        run_blocking(move || {
            if lock(&db).take().is_some() {
                tracing::debug!("Key store closed");
            }
            Ok(())
        })
        .await
    }

    pub fn is_open(&self) -> bool {
        lock(&self.db).is_some()
    }

    pub async fn list(&self) -> Result<Vec<ApiKey>, StoreError> {
        self.with_repo(|repo| repo.list()).await
    }

    pub async fn get(&self, id: i64) -> Result<Option<ApiKey>, StoreError> {
        self.with_repo(move |repo| repo.get(id)).await
    }

    pub async fn get_active(&self) -> Result<Option<ApiKey>, StoreError> {
        self.with_repo(|repo| repo.get_active()).await
    }

    pub async fn add(&self, name: &str, value: &str) -> Result<i64, StoreError> {
        let key = NewApiKey::new(name, value);
        self.with_repo(move |repo| repo.add(key)).await
    }

    pub async fn update(&self, id: i64, name: &str, value: &str) -> Result<(), StoreError> {
        let key = NewApiKey::new(name, value);
        self.with_repo(move |repo| repo.update(id, key)).await
    }

    pub async fn delete(&self, id: i64) -> Result<(), StoreError> {
        self.with_repo(move |repo| repo.delete(id)).await
    }

    pub async fn activate(&self, id: i64) -> Result<(), StoreError> {
        self.with_repo(move |repo| repo.activate(id)).await
    }

    pub async fn stats(&self) -> Result<KeyStats, StoreError> {
        self.with_repo(|repo| repo.stats()).await
    }

    /// Drop and recreate the key table. Every stored key is lost.
    pub async fn reset(&self) -> Result<(), StoreError> {
        let db = Arc::clone(&self.db);
        run_blocking(move || {
            let guard = lock(&db);
            let db = guard.as_ref().ok_or(StoreError::NotInitialized)?;
            db.reset()
        })
        .await
    }

    /// Run `f` against the open database while holding the store lock.
    async fn with_repo<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&SqliteApiKeyRepository<'_>) -> Result<T, StoreError> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        run_blocking(move || {
            let guard = lock(&db);
            let db = guard.as_ref().ok_or(StoreError::NotInitialized)?;
            f(&SqliteApiKeyRepository::new(db))
        })
        .await
    }
}

/// Lock the store. A panic while the lock was held drops the connection,
/// so the next `open()` starts from a fresh one.
fn lock(db: &Mutex<Option<Database>>) -> MutexGuard<'_, Option<Database>> {
    match db.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            let mut guard = poisoned.into_inner();
            *guard = None;
            db.clear_poison();
            tracing::warn!("Key store lock was poisoned; connection dropped");
            guard
        }
    }
}

async fn run_blocking<T, F>(f: F) -> Result<T, StoreError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, StoreError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| StoreError::Worker(e.to_string()))?
}

// ─── Tests ───────────────────────────────────────────────────────────────────
