// apikeys — SQLite database management
//
// Opens the key database and makes sure the schema exists. Schema setup
// is `CREATE ... IF NOT EXISTS` throughout, so opening is idempotent.

use std::path::Path;
use std::time::Duration;

use rusqlite::Connection;

use super::StoreError;

/// Default time a writer waits on a locked database file.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_millis(5000);

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS api_keys (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        name        TEXT NOT NULL UNIQUE,
        value       TEXT NOT NULL UNIQUE,
        active      INTEGER NOT NULL DEFAULT 0 CHECK (active IN (0, 1)),
        created_at  TEXT NOT NULL
    );

    CREATE UNIQUE INDEX IF NOT EXISTS idx_api_keys_single_active
        ON api_keys(active) WHERE active = 1;
";

/// Wrapper around the SQLite connection holding the `api_keys` table.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) the database file at `path`.
    pub fn open(path: &Path, busy_timeout: Duration) -> Result<Self, StoreError> {
        let init_failure = |source: rusqlite::Error| StoreError::InitFailure {
            path: path.to_path_buf(),
            source: Box::new(source),
        };

        let conn = Connection::open(path).map_err(init_failure)?;
        conn.busy_timeout(busy_timeout).map_err(init_failure)?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))
            .map_err(init_failure)?;

        let db = Self { conn };
        db.run_migrations().map_err(|e| match e {
            StoreError::Database(source) => init_failure(source),
            other => other,
        })?;

        tracing::debug!(path = %path.display(), "Key database opened");
        Ok(db)
    }

    /// Open a private in-memory database. Nothing survives the handle.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(|source| StoreError::InitFailure {
            path: ":memory:".into(),
            source: Box::new(source),
        })?;
        let db = Self { conn };
        db.run_migrations()?;
        Ok(db)
    }

    /// Get a reference to the underlying connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Drop the table and recreate it empty. Recovery only.
    pub fn reset(&self) -> Result<(), StoreError> {
        self.conn.execute_batch(
            "DROP INDEX IF EXISTS idx_api_keys_single_active;
             DROP TABLE IF EXISTS api_keys;",
        )?;
        self.run_migrations()?;
        tracing::warn!("Key table dropped and recreated");
        Ok(())
    }

    fn run_migrations(&self) -> Result<(), StoreError> {
        self.conn.execute_batch(SCHEMA)?;
        tracing::debug!("Key schema ensured");
        Ok(())
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn table_count(db: &Database) -> i64 {
        db.conn()
            .query_row(
                "SELECT count(*) FROM sqlite_master WHERE type='table' AND name='api_keys'",
                [],
                |row| row.get(0),
            )
            .unwrap()
    }

    #[test]
    fn test_open_in_memory_creates_table() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(table_count(&db), 1, "api_keys table should exist");
    }

    #[test]
    fn test_schema_setup_is_idempotent() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.run_migrations().is_ok());
        assert!(db.run_migrations().is_ok());
        assert_eq!(table_count(&db), 1);
    }

    #[test]
    fn test_active_column_rejects_non_boolean() {
        let db = Database::open_in_memory().unwrap();
        let result = db.conn().execute(
            "INSERT INTO api_keys (name, value, active, created_at) VALUES ('a', 'b', 2, 'now')",
            [],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_second_active_row_is_rejected_by_index() {
        let db = Database::open_in_memory().unwrap();
        db.conn()
            .execute(
                "INSERT INTO api_keys (name, value, active, created_at) VALUES ('a', 'k1', 1, 'now')",
                [],
            )
            .unwrap();
        let result = db.conn().execute(
            "INSERT INTO api_keys (name, value, active, created_at) VALUES ('b', 'k2', 1, 'now')",
            [],
        );
        assert!(result.is_err(), "only one row may carry active = 1");
    }

    #[test]
    fn test_reset_empties_table() {
        let db = Database::open_in_memory().unwrap();
        db.conn()
            .execute(
                "INSERT INTO api_keys (name, value, created_at) VALUES ('a', 'k1', 'now')",
                [],
            )
            .unwrap();

        db.reset().unwrap();

        let rows: i64 = db
            .conn()
            .query_row("SELECT count(*) FROM api_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, 0);
        assert_eq!(table_count(&db), 1);
    }

    #[test]
    fn test_file_database_persists_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keys.db");

        {
            let db = Database::open(&path, DEFAULT_BUSY_TIMEOUT).unwrap();
            db.conn()
                .execute(
                    "INSERT INTO api_keys (name, value, created_at) VALUES ('a', 'k1', 'now')",
                    [],
                )
                .unwrap();
        }

        let db = Database::open(&path, DEFAULT_BUSY_TIMEOUT).unwrap();
        let rows: i64 = db
            .conn()
            .query_row("SELECT count(*) FROM api_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[test]
    fn test_open_in_missing_directory_is_init_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("keys.db");

        let err = Database::open(&path, DEFAULT_BUSY_TIMEOUT).err().unwrap();
        assert!(matches!(err, StoreError::InitFailure { .. }));
    }
}
