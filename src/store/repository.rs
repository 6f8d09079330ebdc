// apikeys — Key store repository
//
// Implements the key operations against a borrowed `Database`.
// Every check-then-write sequence runs inside a `BEGIN IMMEDIATE`
// transaction; the table's UNIQUE constraints are the final backstop.

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{ffi, params, Connection, OptionalExtension, Transaction, TransactionBehavior};

use super::db::Database;
use super::models::{ApiKey, KeyField, KeyStats, NewApiKey};
use super::StoreError;

const SELECT_KEYS: &str = "SELECT id, name, value, active, created_at FROM api_keys";

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over API key storage operations.
pub trait ApiKeyRepository {
    /// All keys, most recently created first.
    fn list(&self) -> Result<Vec<ApiKey>, StoreError>;

    /// A single key by id.
    fn get(&self, id: i64) -> Result<Option<ApiKey>, StoreError>;

    /// The active key, if one is set.
    fn get_active(&self) -> Result<Option<ApiKey>, StoreError>;

    /// Store a new, inactive key. Returns the assigned id.
    fn add(&self, key: NewApiKey) -> Result<i64, StoreError>;

    /// Rewrite the name and value of an existing key. Leaves `active` alone.
    fn update(&self, id: i64, key: NewApiKey) -> Result<(), StoreError>;

    /// Delete a key. Deleting the active key leaves no key active.
    fn delete(&self, id: i64) -> Result<(), StoreError>;

    /// Make `id` the only active key.
    fn activate(&self, id: i64) -> Result<(), StoreError>;

    /// Total and active row counts.
    fn stats(&self) -> Result<KeyStats, StoreError>;
}

// ─── SQLite Implementation ──────────────────────────────────────────────────

pub struct SqliteApiKeyRepository<'a> {
    db: &'a Database,
}

impl<'a> SqliteApiKeyRepository<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    fn begin(&self) -> rusqlite::Result<Transaction<'a>> {
        Transaction::new_unchecked(self.db.conn(), TransactionBehavior::Immediate)
    }

    /// Parse a key row from the database.
    fn row_to_key(row: &rusqlite::Row<'_>) -> rusqlite::Result<ApiKey> {
        let created_at_str: String = row.get(4)?;
        let created_at = DateTime::parse_from_rfc3339(&created_at_str)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    4,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })?;

        Ok(ApiKey::new(
            row.get(0)?,
            row.get(1)?,
            row.get(2)?,
            row.get(3)?,
            created_at,
        ))
    }

    /// Look for another row already holding `name` or `value`.
    /// `exclude_id` skips the row being updated.
    fn find_conflict(
        conn: &Connection,
        name: &str,
        value: &str,
        exclude_id: Option<i64>,
    ) -> Result<Option<KeyField>, StoreError> {
        let same_name: Option<bool> = conn
            .query_row(
                "SELECT name = ?1 FROM api_keys
                 WHERE (name = ?1 OR value = ?2) AND id IS NOT ?3
                 ORDER BY name = ?1 DESC
                 LIMIT 1",
                params![name, value, exclude_id],
                |row| row.get(0),
            )
            .optional()?;

        Ok(same_name.map(|same| if same { KeyField::Name } else { KeyField::Value }))
    }

    fn exists(conn: &Connection, id: i64) -> Result<bool, StoreError> {
        let found = conn
            .query_row("SELECT 1 FROM api_keys WHERE id = ?1", params![id], |_| Ok(()))
            .optional()?;
        Ok(found.is_some())
    }
}

/// Map a UNIQUE constraint failure on `name`/`value` to `Conflict`.
fn map_write_error(err: rusqlite::Error) -> StoreError {
    if let rusqlite::Error::SqliteFailure(ref e, Some(ref msg)) = err {
        if e.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE {
            if msg.contains("api_keys.name") {
                return StoreError::Conflict {
                    field: KeyField::Name,
                };
            }
            if msg.contains("api_keys.value") {
                return StoreError::Conflict {
                    field: KeyField::Value,
                };
            }
        }
    }
    StoreError::Database(err)
}

impl<'a> ApiKeyRepository for SqliteApiKeyRepository<'a> {
    fn list(&self) -> Result<Vec<ApiKey>, StoreError> {
        let mut stmt = self
            .db
            .conn()
            .prepare(&format!("{} ORDER BY id DESC", SELECT_KEYS))?;

        let rows = stmt.query_map([], Self::row_to_key)?;

        let mut keys = Vec::new();
        for row in rows {
            keys.push(row?);
        }

        Ok(keys)
    }

    fn get(&self, id: i64) -> Result<Option<ApiKey>, StoreError> {
        let key = self
            .db
            .conn()
            .query_row(
                &format!("{} WHERE id = ?1", SELECT_KEYS),
                params![id],
                Self::row_to_key,
            )
            .optional()?;
        Ok(key)
    }

    fn get_active(&self) -> Result<Option<ApiKey>, StoreError> {
        let key = self
            .db
            .conn()
            .query_row(
                &format!("{} WHERE active = 1 LIMIT 1", SELECT_KEYS),
                [],
                Self::row_to_key,
            )
            .optional()?;
        Ok(key)
    }

    fn add(&self, key: NewApiKey) -> Result<i64, StoreError> {
        key.validate()?;

        let tx = self.begin()?;

        if let Some(field) = Self::find_conflict(&tx, &key.name, &key.value, None)? {
            tracing::warn!(name = %key.name, %field, "Rejected duplicate API key");
            return Err(StoreError::Conflict { field });
        }

        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);
        tx.execute(
            "INSERT INTO api_keys (name, value, active, created_at) VALUES (?1, ?2, 0, ?3)",
            params![key.name, key.value.as_str(), now],
        )
        .map_err(map_write_error)?;
        let id = tx.last_insert_rowid();

        tx.commit()?;

        tracing::info!(key_id = id, name = %key.name, "API key stored");
        Ok(id)
    }

    fn update(&self, id: i64, key: NewApiKey) -> Result<(), StoreError> {
        key.validate()?;

        let tx = self.begin()?;

        if !Self::exists(&tx, id)? {
            tracing::warn!(key_id = id, "Update of unknown API key");
            return Err(StoreError::NotFound(id));
        }

        if let Some(field) = Self::find_conflict(&tx, &key.name, &key.value, Some(id))? {
            tracing::warn!(key_id = id, name = %key.name, %field, "Rejected conflicting update");
            return Err(StoreError::Conflict { field });
        }

        let affected = tx
            .execute(
                "UPDATE api_keys SET name = ?1, value = ?2 WHERE id = ?3",
                params![key.name, key.value.as_str(), id],
            )
            .map_err(map_write_error)?;
        if affected == 0 {
            return Err(StoreError::NotFound(id));
        }

        tx.commit()?;

        tracing::info!(key_id = id, name = %key.name, "API key updated");
        Ok(())
    }

    fn delete(&self, id: i64) -> Result<(), StoreError> {
        let tx = self.begin()?;

        let was_active: Option<bool> = tx
            .query_row(
                "SELECT active FROM api_keys WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;
        let Some(was_active) = was_active else {
            tracing::warn!(key_id = id, "Delete of unknown API key");
            return Err(StoreError::NotFound(id));
        };

        let affected = tx.execute("DELETE FROM api_keys WHERE id = ?1", params![id])?;
        if affected == 0 {
            return Err(StoreError::NotFound(id));
        }

        tx.commit()?;

        tracing::info!(key_id = id, was_active, "API key deleted");
        Ok(())
    }

    fn activate(&self, id: i64) -> Result<(), StoreError> {
        let tx = self.begin().map_err(StoreError::TransactionFailure)?;

        if !Self::exists(&tx, id)? {
            tracing::warn!(key_id = id, "Activation of unknown API key");
            return Err(StoreError::NotFound(id));
        }

        // Dropping `tx` on any early return rolls both statements back.
        tx.execute("UPDATE api_keys SET active = 0 WHERE active = 1", [])
            .map_err(StoreError::TransactionFailure)?;
        let affected = tx
            .execute("UPDATE api_keys SET active = 1 WHERE id = ?1", params![id])
            .map_err(StoreError::TransactionFailure)?;
        if affected == 0 {
            return Err(StoreError::NotFound(id));
        }

        tx.commit().map_err(StoreError::TransactionFailure)?;

        tracing::info!(key_id = id, "API key activated");
        Ok(())
    }

    fn stats(&self) -> Result<KeyStats, StoreError> {
        let (total, active): (i64, i64) = self.db.conn().query_row(
            "SELECT count(*), coalesce(sum(active), 0) FROM api_keys",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        Ok(KeyStats {
            total: total.max(0) as u64,
            active: active.max(0) as u64,
        })
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
