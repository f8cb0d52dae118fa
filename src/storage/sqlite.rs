//! SQLite-backed owner-partitioned key-value storage
//!
//! Primary backend on native targets. One `records` table keyed by
//! `(owner, key)`; schema version mismatches trigger nuke-and-rebuild.

use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::StoreResult;
use crate::storage::StorageBackend;

/// Schema version - increment to trigger nuke-and-rebuild
const SCHEMA_VERSION: i32 = 1;

/// Owner-partitioned key-value store over SQLite
pub struct SqliteBackend {
    conn: Connection,
}

impl SqliteBackend {
    /// Open or create the database under `dir`
    pub fn open_at(dir: &Path) -> StoreResult<Self> {
        std::fs::create_dir_all(dir)?;
        let db_path = dir.join("bazaar.db");
        let conn = Connection::open(&db_path)?;

        // Check schema version - nuke if mismatched
        let version: i32 = conn
            .pragma_query_value(None, "user_version", |r| r.get(0))
            .unwrap_or(0);

        if version != 0 && version != SCHEMA_VERSION {
            log::info!(
                "Storage schema version mismatch ({} != {}), rebuilding",
                version,
                SCHEMA_VERSION
            );
            drop(conn);
            Self::nuke(&db_path)?;
            return Self::open_at(dir);
        }

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS records (
                owner TEXT NOT NULL,
                key TEXT NOT NULL,
                value BLOB NOT NULL,
                PRIMARY KEY (owner, key)
            );

            CREATE INDEX IF NOT EXISTS idx_records_owner ON records(owner);
            "#,
        )?;

        conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;

        Ok(Self { conn })
    }

    fn nuke(db_path: &PathBuf) -> StoreResult<()> {
        if db_path.exists() {
            std::fs::remove_file(db_path)?;
        }
        Ok(())
    }
}

impl StorageBackend for SqliteBackend {
    fn get(&self, owner: &str, key: &str) -> StoreResult<Option<Vec<u8>>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM records WHERE owner = ?1 AND key = ?2",
                params![owner, key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn put(&self, owner: &str, key: &str, value: &[u8]) -> StoreResult<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO records (owner, key, value) VALUES (?1, ?2, ?3)",
            params![owner, key, value],
        )?;
        Ok(())
    }

    fn delete(&self, owner: &str, key: &str) -> StoreResult<bool> {
        let deleted = self.conn.execute(
            "DELETE FROM records WHERE owner = ?1 AND key = ?2",
            params![owner, key],
        )?;
        Ok(deleted > 0)
    }

    fn list_keys(&self, owner: &str, prefix: &str) -> StoreResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT key FROM records WHERE owner = ?1 ORDER BY key")?;
        let keys = stmt
            .query_map(params![owner], |row| row.get::<_, String>(0))?
            .filter_map(|k| k.ok())
            .filter(|k| k.starts_with(prefix))
            .collect();
        Ok(keys)
    }
}
