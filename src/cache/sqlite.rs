//! SQLite cache backend

use super::{CacheError, CacheKey, CacheResult, CacheStore};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// How long a writer waits on another process holding the database lock.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite-backed cache
///
/// One database file with a table per namespace. Thread-safe via internal mutex on the
/// connection; other processes sharing the file are serialized by SQLite's own locking.
pub struct SqliteCache {
    conn: Mutex<Connection>,
}

impl SqliteCache {
    fn init_schema(conn: &Connection) -> CacheResult<()> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS fiction_index (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                stored_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS chapter_content (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                stored_at TEXT NOT NULL
            );

            PRAGMA journal_mode = WAL;
            "#,
        )?;
        Ok(())
    }

    /// Open (creating if needed) the cache at `path`, including missing parent directories.
    pub fn open(path: impl AsRef<Path>) -> CacheResult<Self> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path.as_ref())?;
        Self::init_schema(&conn)?;
        tracing::debug!(path = %path.as_ref().display(), "opened cache");

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> CacheResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> CacheResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| CacheError::Poisoned)
    }
}

impl CacheStore for SqliteCache {
    fn get(&self, key: &CacheKey) -> CacheResult<Option<String>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT value FROM {} WHERE key = ?1",
            key.namespace().table()
        );
        let value = conn
            .query_row(&sql, params![key.key()], |row| row.get(0))
            .optional()?;
        Ok(value)
    }

    fn put(&self, key: &CacheKey, value: &str) -> CacheResult<()> {
        let conn = self.conn()?;
        let sql = format!(
            r#"
            INSERT INTO {} (key, value, stored_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                stored_at = excluded.stored_at
            "#,
            key.namespace().table()
        );
        conn.execute(
            &sql,
            params![key.key(), value, chrono::Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    fn exists(&self, key: &CacheKey) -> CacheResult<bool> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE key = ?1)",
            key.namespace().table()
        );
        let exists: bool = conn.query_row(&sql, params![key.key()], |row| row.get(0))?;
        Ok(exists)
    }
}
