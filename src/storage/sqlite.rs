//! SQLite local store for netpulse-sync.
//!
//! Implements `LocalRecordStore` using rusqlite (bundled). Every key lives in
//! one row of `sync_records`. The connection sits behind a `parking_lot`
//! mutex, and `update()` runs its read and write inside one transaction while
//! holding that mutex.

use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use rusqlite::{params, OptionalExtension};

use crate::error::{Result, StorageError};
use crate::types::Blob;

use super::traits::{LocalRecordStore, UpdateFn};

// ============================================================================
// SqliteRecordStore
// ============================================================================

pub struct SqliteRecordStore {
    conn: Mutex<rusqlite::Connection>,
    initialized: bool,
}

impl SqliteRecordStore {
    /// Open a file-backed SQLite database.
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self, StorageError> {
        let conn = rusqlite::Connection::open(path)?;
        Ok(Self {
            conn: Mutex::new(conn),
            initialized: false,
        })
    }

    /// Open an in-memory SQLite database (useful for tests).
    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = rusqlite::Connection::open_in_memory()?;
        Ok(Self {
            conn: Mutex::new(conn),
            initialized: false,
        })
    }

    /// Create the table and apply pragmas. Safe to call more than once.
    pub fn initialize(&mut self) -> Result<(), StorageError> {
        {
            let conn = self.conn.lock();
            // journal_mode returns a row, so it cannot go through execute().
            conn.query_row("PRAGMA journal_mode=WAL", [], |_| Ok(()))?;
            conn.execute_batch(
                "PRAGMA synchronous=NORMAL;
                 PRAGMA busy_timeout=5000;
                 CREATE TABLE IF NOT EXISTS sync_records (
                    key        TEXT PRIMARY KEY,
                    value      BLOB NOT NULL,
                    updated_at INTEGER NOT NULL
                 );",
            )?;
        }
        self.initialized = true;
        Ok(())
    }

    /// Returns whether `initialize()` has been called.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    // -----------------------------------------------------------------------
    // Internal helpers
    // -----------------------------------------------------------------------

    fn ensure_initialized(&self) -> Result<(), StorageError> {
        if self.initialized {
            Ok(())
        } else {
            Err(StorageError::NotInitialized)
        }
    }

    fn read(conn: &rusqlite::Connection, key: &str) -> rusqlite::Result<Option<Blob>> {
        conn.prepare_cached("SELECT value FROM sync_records WHERE key = ?1")?
            .query_row(params![key], |row| row.get::<_, Blob>(0))
            .optional()
    }

    fn write(conn: &rusqlite::Connection, key: &str, value: &[u8]) -> rusqlite::Result<()> {
        conn.prepare_cached(
            "INSERT INTO sync_records (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        )?
        .execute(params![key, value, now_ms()])
        .map(|_| ())
    }
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

impl LocalRecordStore for SqliteRecordStore {
    fn get(&self, key: &str) -> Result<Option<Blob>, StorageError> {
        self.ensure_initialized()?;
        let conn = self.conn.lock();
        Ok(Self::read(&conn, key)?)
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        self.ensure_initialized()?;
        let conn = self.conn.lock();
        Ok(Self::write(&conn, key, value)?)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.ensure_initialized()?;
        let conn = self.conn.lock();
        conn.execute("DELETE FROM sync_records WHERE key = ?1", params![key])?;
        Ok(())
    }

    fn update(&self, key: &str, f: &mut UpdateFn<'_>) -> Result<bool, StorageError> {
        self.ensure_initialized()?;
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let current = Self::read(&tx, key)?;
        let written = match f(current.as_deref()) {
            Some(value) => {
                Self::write(&tx, key, &value)?;
                true
            }
            None => false,
        };
        tx.commit()?;
        Ok(written)
    }
}
