//! Pluggable key-value blob backends.
//!
//! The request collection persists as one JSON blob under a fixed key. The
//! durable implementation is a single-table SQLite database; when no durable
//! storage is available the store falls back to an instance-scoped in-memory
//! map with process lifetime.

use std::collections::HashMap;
use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};
use thiserror::Error;
use tracing::warn;

/// Backend write failures. Reads never fail: an unreadable key is absent.
#[derive(Error, Debug)]
pub enum BlobWriteError {
    #[error("SQLite write failed: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("write rejected: {0}")]
    Rejected(String),
}

/// A key-value store holding serialized blobs.
pub trait BlobStore: Send {
    /// Read the blob under `key`, or `None` when absent or unreadable.
    fn get(&self, key: &str) -> Option<String>;

    /// Write the blob under `key`, replacing any previous value.
    fn set(&mut self, key: &str, value: &str) -> Result<(), BlobWriteError>;
}

/// Instance-scoped in-memory backend, used when durable storage is
/// unavailable and for tests.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: HashMap<String, String>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BlobStore for MemoryBlobStore {
    fn get(&self, key: &str) -> Option<String> {
        self.blobs.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), BlobWriteError> {
        self.blobs.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Durable SQLite-backed blob store.
pub struct SqliteBlobStore {
    conn: Connection,
}

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS blobs (
    key   TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

impl SqliteBlobStore {
    /// Open a blob store at path, creating if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, rusqlite::Error> {
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Create an in-memory SQLite store (for testing).
    pub fn open_in_memory() -> Result<Self, rusqlite::Error> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }
}

impl BlobStore for SqliteBlobStore {
    fn get(&self, key: &str) -> Option<String> {
        let result = self
            .conn
            .query_row("SELECT value FROM blobs WHERE key = ?", [key], |row| {
                row.get(0)
            })
            .optional();

        match result {
            Ok(value) => value,
            Err(e) => {
                warn!(key, error = %e, "blob read failed, treating as absent");
                None
            }
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), BlobWriteError> {
        self.conn.execute(
            r#"
            INSERT INTO blobs (key, value) VALUES (?1, ?2)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
            "#,
            params![key, value],
        )?;
        Ok(())
    }
}
