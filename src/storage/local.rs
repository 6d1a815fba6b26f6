//! SQLite-backed local record store
//!
//! The database lives at `{state_dir}/portal.db` and is the fallback (and
//! mirror target) for the remote record service: one `records` table holding
//! JSON payloads keyed by `(collection, owner_id)`. WAL mode keeps reads
//! cheap while a write is in flight.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};

use super::{BackendKind, StorageBackend, StorageError};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS records (
    collection TEXT NOT NULL,
    owner_id   TEXT NOT NULL,
    payload    TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (collection, owner_id)
);
";

pub struct LocalStore {
    conn: Mutex<Connection>,
}

impl LocalStore {
    /// Open (or create) the store at `{state_dir}/portal.db`.
    pub fn open(state_dir: &Path) -> Result<Self, StorageError> {
        Self::open_at(state_dir.join("portal.db"))
    }

    /// Open a store at an explicit path. Useful for testing.
    pub fn open_at(path: PathBuf) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(&path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

#[async_trait]
impl StorageBackend for LocalStore {
    fn kind(&self) -> BackendKind {
        BackendKind::Local
    }

    async fn get(&self, collection: &str, owner: &str) -> Result<Option<String>, StorageError> {
        let conn = self.conn.lock();
        let payload = conn
            .query_row(
                "SELECT payload FROM records WHERE collection = ?1 AND owner_id = ?2",
                params![collection, owner],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(payload)
    }

    async fn put(
        &self,
        collection: &str,
        owner: &str,
        payload: &str,
    ) -> Result<(), StorageError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO records (collection, owner_id, payload, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (collection, owner_id)
             DO UPDATE SET payload = excluded.payload, updated_at = excluded.updated_at",
            params![collection, owner, payload, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    async fn delete(&self, collection: &str, owner: &str) -> Result<(), StorageError> {
        let conn = self.conn.lock();
        conn.execute(
            "DELETE FROM records WHERE collection = ?1 AND owner_id = ?2",
            params![collection, owner],
        )?;
        Ok(())
    }

    async fn clear_owner(&self, owner: &str) -> Result<(), StorageError> {
        let conn = self.conn.lock();
        conn.execute("DELETE FROM records WHERE owner_id = ?1", params![owner])?;
        Ok(())
    }

    async fn clear_all(&self) -> Result<(), StorageError> {
        let conn = self.conn.lock();
        conn.execute("DELETE FROM records", [])?;
        Ok(())
    }
}
