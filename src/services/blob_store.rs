use std::collections::HashMap;
use std::sync::Mutex;

use crate::db::repositories::key_value_repository::{KeyValueRepository, KvTable};
use crate::db::DbPool;
use crate::error::{AppError, AppResult};

/// Named string blobs, the local-storage equivalent for client state.
pub trait BlobStore: Send + Sync {
    fn get(&self, key: &str) -> AppResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> AppResult<()>;
    fn remove(&self, key: &str) -> AppResult<()>;
}

/// Blob store backed by the `kv_store` table.
#[derive(Clone)]
pub struct SqliteBlobStore {
    db: DbPool,
}

impl SqliteBlobStore {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }
}

impl BlobStore for SqliteBlobStore {
    fn get(&self, key: &str) -> AppResult<Option<String>> {
        self.db
            .with_connection(|conn| KeyValueRepository::get(conn, KvTable::Storage, key))
            .map(|row| row.map(|row| row.value))
            .map_err(|err| AppError::persistence(format!("failed to read '{key}': {err}")))
    }

    fn set(&self, key: &str, value: &str) -> AppResult<()> {
        self.db
            .with_connection(|conn| KeyValueRepository::upsert(conn, KvTable::Storage, key, value))
            .map_err(|err| AppError::persistence(format!("failed to write '{key}': {err}")))
    }

    fn remove(&self, key: &str) -> AppResult<()> {
        self.db
            .with_connection(|conn| KeyValueRepository::delete(conn, KvTable::Storage, key))
            .map(|_| ())
            .map_err(|err| AppError::persistence(format!("failed to remove '{key}': {err}")))
    }
}

/// Process-local blob store, used for ephemeral sessions and tests.
#[derive(Default)]
pub struct MemoryBlobStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(key: &str, value: &str) -> Self {
        let mut entries = HashMap::new();
        entries.insert(key.to_string(), value.to_string());
        Self {
            entries: Mutex::new(entries),
        }
    }
}

impl BlobStore for MemoryBlobStore {
    fn get(&self, key: &str) -> AppResult<Option<String>> {
        let guard = self
            .entries
            .lock()
            .map_err(|_| AppError::persistence("memory store lock poisoned"))?;
        Ok(guard.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> AppResult<()> {
        let mut guard = self
            .entries
            .lock()
            .map_err(|_| AppError::persistence("memory store lock poisoned"))?;
        guard.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> AppResult<()> {
        let mut guard = self
            .entries
            .lock()
            .map_err(|_| AppError::persistence("memory store lock poisoned"))?;
        guard.remove(key);
        Ok(())
    }
}
