//! File-backed lazy store.
//!
//! The whole store is one JSON object on disk. It is read on first access,
//! cached in memory, and rewritten atomically on every `set`.

mod load;
mod save;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::{Mutex, MutexGuard};

use crate::Store;
use crate::error::Result;

/// Default settings file name, relative to the application config directory.
pub const DEFAULT_FILE_NAME: &str = ".settings.dat";

/// Durable store backed by a single JSON file.
///
/// Share one instance (behind an `Arc`) between every window of the
/// application; the internal lock serializes file writes so the file always
/// reflects the last `set` that returned `Ok`.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    /// `None` until the file has been read.
    cache: Mutex<Option<Map<String, Value>>>,
}

impl FileStore {
    /// Create a store for `path`. Nothing is read until the first access.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: Mutex::new(None),
        }
    }

    /// Create a store for [`DEFAULT_FILE_NAME`] inside `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join(DEFAULT_FILE_NAME))
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Snapshot of every stored entry.
    pub async fn entries(&self) -> Result<Map<String, Value>> {
        let guard = self.loaded().await?;
        Ok(guard.clone().unwrap_or_default())
    }

    /// Remove `key`, returning the previous value.
    pub async fn remove(&self, key: &str) -> Result<Option<Value>> {
        let mut guard = self.loaded().await?;
        let entries = guard.get_or_insert_with(Map::new);
        let Some(previous) = entries.remove(key) else {
            return Ok(None);
        };

        let written = match save::serialize_entries(entries) {
            Ok(bytes) => save::write_atomic_async(bytes, self.path.clone()).await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            entries.insert(key.to_string(), previous);
            return Err(e);
        }
        Ok(Some(previous))
    }

    /// Drop the in-memory cache so the next access re-reads the file.
    pub async fn reload(&self) {
        *self.cache.lock().await = None;
    }

    /// Lock the cache, reading the file first if this is the first access.
    async fn loaded(&self) -> Result<MutexGuard<'_, Option<Map<String, Value>>>> {
        let mut guard = self.cache.lock().await;
        if guard.is_none() {
            let entries = load::load_entries_async(self.path.clone()).await?;
            tracing::debug!(path = %self.path.display(), "Settings store loaded");
            *guard = Some(entries);
        }
        Ok(guard)
    }
}

#[async_trait]
impl Store for FileStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let guard = self.loaded().await?;
        Ok(guard.as_ref().and_then(|entries| entries.get(key).cloned()))
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        let mut guard = self.loaded().await?;
        let entries = guard.get_or_insert_with(Map::new);
        let previous = entries.insert(key.to_string(), value);

        let written = match save::serialize_entries(entries) {
            Ok(bytes) => save::write_atomic_async(bytes, self.path.clone()).await,
            Err(e) => Err(e),
        };

        // Keep the cache in line with the file when the write fails.
        if written.is_err() {
            match previous {
                Some(previous) => entries.insert(key.to_string(), previous),
                None => entries.remove(key),
            };
        }
        written
    }
}
