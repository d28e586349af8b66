//! Backing store for synchronized application settings.
//!
//! This crate provides the durable, application-wide key-value layer that
//! every window reads from and writes to. Values are stored as
//! [`serde_json::Value`]; typed conversion happens in the caller.
//!
//! # Features
//!
//! - **Async `get`/`set`** behind the [`Store`] trait, so windows never block
//!   on disk I/O
//! - **Lazy file store** that loads `.settings.dat` on first access
//! - **Atomic writes** (temp file + rename) to prevent corruption
//! - **In-memory store** with call counters and fault injection for tests
//!
//! # Consistency
//!
//! Each call is independent and atomic from the caller's point of view.
//! Concurrent writers to the same key resolve as last-write-wins; there are
//! no transactions and no versioning.
//!
//! # Example
//!
//! ```ignore
//! use settings_store::{FileStore, Store};
//!
//! let store = FileStore::new("/path/to/.settings.dat");
//! store.set("theme", serde_json::json!("dark")).await?;
//! assert_eq!(store.get("theme").await?, Some(serde_json::json!("dark")));
//! ```

mod error;
mod file;
mod memory;

use async_trait::async_trait;
use serde_json::Value;

pub use error::{Result, StoreError};
pub use file::{DEFAULT_FILE_NAME, FileStore};
pub use memory::MemoryStore;

/// Async key-value persistence shared by all windows of an application.
///
/// Implementations must be durable across process restarts (except test
/// doubles) and shared by key identity across every window that holds them.
#[async_trait]
pub trait Store: Send + Sync {
    /// Read the value stored under `key`, or `None` if it was never written.
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Store `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: Value) -> Result<()>;
}
