//! In-memory store.
//!
//! Not durable. Shares values between every holder of the same instance,
//! which is all the synchronization protocol needs, and records call counts
//! and injects failures so tests can observe how often windows hit the store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::Store;
use crate::error::{Result, StoreError};

/// Process-local store with instrumentation.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Value>>,
    gets: Mutex<HashMap<String, usize>>,
    sets: Mutex<HashMap<String, usize>>,
    fail_gets: AtomicBool,
    fail_sets: AtomicBool,
    /// Number of upcoming `set` calls that fail before sets succeed again.
    failing_sets_left: AtomicUsize,
    latency: Mutex<Option<Duration>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a value without going through (or counting) the async API.
    pub fn insert(&self, key: impl Into<String>, value: Value) {
        lock(&self.entries).insert(key.into(), value);
    }

    /// Read a value without going through (or counting) the async API.
    pub fn peek(&self, key: &str) -> Option<Value> {
        lock(&self.entries).get(key).cloned()
    }

    /// Number of `get` calls made for `key`.
    pub fn get_count(&self, key: &str) -> usize {
        lock(&self.gets).get(key).copied().unwrap_or(0)
    }

    /// Number of `set` calls made for `key`, including failed ones.
    pub fn set_count(&self, key: &str) -> usize {
        lock(&self.sets).get(key).copied().unwrap_or(0)
    }

    /// Total `set` calls across all keys.
    pub fn total_sets(&self) -> usize {
        lock(&self.sets).values().sum()
    }

    /// Make every `get` fail until turned off again.
    pub fn fail_gets(&self, fail: bool) {
        self.fail_gets.store(fail, Ordering::SeqCst);
    }

    /// Make every `set` fail until turned off again.
    pub fn fail_sets(&self, fail: bool) {
        self.fail_sets.store(fail, Ordering::SeqCst);
    }

    /// Make the next `count` calls to `set` fail.
    pub fn fail_next_sets(&self, count: usize) {
        self.failing_sets_left.store(count, Ordering::SeqCst);
    }

    /// Delay every call by `latency` (uses the tokio clock, so paused-time
    /// tests stay deterministic).
    pub fn set_latency(&self, latency: Option<Duration>) {
        *lock(&self.latency) = latency;
    }

    async fn delay(&self) {
        let latency = *lock(&self.latency);
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn take_set_failure(&self) -> bool {
        if self.fail_sets.load(Ordering::SeqCst) {
            return true;
        }
        self.failing_sets_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        *lock(&self.gets).entry(key.to_string()).or_default() += 1;
        self.delay().await;

        if self.fail_gets.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable {
                reason: format!("get of \"{key}\" rejected"),
            });
        }
        Ok(self.peek(key))
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        *lock(&self.sets).entry(key.to_string()).or_default() += 1;
        self.delay().await;

        if self.take_set_failure() {
            return Err(StoreError::Unavailable {
                reason: format!("set of \"{key}\" rejected"),
            });
        }
        self.insert(key, value);
        Ok(())
    }
}

/// The maps hold no cross-entry invariants, so a poisoned lock is still usable.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_get_absent() {
        let store = MemoryStore::new();
        assert_eq!(store.get("count").await.unwrap(), None);
        assert_eq!(store.get_count("count"), 1);
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let store = MemoryStore::new();
        store.set("count", json!(5)).await.unwrap();

        assert_eq!(store.get("count").await.unwrap(), Some(json!(5)));
        assert_eq!(store.set_count("count"), 1);
        assert_eq!(store.total_sets(), 1);
    }

    #[tokio::test]
    async fn test_insert_and_peek_are_not_counted() {
        let store = MemoryStore::new();
        store.insert("theme", json!("dark"));

        assert_eq!(store.peek("theme"), Some(json!("dark")));
        assert_eq!(store.get_count("theme"), 0);
        assert_eq!(store.set_count("theme"), 0);
    }

    #[tokio::test]
    async fn test_fail_gets() {
        let store = MemoryStore::new();
        store.insert("theme", json!("dark"));
        store.fail_gets(true);

        assert!(matches!(
            store.get("theme").await,
            Err(StoreError::Unavailable { .. })
        ));

        store.fail_gets(false);
        assert_eq!(store.get("theme").await.unwrap(), Some(json!("dark")));
    }

    #[tokio::test]
    async fn test_fail_next_sets() {
        let store = MemoryStore::new();
        store.fail_next_sets(2);

        assert!(store.set("k", json!(1)).await.is_err());
        assert!(store.set("k", json!(2)).await.is_err());
        assert!(store.set("k", json!(3)).await.is_ok());

        assert_eq!(store.peek("k"), Some(json!(3)));
        assert_eq!(store.set_count("k"), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_latency_uses_tokio_clock() {
        let store = MemoryStore::new();
        store.set_latency(Some(Duration::from_millis(250)));

        let start = tokio::time::Instant::now();
        store.set("k", json!(true)).await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(250));
    }
}
