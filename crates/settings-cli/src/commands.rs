//! Command implementations.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde_json::{Map, Value};
use tracing::{debug, info};

use settings_channel::ChannelHub;
use settings_store::{DEFAULT_FILE_NAME, FileStore, MemoryStore, Store};
use settings_sync::{Phase, SyncConfig, SyncController, WindowId};

/// Label the tool uses when it acts as a window.
pub const CLI_WINDOW: &str = "cli";

/// Shared key every demo window writes to.
pub const DEMO_KEY: &str = "counter";

/// Default store location: `<config dir>/.settings.dat`.
pub fn default_store_path() -> PathBuf {
    directories::ProjectDirs::from("dev", "SettingsSync", "settings-sync")
        .map(|dirs| dirs.config_dir().join(DEFAULT_FILE_NAME))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_FILE_NAME))
}

/// Load the sync config, falling back to defaults when no path is given.
pub fn load_config(path: Option<&Path>) -> Result<SyncConfig> {
    match path {
        Some(path) => SyncConfig::load_from(path)
            .with_context(|| format!("load sync config from {}", path.display())),
        None => Ok(SyncConfig::default()),
    }
}

pub async fn run_get(store: &FileStore, key: &str) -> Result<Option<Value>> {
    store
        .get(key)
        .await
        .with_context(|| format!("read \"{key}\" from {}", store.path().display()))
}

pub async fn run_list(store: &FileStore) -> Result<Map<String, Value>> {
    store
        .entries()
        .await
        .with_context(|| format!("read {}", store.path().display()))
}

/// Result of `set`.
#[derive(Debug, Clone, PartialEq)]
pub struct SetOutcome {
    pub key: String,
    pub previous: Option<Value>,
    pub value: Value,
    pub changed: bool,
}

/// Write `raw` (a JSON document) under `key` through the sync protocol, as a
/// window named [`CLI_WINDOW`] would.
pub async fn run_set(
    store: &Arc<FileStore>,
    key: &str,
    raw: &str,
    config: SyncConfig,
) -> Result<SetOutcome> {
    if key.is_empty() {
        bail!("key must not be empty");
    }
    let value: Value =
        serde_json::from_str(raw).with_context(|| format!("parse value for \"{key}\" as JSON"))?;

    let previous = store
        .get(key)
        .await
        .with_context(|| format!("read \"{key}\" from {}", store.path().display()))?;

    let changed = previous.as_ref() != Some(&value);
    if changed {
        let hub = ChannelHub::new();
        let controller = SyncController::with_config(
            CLI_WINDOW,
            Arc::clone(store) as Arc<dyn Store>,
            Arc::new(hub.endpoint()),
            config,
        );
        // `None` stands for an absent key, so storing `null` is still a change
        let cell = controller.persisted(key, None::<Value>);
        cell.ready().await;
        cell.set(Some(value.clone()));
        cell.idle().await;

        let stored = store.get(key).await?;
        if stored.as_ref() != Some(&value) {
            bail!("\"{key}\" was not saved to {}", store.path().display());
        }
        info!("Set \"{}\" in {}", key, store.path().display());
    }

    Ok(SetOutcome {
        key: key.to_string(),
        previous,
        value,
        changed,
    })
}

/// Options for `demo`.
#[derive(Debug, Clone)]
pub struct DemoOptions {
    pub windows: usize,
    pub writes: usize,
    /// Pause between consecutive writes.
    pub interval: Duration,
    pub config: SyncConfig,
}

/// One window's state after the demo.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowReport {
    pub window: WindowId,
    pub value: u64,
    pub phase: Phase,
    pub writes: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DemoReport {
    pub windows: Vec<WindowReport>,
    pub expected: u64,
    pub store_sets: usize,
    pub store_gets: usize,
}

impl DemoReport {
    /// Every window ended on the last written value.
    pub fn converged(&self) -> bool {
        self.windows.iter().all(|window| window.value == self.expected)
    }
}

/// Run `windows` in-process windows over one in-memory store and hub.
///
/// Window `i % windows` performs write number `i`, so ownership of the
/// latest value keeps moving between windows.
pub async fn run_demo(options: &DemoOptions) -> Result<DemoReport> {
    if options.windows == 0 {
        bail!("demo needs at least one window");
    }

    let store = Arc::new(MemoryStore::new());
    let hub = ChannelHub::new();

    let controllers: Vec<SyncController> = (0..options.windows)
        .map(|index| {
            let label = if index == 0 {
                WindowId::main()
            } else {
                WindowId::new(format!("window-{index}"))
            };
            SyncController::with_config(
                label,
                Arc::clone(&store) as Arc<dyn Store>,
                Arc::new(hub.endpoint()),
                options.config.clone(),
            )
        })
        .collect();
    let cells: Vec<_> = controllers
        .iter()
        .map(|controller| controller.persisted(DEMO_KEY, 0u64))
        .collect();
    for cell in &cells {
        cell.ready().await;
    }

    let mut writes = vec![0usize; cells.len()];
    for write in 1..=options.writes {
        let index = write % cells.len();
        debug!("Window {} writes {}", cells[index].window_id(), write);
        cells[index].set(write as u64);
        writes[index] += 1;
        tokio::time::sleep(options.interval).await;
    }

    // Let the last announcement pass every debounce window, then drain
    tokio::time::sleep(options.config.debounce() * 3).await;
    for cell in &cells {
        cell.idle().await;
    }

    let windows = cells
        .iter()
        .zip(writes)
        .map(|(cell, writes)| WindowReport {
            window: cell.window_id().clone(),
            value: cell.get(),
            phase: cell.phase(),
            writes,
        })
        .collect();

    Ok(DemoReport {
        windows,
        expected: options.writes as u64,
        store_sets: store.total_sets(),
        store_gets: store.get_count(DEMO_KEY),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_set_then_get() {
        let dir = tempdir().unwrap();
        let store = Arc::new(FileStore::in_dir(dir.path()));

        let outcome = run_set(&store, "theme", "\"light\"", SyncConfig::default())
            .await
            .unwrap();
        assert!(outcome.changed);
        assert_eq!(outcome.previous, None);

        let reopened = FileStore::in_dir(dir.path());
        assert_eq!(run_get(&reopened, "theme").await.unwrap(), Some(json!("light")));
    }

    #[tokio::test]
    async fn test_set_same_value_is_unchanged() {
        let dir = tempdir().unwrap();
        let store = Arc::new(FileStore::in_dir(dir.path()));
        run_set(&store, "count", "5", SyncConfig::default())
            .await
            .unwrap();

        let outcome = run_set(&store, "count", "5", SyncConfig::default())
            .await
            .unwrap();
        assert!(!outcome.changed);
        assert_eq!(outcome.previous, Some(json!(5)));
    }

    #[tokio::test]
    async fn test_set_null_on_missing_key_is_stored() {
        let dir = tempdir().unwrap();
        let store = Arc::new(FileStore::in_dir(dir.path()));

        let outcome = run_set(&store, "k", "null", SyncConfig::default())
            .await
            .unwrap();
        assert!(outcome.changed);
        assert_eq!(outcome.previous, None);

        let reopened = FileStore::in_dir(dir.path());
        assert_eq!(run_get(&reopened, "k").await.unwrap(), Some(Value::Null));

        let again = run_set(&store, "k", "null", SyncConfig::default())
            .await
            .unwrap();
        assert!(!again.changed);
        assert_eq!(again.previous, Some(Value::Null));
    }

    #[tokio::test]
    async fn test_set_rejects_invalid_json() {
        let dir = tempdir().unwrap();
        let store = Arc::new(FileStore::in_dir(dir.path()));

        let error = run_set(&store, "theme", "light", SyncConfig::default())
            .await
            .unwrap_err();
        assert!(error.to_string().contains("parse value"));
    }

    #[test]
    fn test_missing_config_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let config = load_config(Some(&dir.path().join("sync.toml"))).unwrap();
        assert_eq!(config, SyncConfig::default());
    }

    #[test]
    fn test_default_store_file_name() {
        assert!(default_store_path().ends_with(DEFAULT_FILE_NAME));
    }
}
