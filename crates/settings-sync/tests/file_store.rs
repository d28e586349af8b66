//! Cells backed by the on-disk store.

use std::sync::Arc;

use serde_json::json;
use settings_channel::ChannelHub;
use settings_store::{FileStore, Store};
use settings_sync::SyncController;
use tempfile::tempdir;

#[tokio::test]
async fn value_survives_restart() {
    let dir = tempdir().unwrap();
    let hub = ChannelHub::new();

    {
        let store = Arc::new(FileStore::in_dir(dir.path()));
        let main = SyncController::new("main", store, Arc::new(hub.endpoint()));
        let theme = main.persisted("theme", "dark".to_string());
        theme.ready().await;
        theme.set("light".to_string());
        theme.idle().await;
    }

    let store = Arc::new(FileStore::in_dir(dir.path()));
    assert_eq!(store.get("theme").await.unwrap(), Some(json!("light")));

    let main = SyncController::new("main", store, Arc::new(hub.endpoint()));
    let theme = main.persisted("theme", "dark".to_string());
    theme.ready().await;
    assert_eq!(theme.get(), "light");
}

#[tokio::test]
async fn windows_share_one_file() {
    let dir = tempdir().unwrap();
    let store = Arc::new(FileStore::in_dir(dir.path()));
    let hub = ChannelHub::new();
    let main = SyncController::new("main", store.clone(), Arc::new(hub.endpoint()));

    let theme = main.persisted("theme", "dark".to_string());
    let apps = main.persisted("apps", Vec::<String>::new());
    theme.ready().await;
    apps.ready().await;

    theme.set("light".to_string());
    apps.set(vec!["calc".to_string()]);
    theme.idle().await;
    apps.idle().await;

    let entries = store.entries().await.unwrap();
    assert_eq!(entries.get("theme"), Some(&json!("light")));
    assert_eq!(entries.get("apps"), Some(&json!(["calc"])));
}
