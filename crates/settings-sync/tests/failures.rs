//! Store and codec failures.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use settings_channel::{ChangeChannel, ChangeEvent, ChannelHub};
use settings_store::MemoryStore;
use settings_sync::{
    CellOptions, CodecError, FnCodec, Phase, SaveFailurePolicy, SyncConfig, SyncController,
};

async fn settle() {
    tokio::time::sleep(Duration::from_secs(1)).await;
}

fn window(label: &str, store: &Arc<MemoryStore>, hub: &ChannelHub) -> SyncController {
    SyncController::new(label, store.clone(), Arc::new(hub.endpoint()))
}

fn retrying(label: &str, store: &Arc<MemoryStore>, hub: &ChannelHub) -> SyncController {
    let config = SyncConfig::default().with_save_failure(SaveFailurePolicy::Retry {
        max_attempts: 3,
        backoff_ms: 50,
    });
    SyncController::with_config(label, store.clone(), Arc::new(hub.endpoint()), config)
}

#[tokio::test(start_paused = true)]
async fn failed_load_keeps_default_and_becomes_ready() {
    let store = Arc::new(MemoryStore::new());
    store.insert("theme", json!("light"));
    store.fail_gets(true);
    let hub = ChannelHub::new();
    let main = window("main", &store, &hub);

    let theme = main.persisted("theme", "dark".to_string());
    theme.ready().await;
    assert_eq!(theme.get(), "dark");
    assert_eq!(theme.phase(), Phase::Ready);

    store.fail_gets(false);
    theme.set("solarized".to_string());
    theme.idle().await;
    assert_eq!(store.peek("theme"), Some(json!("solarized")));
}

#[tokio::test(start_paused = true)]
async fn failed_save_keeps_local_value_and_stays_silent() {
    let store = Arc::new(MemoryStore::new());
    store.fail_sets(true);
    let hub = ChannelHub::new();
    let mut spy = hub.endpoint().subscribe();
    let main = window("main", &store, &hub);
    let popup = window("popup", &store, &hub);

    let a = main.persisted("theme", "dark".to_string());
    let b = popup.persisted("theme", "dark".to_string());
    a.ready().await;
    b.ready().await;

    a.set("light".to_string());
    settle().await;

    assert_eq!(a.get(), "light");
    assert_eq!(store.peek("theme"), None);
    assert_eq!(store.set_count("theme"), 1);
    assert_eq!(b.get(), "dark");

    // No marker was written for the failed save
    hub.endpoint().write("marker", "x").unwrap();
    assert_eq!(spy.recv().await.map(|event| event.key), Some("marker".to_string()));
}

#[tokio::test(start_paused = true)]
async fn failed_save_does_not_block_later_saves() {
    let store = Arc::new(MemoryStore::new());
    store.fail_next_sets(1);
    let hub = ChannelHub::new();
    let main = window("main", &store, &hub);

    let count = main.persisted("count", 0);
    count.ready().await;

    count.set(1);
    count.idle().await;
    assert_eq!(store.peek("count"), None);

    count.set(2);
    count.idle().await;
    assert_eq!(store.peek("count"), Some(json!(2)));
}

#[tokio::test(start_paused = true)]
async fn retry_policy_recovers_from_transient_failures() {
    let store = Arc::new(MemoryStore::new());
    let hub = ChannelHub::new();
    let main = retrying("main", &store, &hub);
    let popup = window("popup", &store, &hub);

    let a = main.persisted("theme", "dark".to_string());
    let b = popup.persisted("theme", "dark".to_string());
    a.ready().await;
    b.ready().await;

    store.fail_next_sets(2);
    a.set("light".to_string());
    settle().await;

    assert_eq!(store.set_count("theme"), 3);
    assert_eq!(store.peek("theme"), Some(json!("light")));
    assert_eq!(b.get(), "light");
}

#[tokio::test(start_paused = true)]
async fn retry_policy_gives_up_after_max_attempts() {
    let store = Arc::new(MemoryStore::new());
    let hub = ChannelHub::new();
    let main = retrying("main", &store, &hub);

    let theme = main.persisted("theme", "dark".to_string());
    theme.ready().await;

    store.fail_next_sets(5);
    theme.set("light".to_string());
    theme.idle().await;

    assert_eq!(store.set_count("theme"), 3);
    assert_eq!(store.peek("theme"), None);
}

#[tokio::test(start_paused = true)]
async fn wrongly_shaped_value_is_ignored_on_load() {
    let store = Arc::new(MemoryStore::new());
    store.insert("fontSize", json!("large"));
    let hub = ChannelHub::new();
    let main = window("main", &store, &hub);

    let font_size = main.persisted("fontSize", 14u32);
    font_size.ready().await;

    assert_eq!(font_size.get(), 14);
    assert!(font_size.is_initialized());
}

#[tokio::test(start_paused = true)]
async fn undecodable_remote_value_is_ignored_per_key() {
    let store = Arc::new(MemoryStore::new());
    let hub = ChannelHub::new();
    let main = window("main", &store, &hub);
    let popup = window("popup", &store, &hub);

    let strict = || {
        CellOptions::<String>::new().with_codec(FnCodec::new(
            |value: &String| -> Result<String, CodecError> { Ok(format!("enc:{value}")) },
            |stored: String| -> Result<String, CodecError> {
                stored
                    .strip_prefix("enc:")
                    .map(str::to_string)
                    .ok_or_else(|| CodecError::new("value is not encrypted"))
            },
        ))
    };

    // Writer has no codec, so the reader cannot decode what it stores
    let a_key = main.persisted("apiKey", String::new());
    let b_key = popup.persisted_with("apiKey", "old".to_string(), strict());
    let a_theme = main.persisted("theme", "dark".to_string());
    let b_theme = popup.persisted("theme", "dark".to_string());
    for cell in [&a_key, &b_key, &a_theme, &b_theme] {
        cell.ready().await;
    }

    a_key.set("plain".to_string());
    a_theme.set("light".to_string());
    settle().await;

    assert_eq!(b_key.get(), "old");
    assert_eq!(b_key.phase(), Phase::Ready);
    assert_eq!(b_theme.get(), "light");
}

#[tokio::test(start_paused = true)]
async fn failed_encode_is_not_persisted() {
    let store = Arc::new(MemoryStore::new());
    let hub = ChannelHub::new();
    let mut spy = hub.endpoint().subscribe();
    let main = window("main", &store, &hub);

    let options = CellOptions::<String>::new().with_codec(FnCodec::new(
        |value: &String| -> Result<String, CodecError> {
            if value.is_empty() {
                Err(CodecError::new("refusing to encrypt an empty key"))
            } else {
                Ok(value.clone())
            }
        },
        |stored: String| -> Result<String, CodecError> { Ok(stored) },
    ));
    let api_key = main.persisted_with("apiKey", "sk-1".to_string(), options);
    api_key.ready().await;

    api_key.set(String::new());
    api_key.idle().await;
    assert_eq!(store.set_count("apiKey"), 0);

    api_key.set("sk-2".to_string());
    api_key.idle().await;
    assert_eq!(store.peek("apiKey"), Some(json!("sk-2")));
    assert_eq!(spy.recv().await, Some(ChangeEvent::written("apiKey", None, "main")));
}
