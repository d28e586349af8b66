//! Persisted reactive settings kept consistent across application windows.
//!
//! Every window of an application holds its own in-memory copy of each
//! setting. This crate keeps those copies consistent through a shared
//! durable [`Store`](settings_store::Store) and an asymmetric
//! [`ChangeChannel`](settings_channel::ChangeChannel):
//!
//! 1. A [`PersistedCell`] starts at its default and loads the stored value
//!    in the background.
//! 2. Once loaded, local changes are written to the store and announced on
//!    the channel.
//! 3. Other windows debounce the announcements, re-read the store, and
//!    apply the value without writing it back.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use settings_sync::settings_channel::ChannelHub;
//! use settings_sync::settings_store::MemoryStore;
//! use settings_sync::SyncController;
//!
//! # async fn demo() {
//! let store = Arc::new(MemoryStore::new());
//! let hub = ChannelHub::new();
//!
//! let main = SyncController::new("main", store.clone(), Arc::new(hub.endpoint()));
//! let popup = SyncController::new("popup", store, Arc::new(hub.endpoint()));
//!
//! let theme = main.persisted("theme", "dark".to_string());
//! let popup_theme = popup.persisted("theme", "dark".to_string());
//! theme.ready().await;
//! popup_theme.ready().await;
//!
//! theme.set("light".to_string());
//! // ...shortly after, popup_theme.get() == "light"
//! # }
//! ```

mod cell;
mod config;
mod controller;
mod debounce;
pub mod error;
pub mod hooks;
pub mod phase;
pub mod reactive;
mod window;

pub use cell::{CellValue, PersistedCell};
pub use config::{SaveFailurePolicy, SyncConfig};
pub use controller::SyncController;
pub use error::{Result, SyncError};
pub use hooks::{CellOptions, Codec, CodecError, FnCodec, VecCodec};
pub use phase::Phase;
pub use window::WindowId;

pub use settings_channel;
pub use settings_store;
