//! Persisted state cells.
//!
//! A [`PersistedCell`] is a locally reactive value bound to one store key.
//! Three background tasks keep it in sync, all owned by the window's
//! [`SyncController`](crate::SyncController):
//!
//! - the load task fills the cell from the store once ([`load`]);
//! - the watcher and persister tasks write local changes back and announce
//!   them to other windows ([`local`]);
//! - the listener task reloads the cell when another window announces a
//!   change to its key ([`remote`]).

pub(crate) mod load;
pub(crate) mod local;
pub(crate) mod remote;

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use settings_store::Store;
use tokio::sync::watch;

use crate::error::{Result, SyncError};
use crate::hooks::CellOptions;
use crate::phase::{Phase, PhaseCell};
use crate::reactive::{FlushSignal, Observable, ValueWatch};
use crate::window::WindowId;

/// Types that can live in a [`PersistedCell`].
pub trait CellValue: Clone + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static {}

impl<T> CellValue for T where T: Clone + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static {}

/// Count of accepted-but-unfinished work items (queued persists and remote
/// notifications waiting for their reload).
#[derive(Debug, Clone)]
pub(crate) struct Pending {
    sender: Arc<watch::Sender<usize>>,
}

impl Pending {
    pub(crate) fn new() -> Self {
        let (sender, _) = watch::channel(0);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub(crate) fn add(&self, count: usize) {
        self.sender.send_modify(|pending| *pending += count);
    }

    pub(crate) fn done(&self, count: usize) {
        self.sender
            .send_modify(|pending| *pending = pending.saturating_sub(count));
    }

    pub(crate) fn count(&self) -> usize {
        *self.sender.borrow()
    }

    pub(crate) async fn settled(&self) {
        let mut receiver = self.sender.subscribe();
        let _ = receiver.wait_for(|pending| *pending == 0).await;
    }
}

/// State shared between a cell's handles and its background tasks.
pub(crate) struct CellShared<T> {
    pub(crate) key: String,
    pub(crate) window: WindowId,
    pub(crate) value: Observable<T>,
    pub(crate) phase: PhaseCell,
    pub(crate) flush: FlushSignal,
    pub(crate) pending: Pending,
    pub(crate) options: CellOptions<T>,
}

impl<T: CellValue> CellShared<T> {
    /// Read `key` from the store and turn it into a logical value.
    ///
    /// `Ok(None)` means the key has never been stored.
    pub(crate) async fn fetch(&self, store: &dyn Store) -> Result<Option<T>> {
        let Some(stored) = store.get(&self.key).await? else {
            return Ok(None);
        };

        let stored: T = serde_json::from_value(stored).map_err(|source| SyncError::Decode {
            key: self.key.clone(),
            source,
        })?;

        self.options
            .decode(stored)
            .map(Some)
            .map_err(|source| SyncError::Codec {
                key: self.key.clone(),
                stage: "decode",
                source,
            })
    }

    /// Turn a logical value into its stored form.
    pub(crate) fn encode(&self, value: &T) -> Result<serde_json::Value> {
        let encoded = self
            .options
            .encode(value)
            .map_err(|source| SyncError::Codec {
                key: self.key.clone(),
                stage: "encode",
                source,
            })?;

        serde_json::to_value(&encoded).map_err(|source| SyncError::Encode {
            key: self.key.clone(),
            source,
        })
    }

    /// Wait until the watcher has seen the current version.
    pub(crate) async fn flush(&self) {
        self.flush.wait_for(self.value.version()).await;
    }
}

/// A value persisted under one key and kept in sync across windows.
///
/// Reads and writes are synchronous and purely local; persistence and
/// reconciliation happen on the controller's background tasks. Cloning
/// yields another handle to the same cell.
///
/// Once the owning controller is dropped the cell keeps working as a plain
/// local value.
pub struct PersistedCell<T> {
    shared: Arc<CellShared<T>>,
}

impl<T> Clone for PersistedCell<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> fmt::Debug for PersistedCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PersistedCell")
            .field("key", &self.shared.key)
            .field("window", &self.shared.window)
            .field("phase", &self.shared.phase.get())
            .finish_non_exhaustive()
    }
}

impl<T: CellValue> PersistedCell<T> {
    pub(crate) fn from_shared(shared: Arc<CellShared<T>>) -> Self {
        Self { shared }
    }

    pub fn key(&self) -> &str {
        &self.shared.key
    }

    /// Window that owns this cell.
    pub fn window_id(&self) -> &WindowId {
        &self.shared.window
    }

    /// Clone of the current value.
    pub fn get(&self) -> T {
        self.shared.value.get()
    }

    /// Borrow the current value for the duration of `f`.
    ///
    /// Do not write to this cell from inside `f`.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.shared.value.with(f)
    }

    /// Replace the value. Returns `true` if it changed.
    ///
    /// A changed value is persisted and announced once the cell is
    /// [ready](Self::ready) and not reconciling a remote change.
    pub fn set(&self, value: T) -> bool {
        self.shared.value.set(value)
    }

    /// Mutate the value in place. Returns `true` if it changed.
    pub fn update(&self, f: impl FnOnce(&mut T)) -> bool {
        self.shared.value.update(f)
    }

    /// Subscribe to changes, local and remote alike.
    pub fn watch(&self) -> ValueWatch<T> {
        self.shared.value.watch()
    }

    pub fn phase(&self) -> Phase {
        self.shared.phase.get()
    }

    /// The initial load has settled (found, absent, or failed).
    pub fn is_initialized(&self) -> bool {
        self.phase().is_initialized()
    }

    /// A remote change is being applied.
    pub fn is_syncing(&self) -> bool {
        self.phase().is_syncing()
    }

    /// Wait until the initial load has settled.
    ///
    /// Returns early if the controller is dropped first.
    pub async fn ready(&self) {
        let shared = &self.shared;
        tokio::select! {
            () = shared.phase.initialized() => {}
            () = shared.flush.closed() => {}
        }
    }

    /// Wait until the cell has no outstanding work: loaded, every local
    /// change observed and persisted, and every accepted remote notification
    /// reconciled.
    ///
    /// Returns early if the controller is dropped first.
    pub async fn idle(&self) {
        let shared = &self.shared;
        let settled = async {
            shared.phase.initialized().await;
            loop {
                shared.flush().await;
                shared.pending.settled().await;

                if shared.flush.is_closed()
                    || (shared.flush.observed() >= shared.value.version()
                        && shared.pending.count() == 0)
                {
                    break;
                }
            }
        };

        tokio::select! {
            () = settled => {}
            () = shared.flush.closed() => {}
        }
    }
}
