//! Local write path: observe local changes, persist them, announce them.
//!
//! Two tasks per cell. The watcher wakes on every committed change, checks
//! the phase, and queues a snapshot; it then marks the version as observed
//! so the load and reconcile paths can lift their guard. The persister
//! drains the queue in order, so one window's writes reach the store in
//! mutation order and a slow store never delays a flush.

use std::sync::Arc;

use settings_channel::{ChangeChannel, ChannelError};
use settings_store::Store;
use tokio::sync::mpsc;

use super::{CellShared, CellValue};
use crate::config::SaveFailurePolicy;
use crate::error::Result;
use crate::reactive::{FlushMarker, ValueWatch};

/// Snapshot waiting to be persisted.
pub(crate) struct PersistJob<T> {
    pub(crate) snapshot: T,
}

/// Watch local changes and queue the ones made while the cell is `Ready`.
pub(crate) async fn watch_changes<T: CellValue>(
    shared: Arc<CellShared<T>>,
    mut changes: ValueWatch<T>,
    marker: FlushMarker,
    jobs: mpsc::UnboundedSender<PersistJob<T>>,
) {
    while let Some(state) = changes.next_versioned().await {
        let phase = shared.phase.get();
        if phase.accepts_local_writes() {
            shared.pending.add(1);
            if jobs.send(PersistJob { snapshot: state.value }).is_err() {
                shared.pending.done(1);
            }
        } else {
            tracing::debug!(
                "[{}] Skipping persist of key \"{}\" while {:?}",
                shared.window,
                shared.key,
                phase
            );
        }
        marker.mark(state.version);
    }
}

/// Everything the persister needs besides the cell itself.
pub(crate) struct Persister {
    pub(crate) store: Arc<dyn Store>,
    pub(crate) channel: Arc<dyn ChangeChannel>,
    pub(crate) policy: SaveFailurePolicy,
}

impl Persister {
    /// Drain the job queue until the watcher goes away.
    pub(crate) async fn run<T: CellValue>(
        self,
        shared: Arc<CellShared<T>>,
        mut jobs: mpsc::UnboundedReceiver<PersistJob<T>>,
    ) {
        while let Some(job) = jobs.recv().await {
            match self.persist(&shared, &job.snapshot).await {
                Ok(()) => {
                    shared.options.fire_change(&job.snapshot);
                    match announce(self.channel.as_ref(), &shared.key, shared.window.as_str()) {
                        Ok(()) => tracing::info!(
                            "[{}] Persisted key \"{}\" to store.",
                            shared.window,
                            shared.key
                        ),
                        Err(e) => tracing::warn!(
                            "[{}] Persisted key \"{}\" but could not notify other windows: {}",
                            shared.window,
                            shared.key,
                            e
                        ),
                    }
                }
                Err(e) => tracing::warn!(
                    "[{}] Failed to persist key \"{}\", change kept locally only: {}",
                    shared.window,
                    shared.key,
                    e
                ),
            }
            shared.pending.done(1);
        }
    }

    async fn persist<T: CellValue>(&self, shared: &CellShared<T>, snapshot: &T) -> Result<()> {
        let stored = shared.encode(snapshot)?;
        let attempts = self.policy.attempts();

        let mut attempt = 1;
        loop {
            match self.store.set(&shared.key, stored.clone()).await {
                Ok(()) => return Ok(()),
                Err(e) if attempt < attempts => {
                    let delay = self.policy.backoff(attempt);
                    tracing::debug!(
                        "[{}] Persist of key \"{}\" failed (attempt {}/{}), retrying in {:?}: {}",
                        shared.window,
                        shared.key,
                        attempt,
                        attempts,
                        delay,
                        e
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

/// Tell other windows that `key` changed: write the marker, then clear it
/// so the next announcement is a fresh change.
pub(crate) fn announce(
    channel: &dyn ChangeChannel,
    key: &str,
    window: &str,
) -> std::result::Result<(), ChannelError> {
    channel.write(key, window)?;
    channel.clear(key)
}
