//! Initial load.

use std::sync::Arc;

use settings_store::Store;

use super::{CellShared, CellValue};

/// Fill the cell from the store, then open the local write path.
///
/// The phase flips to `Ready` whatever the outcome, but only after the
/// watcher has observed the loaded value, so the load itself is never
/// persisted back or announced.
pub(crate) async fn run<T: CellValue>(shared: Arc<CellShared<T>>, store: Arc<dyn Store>) {
    match shared.fetch(store.as_ref()).await {
        Ok(Some(value)) => {
            shared.value.set(value.clone());
            shared.options.fire_load(&value);
            shared.options.fire_change(&value);
            tracing::debug!(
                "[{}] Loaded key \"{}\" from store.",
                shared.window,
                shared.key
            );
        }
        Ok(None) => {
            tracing::debug!(
                "[{}] No stored value for key \"{}\", keeping default.",
                shared.window,
                shared.key
            );
        }
        Err(e) => {
            tracing::warn!(
                "[{}] Failed to load key \"{}\", keeping current value: {}",
                shared.window,
                shared.key,
                e
            );
        }
    }

    shared.flush().await;
    shared.phase.finish_loading();
}
