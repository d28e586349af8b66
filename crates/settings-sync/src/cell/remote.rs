//! Remote change path: react to other windows' announcements.

use std::sync::Arc;
use std::time::Duration;

use settings_channel::ChangeEvent;
use settings_store::Store;
use tokio::sync::mpsc;

use super::{CellShared, CellValue};
use crate::debounce::next_burst;
use crate::window::WindowId;

/// Decides which channel events concern one cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RemoteFilter {
    key: String,
    window: WindowId,
}

impl RemoteFilter {
    pub(crate) fn new(key: impl Into<String>, window: WindowId) -> Self {
        Self {
            key: key.into(),
            window,
        }
    }

    pub(crate) fn key(&self) -> &str {
        &self.key
    }

    /// Accept only fresh announcements of this key made by another window.
    ///
    /// Runs before debouncing, so clears and echoes of our own writes can
    /// never displace a pending real notification.
    pub(crate) fn accepts(&self, event: &ChangeEvent) -> bool {
        if event.key != self.key || event.is_clear() {
            return false;
        }
        event.new_value.as_deref() != Some(self.window.as_str())
    }
}

/// Reload the cell after each quiet burst of accepted notifications.
pub(crate) async fn listen<T: CellValue>(
    shared: Arc<CellShared<T>>,
    store: Arc<dyn Store>,
    mut events: mpsc::UnboundedReceiver<ChangeEvent>,
    quiet: Duration,
) {
    while let Some(burst) = next_burst(&mut events, quiet).await {
        if burst.coalesced > 1 {
            tracing::debug!(
                "[{}] Coalesced {} notifications for key \"{}\"",
                shared.window,
                burst.coalesced,
                shared.key
            );
        }

        if shared.phase.get().is_initialized() {
            reconcile(&shared, store.as_ref()).await;
        } else {
            tracing::debug!(
                "[{}] Ignoring change to key \"{}\" before initial load",
                shared.window,
                shared.key
            );
        }
        shared.pending.done(burst.coalesced);
    }
}

/// Apply the stored value with the local write path suppressed.
async fn reconcile<T: CellValue>(shared: &CellShared<T>, store: &dyn Store) {
    if !shared.phase.begin_reconcile() {
        return;
    }

    tracing::info!(
        "[{}] Detected external change for key \"{}\", reloading from store.",
        shared.window,
        shared.key
    );

    match shared.fetch(store).await {
        Ok(Some(value)) => {
            shared.value.set(value.clone());
            shared.options.fire_change(&value);
        }
        Ok(None) => {
            tracing::debug!(
                "[{}] Key \"{}\" is no longer stored, keeping current value.",
                shared.window,
                shared.key
            );
        }
        Err(e) => {
            tracing::warn!(
                "[{}] Failed to reload key \"{}\", keeping current value: {}",
                shared.window,
                shared.key,
                e
            );
        }
    }

    shared.flush().await;
    shared.phase.end_reconcile();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter() -> RemoteFilter {
        RemoteFilter::new("theme", WindowId::from("popup"))
    }

    #[test]
    fn test_accepts_other_window() {
        assert!(filter().accepts(&ChangeEvent::written("theme", None, "main")));
    }

    #[test]
    fn test_rejects_other_key() {
        assert!(!filter().accepts(&ChangeEvent::written("count", None, "main")));
    }

    #[test]
    fn test_rejects_clear_half() {
        assert!(!filter().accepts(&ChangeEvent::cleared("theme", "main".to_string())));
        assert!(!filter().accepts(&ChangeEvent::written("theme", None, "")));
    }

    #[test]
    fn test_rejects_own_window() {
        assert!(!filter().accepts(&ChangeEvent::written("theme", None, "popup")));
    }
}
