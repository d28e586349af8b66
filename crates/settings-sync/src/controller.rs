//! Per-window synchronization controller.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use settings_channel::{ChangeChannel, ChangeEvent, ChangeSubscription};
use settings_store::Store;
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::cell::local::{self, Persister};
use crate::cell::remote::{self, RemoteFilter};
use crate::cell::{CellShared, CellValue, Pending, PersistedCell, load};
use crate::config::SyncConfig;
use crate::hooks::CellOptions;
use crate::phase::PhaseCell;
use crate::reactive::{FlushSignal, Observable};
use crate::window::WindowId;

/// Creates [`PersistedCell`]s for one window and owns their background work.
///
/// Each window of the application creates its own controller around the
/// shared store and change channel. Dropping the controller aborts every
/// background task it started; cells created by it then behave as plain
/// local values.
///
/// A controller must be created and used inside a Tokio runtime.
pub struct SyncController {
    window: WindowId,
    store: Arc<dyn Store>,
    channel: Arc<dyn ChangeChannel>,
    config: SyncConfig,
    router: Arc<Router>,
    tasks: Mutex<JoinSet<()>>,
}

impl SyncController {
    /// Controller with the default [`SyncConfig`].
    pub fn new(
        window: impl Into<WindowId>,
        store: Arc<dyn Store>,
        channel: Arc<dyn ChangeChannel>,
    ) -> Self {
        Self::with_config(window, store, channel, SyncConfig::default())
    }

    pub fn with_config(
        window: impl Into<WindowId>,
        store: Arc<dyn Store>,
        channel: Arc<dyn ChangeChannel>,
        config: SyncConfig,
    ) -> Self {
        let window = window.into();
        let router = Arc::new(Router::default());

        // Subscribe now so no announcement made after construction is missed
        let subscription = channel.subscribe();
        let mut tasks = JoinSet::new();
        tasks.spawn(dispatch(subscription, Arc::clone(&router), window.clone()));

        Self {
            window,
            store,
            channel,
            config,
            router,
            tasks: Mutex::new(tasks),
        }
    }

    pub fn window_id(&self) -> &WindowId {
        &self.window
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Cell for `key` without hooks. See [`persisted_with`](Self::persisted_with).
    pub fn persisted<T: CellValue>(&self, key: impl Into<String>, default: T) -> PersistedCell<T> {
        self.persisted_with(key, default, CellOptions::new())
    }

    /// Create a cell for `key`, starting at `default`.
    ///
    /// Returns immediately. The stored value (if any) is loaded in the
    /// background; await [`PersistedCell::ready`] to know when it has
    /// settled. Keys must be unique within a window.
    pub fn persisted_with<T: CellValue>(
        &self,
        key: impl Into<String>,
        default: T,
        options: CellOptions<T>,
    ) -> PersistedCell<T> {
        let key = key.into();
        let (marker, flush) = FlushSignal::channel();
        let value = Observable::new(default);
        // The watcher must exist before the load can change the value
        let changes = value.watch();

        let shared = Arc::new(CellShared {
            key: key.clone(),
            window: self.window.clone(),
            value,
            phase: PhaseCell::new(),
            flush,
            pending: Pending::new(),
            options,
        });

        let (jobs_tx, jobs_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        self.router.add(Route {
            filter: RemoteFilter::new(key, self.window.clone()),
            sender: events_tx,
            pending: shared.pending.clone(),
        });

        let persister = Persister {
            store: Arc::clone(&self.store),
            channel: Arc::clone(&self.channel),
            policy: self.config.save_failure,
        };

        let mut tasks = lock(&self.tasks);
        while tasks.try_join_next().is_some() {}
        tasks.spawn(local::watch_changes(
            Arc::clone(&shared),
            changes,
            marker,
            jobs_tx,
        ));
        tasks.spawn(persister.run(Arc::clone(&shared), jobs_rx));
        tasks.spawn(remote::listen(
            Arc::clone(&shared),
            Arc::clone(&self.store),
            events_rx,
            self.config.debounce(),
        ));
        tasks.spawn(load::run(Arc::clone(&shared), Arc::clone(&self.store)));

        PersistedCell::from_shared(shared)
    }
}

impl fmt::Debug for SyncController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncController")
            .field("window", &self.window)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Delivery target for one cell's remote notifications.
struct Route {
    filter: RemoteFilter,
    sender: mpsc::UnboundedSender<ChangeEvent>,
    pending: Pending,
}

/// Fans the window's single channel subscription out to its cells by key.
#[derive(Default)]
struct Router {
    routes: Mutex<HashMap<String, Vec<Route>>>,
}

impl Router {
    fn add(&self, route: Route) {
        lock(&self.routes)
            .entry(route.filter.key().to_string())
            .or_default()
            .push(route);
    }

    fn route(&self, event: &ChangeEvent, window: &WindowId) {
        let routes = lock(&self.routes);
        let Some(targets) = routes.get(&event.key) else {
            return;
        };

        for route in targets {
            if !route.filter.accepts(event) {
                if !event.is_clear() {
                    tracing::debug!(
                        "[{}] Ignoring own announcement for key \"{}\"",
                        window,
                        event.key
                    );
                }
                continue;
            }

            route.pending.add(1);
            if route.sender.send(event.clone()).is_err() {
                route.pending.done(1);
            }
        }
    }
}

async fn dispatch(mut subscription: ChangeSubscription, router: Arc<Router>, window: WindowId) {
    while let Some(event) = subscription.recv().await {
        router.route(&event, &window);
    }
    tracing::debug!("[{}] Change channel closed", window);
}

/// Neither map carries cross-entry invariants, so a poisoned lock is still usable.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
