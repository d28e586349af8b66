//! Reactive value tracking.
//!
//! - [`Observable`]: a shared, version-tracked value. Every committed change
//!   bumps the version; watchers wake once per batch and see the latest value.
//! - [`ValueWatch`]: a subscriber handle over an [`Observable`].
//! - [`FlushSignal`]: "the watcher has observed version N". Code that mutates
//!   a value on the watcher's behalf (initial load, remote reconciliation)
//!   awaits this before lifting its guard, so the watcher never mistakes that
//!   mutation for a local edit.
//!
//! # Invariants
//!
//! 1. Version increments exactly once per mutation that changes the value.
//! 2. Setting a value equal to the current value is a no-op (no version bump,
//!    no wake-ups).
//! 3. A watcher that falls behind skips intermediate values and observes the
//!    latest one (changes are batched per wake-up).

use std::sync::Arc;

use tokio::sync::watch;

/// A value paired with the version that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Versioned<T> {
    pub value: T,
    pub version: u64,
}

/// Shared, version-tracked value.
///
/// Cloning an `Observable` creates a new handle to the **same** value.
#[derive(Debug)]
pub struct Observable<T> {
    sender: Arc<watch::Sender<Versioned<T>>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            sender: Arc::clone(&self.sender),
        }
    }
}

impl<T: Clone + PartialEq> Observable<T> {
    /// Create an observable at version 0.
    pub fn new(value: T) -> Self {
        let (sender, _) = watch::channel(Versioned { value, version: 0 });
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Clone of the current value.
    pub fn get(&self) -> T {
        self.sender.borrow().value.clone()
    }

    /// Borrow the current value for the duration of `f`.
    ///
    /// Do not mutate this observable from inside `f`.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.sender.borrow().value)
    }

    /// Current version.
    pub fn version(&self) -> u64 {
        self.sender.borrow().version
    }

    /// Replace the value. Returns `true` if it changed.
    pub fn set(&self, value: T) -> bool {
        self.sender.send_if_modified(|state| {
            if state.value == value {
                return false;
            }
            state.value = value;
            state.version += 1;
            true
        })
    }

    /// Mutate the value in place. Returns `true` if it changed.
    pub fn update(&self, f: impl FnOnce(&mut T)) -> bool {
        self.sender.send_if_modified(|state| {
            let before = state.value.clone();
            f(&mut state.value);
            if state.value == before {
                return false;
            }
            state.version += 1;
            true
        })
    }

    /// Subscribe to changes made after this call.
    pub fn watch(&self) -> ValueWatch<T> {
        ValueWatch {
            receiver: self.sender.subscribe(),
        }
    }
}

/// Subscriber handle for an [`Observable`].
#[derive(Debug)]
pub struct ValueWatch<T> {
    receiver: watch::Receiver<Versioned<T>>,
}

impl<T: Clone> ValueWatch<T> {
    /// Wait for the next change and return the latest value.
    ///
    /// Returns `None` once the observable is gone.
    pub async fn changed(&mut self) -> Option<T> {
        self.next_versioned().await.map(|state| state.value)
    }

    /// Latest value, without marking it seen.
    pub fn get(&self) -> T {
        self.receiver.borrow().value.clone()
    }

    pub(crate) async fn next_versioned(&mut self) -> Option<Versioned<T>> {
        self.receiver.changed().await.ok()?;
        Some(self.receiver.borrow_and_update().clone())
    }
}

/// Writer side of a flush signal, owned by the watcher.
///
/// Dropping it (the watcher stopped) releases every waiter.
#[derive(Debug)]
pub struct FlushMarker {
    sender: watch::Sender<u64>,
}

impl FlushMarker {
    /// Record that every version up to `version` has been observed.
    pub fn mark(&self, version: u64) {
        self.sender.send_if_modified(|observed| {
            if version <= *observed {
                return false;
            }
            *observed = version;
            true
        });
    }
}

/// Reader side of a flush signal.
#[derive(Debug, Clone)]
pub struct FlushSignal {
    receiver: watch::Receiver<u64>,
}

impl FlushSignal {
    /// Create a connected marker/signal pair, starting at version 0.
    pub fn channel() -> (FlushMarker, FlushSignal) {
        let (sender, receiver) = watch::channel(0);
        (FlushMarker { sender }, FlushSignal { receiver })
    }

    /// Highest version observed so far.
    pub fn observed(&self) -> u64 {
        *self.receiver.borrow()
    }

    /// Wait until `version` has been observed, or the watcher has stopped.
    pub async fn wait_for(&self, version: u64) {
        let mut receiver = self.receiver.clone();
        let _ = receiver.wait_for(|observed| *observed >= version).await;
    }

    /// Wait until the watcher has stopped.
    pub async fn closed(&self) {
        let mut receiver = self.receiver.clone();
        while receiver.changed().await.is_ok() {}
    }

    /// True once the watcher has stopped.
    pub fn is_closed(&self) -> bool {
        self.receiver.has_changed().is_err()
    }
}
