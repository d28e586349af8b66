//! Cell lifecycle phase.
//!
//! ```text
//! Loading ──(load settled + flush)──▶ Ready ◀──▶ Reconciling
//! ```
//!
//! The local write path is open only in `Ready`. `Loading` covers the
//! "not initialized" window and `Reconciling` the "syncing" window.

use tokio::sync::watch;

/// Where a cell is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Initial load has not settled yet.
    Loading,
    /// Local changes are persisted and announced.
    Ready,
    /// A remote change is being applied; local persistence is suppressed.
    Reconciling,
}

impl Phase {
    /// The initial load has settled.
    pub fn is_initialized(self) -> bool {
        !matches!(self, Phase::Loading)
    }

    /// A remote-originated update is being applied.
    pub fn is_syncing(self) -> bool {
        matches!(self, Phase::Reconciling)
    }

    /// Whether the local write-and-announce path may fire.
    pub fn accepts_local_writes(self) -> bool {
        matches!(self, Phase::Ready)
    }
}

/// Phase holder enforcing the allowed transitions.
#[derive(Debug)]
pub(crate) struct PhaseCell {
    sender: watch::Sender<Phase>,
}

impl PhaseCell {
    pub(crate) fn new() -> Self {
        let (sender, _) = watch::channel(Phase::Loading);
        Self { sender }
    }

    pub(crate) fn get(&self) -> Phase {
        *self.sender.borrow()
    }

    /// `Loading -> Ready`.
    pub(crate) fn finish_loading(&self) -> bool {
        self.transition(Phase::Loading, Phase::Ready)
    }

    /// `Ready -> Reconciling`.
    pub(crate) fn begin_reconcile(&self) -> bool {
        self.transition(Phase::Ready, Phase::Reconciling)
    }

    /// `Reconciling -> Ready`.
    pub(crate) fn end_reconcile(&self) -> bool {
        self.transition(Phase::Reconciling, Phase::Ready)
    }

    /// Wait until the phase leaves `Loading`.
    pub(crate) async fn initialized(&self) {
        let mut receiver = self.sender.subscribe();
        let _ = receiver.wait_for(|phase| phase.is_initialized()).await;
    }

    fn transition(&self, from: Phase, to: Phase) -> bool {
        self.sender.send_if_modified(|phase| {
            if *phase != from {
                return false;
            }
            *phase = to;
            true
        })
    }
}
