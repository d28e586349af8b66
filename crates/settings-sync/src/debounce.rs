//! Trailing-edge debounce over a channel of notifications.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::timeout;

/// The last item of a burst and how many items the burst contained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Burst<T> {
    pub(crate) last: T,
    pub(crate) coalesced: usize,
}

/// Wait for the next burst of items and return once `quiet` has elapsed
/// without a new one. Every arrival restarts the timer.
///
/// Returns `None` when the channel is closed and drained.
pub(crate) async fn next_burst<T>(
    receiver: &mut mpsc::UnboundedReceiver<T>,
    quiet: Duration,
) -> Option<Burst<T>> {
    let mut last = receiver.recv().await?;
    let mut coalesced = 1;

    loop {
        match timeout(quiet, receiver.recv()).await {
            Ok(Some(item)) => {
                last = item;
                coalesced += 1;
            }
            // Closed mid-burst: still deliver what we have
            Ok(None) | Err(_) => break,
        }
    }

    Some(Burst { last, coalesced })
}
