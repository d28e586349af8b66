//! Change notifications between application windows.
//!
//! A [`ChangeChannel`] is a tiny ephemeral key/value space whose writes are
//! observed as [`ChangeEvent`]s by *other* windows but not by the writer
//! itself. That asymmetry is what lets a window announce "key X changed"
//! without hearing its own announcement back.
//!
//! The channel carries no payload worth reading: receivers treat an event
//! as a hint and re-read the authoritative value from the backing store.
//!
//! # Write-then-clear
//!
//! Events only fire when a value actually changes, so announcing the same
//! marker twice in a row would be silent. Writers therefore clear the marker
//! right after writing it, leaving no stale state and guaranteeing the next
//! announcement is observable.

mod error;
mod event;
mod hub;

pub use error::{ChannelError, Result};
pub use event::ChangeEvent;
pub use hub::{ChannelHub, HubEndpoint, HubOptions};

use async_trait::async_trait;

/// Broadcast primitive shared by every window of one application instance.
pub trait ChangeChannel: Send + Sync {
    /// Set `key` to `value`. Other subscribers see an event if the value changed.
    fn write(&self, key: &str, value: &str) -> Result<()>;

    /// Remove `key`. Other subscribers see an event if it was present.
    fn clear(&self, key: &str) -> Result<()>;

    /// Subscribe to events written by other endpoints.
    fn subscribe(&self) -> ChangeSubscription;
}

/// Source of events behind a [`ChangeSubscription`].
#[async_trait]
pub trait ChangeSource: Send {
    /// Next event, or `None` once the channel is gone.
    async fn recv(&mut self) -> Option<ChangeEvent>;
}

/// A live subscription to a [`ChangeChannel`].
pub struct ChangeSubscription {
    source: Box<dyn ChangeSource>,
}

impl ChangeSubscription {
    /// Wrap a transport-specific event source.
    pub fn new(source: impl ChangeSource + 'static) -> Self {
        Self {
            source: Box::new(source),
        }
    }

    /// Wait for the next event. Returns `None` once the channel is gone.
    pub async fn recv(&mut self) -> Option<ChangeEvent> {
        self.source.recv().await
    }
}

impl std::fmt::Debug for ChangeSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeSubscription").finish_non_exhaustive()
    }
}
