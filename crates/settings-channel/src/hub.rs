//! In-process channel hub.
//!
//! Windows that live in the same process (webviews, tool panels, test
//! harnesses) each take an [`HubEndpoint`] from one shared [`ChannelHub`].
//! Writes made through one endpoint are delivered to every other endpoint's
//! subscriptions.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::error::{ChannelError, Result};
use crate::event::ChangeEvent;
use crate::{ChangeChannel, ChangeSource, ChangeSubscription};

/// Hub configuration.
#[derive(Debug, Clone)]
pub struct HubOptions {
    /// Events buffered per subscriber before slow subscribers start lagging.
    pub capacity: usize,

    /// Also deliver events to the endpoint that wrote them.
    ///
    /// Off by default. Turning it on models a platform whose broadcast leaks
    /// back to the writer, which the sync protocol must tolerate.
    pub deliver_to_writer: bool,
}

impl Default for HubOptions {
    fn default() -> Self {
        Self {
            capacity: 256,
            deliver_to_writer: false,
        }
    }
}

#[derive(Debug, Clone)]
struct Envelope {
    writer: u64,
    event: ChangeEvent,
}

#[derive(Debug)]
struct HubInner {
    values: Mutex<HashMap<String, String>>,
    sender: broadcast::Sender<Envelope>,
    next_endpoint: AtomicU64,
    options: HubOptions,
}

/// Shared ephemeral key space. Cloning yields another handle to the same hub.
#[derive(Debug, Clone)]
pub struct ChannelHub {
    inner: Arc<HubInner>,
}

impl Default for ChannelHub {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelHub {
    /// Create a hub with default options.
    pub fn new() -> Self {
        Self::with_options(HubOptions::default())
    }

    /// Create a hub with explicit options.
    pub fn with_options(options: HubOptions) -> Self {
        let (sender, _) = broadcast::channel(options.capacity.max(1));
        Self {
            inner: Arc::new(HubInner {
                values: Mutex::new(HashMap::new()),
                sender,
                next_endpoint: AtomicU64::new(1),
                options,
            }),
        }
    }

    /// Create a new endpoint, typically one per window.
    pub fn endpoint(&self) -> HubEndpoint {
        HubEndpoint {
            id: self.inner.next_endpoint.fetch_add(1, Ordering::Relaxed),
            hub: self.clone(),
        }
    }

    /// Current marker under `key`, if any.
    pub fn value(&self, key: &str) -> Option<String> {
        self.inner
            .values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// Apply a change and publish it while still holding the value lock, so
    /// subscribers see events in the same order the values changed.
    fn apply(&self, writer: u64, key: &str, value: Option<&str>) -> Result<()> {
        if key.is_empty() {
            return Err(ChannelError::EmptyKey);
        }

        let mut values = self
            .inner
            .values
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let event = match value {
            Some(value) => {
                let old = values.insert(key.to_string(), value.to_string());
                if old.as_deref() == Some(value) {
                    return Ok(());
                }
                ChangeEvent::written(key, old, value)
            }
            None => match values.remove(key) {
                Some(old) => ChangeEvent::cleared(key, old),
                None => return Ok(()),
            },
        };

        // No subscribers is not an error: nobody else is listening yet.
        let _ = self.inner.sender.send(Envelope { writer, event });
        Ok(())
    }
}

/// One window's handle on a [`ChannelHub`].
#[derive(Debug, Clone)]
pub struct HubEndpoint {
    id: u64,
    hub: ChannelHub,
}

impl HubEndpoint {
    /// The hub this endpoint belongs to.
    pub fn hub(&self) -> &ChannelHub {
        &self.hub
    }
}

impl ChangeChannel for HubEndpoint {
    fn write(&self, key: &str, value: &str) -> Result<()> {
        self.hub.apply(self.id, key, Some(value))
    }

    fn clear(&self, key: &str) -> Result<()> {
        self.hub.apply(self.id, key, None)
    }

    fn subscribe(&self) -> ChangeSubscription {
        ChangeSubscription::new(HubSubscription {
            endpoint: self.id,
            deliver_to_writer: self.hub.inner.options.deliver_to_writer,
            receiver: self.hub.inner.sender.subscribe(),
        })
    }
}

struct HubSubscription {
    endpoint: u64,
    deliver_to_writer: bool,
    receiver: broadcast::Receiver<Envelope>,
}

#[async_trait]
impl ChangeSource for HubSubscription {
    async fn recv(&mut self) -> Option<ChangeEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(envelope) => {
                    if envelope.writer == self.endpoint && !self.deliver_to_writer {
                        continue;
                    }
                    return Some(envelope.event);
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Change subscription lagged, events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    async fn next(subscription: &mut ChangeSubscription) -> Option<ChangeEvent> {
        timeout(Duration::from_millis(50), subscription.recv())
            .await
            .ok()
            .flatten()
    }

    #[tokio::test(start_paused = true)]
    async fn test_writer_does_not_see_own_events() {
        let hub = ChannelHub::new();
        let main = hub.endpoint();
        let popup = hub.endpoint();
        let mut main_events = main.subscribe();
        let mut popup_events = popup.subscribe();

        main.write("theme", "main").unwrap();

        assert_eq!(
            next(&mut popup_events).await,
            Some(ChangeEvent::written("theme", None, "main"))
        );
        assert_eq!(next(&mut main_events).await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_write_then_clear_yields_two_events() {
        let hub = ChannelHub::new();
        let main = hub.endpoint();
        let mut popup_events = hub.endpoint().subscribe();

        main.write("theme", "main").unwrap();
        main.clear("theme").unwrap();

        let first = next(&mut popup_events).await.unwrap();
        let second = next(&mut popup_events).await.unwrap();
        assert_eq!(first.new_value.as_deref(), Some("main"));
        assert!(second.is_clear());
        assert_eq!(hub.value("theme"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unchanged_write_is_silent() {
        let hub = ChannelHub::new();
        let main = hub.endpoint();
        let mut popup_events = hub.endpoint().subscribe();

        main.write("theme", "main").unwrap();
        main.write("theme", "main").unwrap();
        main.clear("missing").unwrap();

        assert!(next(&mut popup_events).await.is_some());
        assert_eq!(next(&mut popup_events).await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deliver_to_writer() {
        let hub = ChannelHub::with_options(HubOptions {
            deliver_to_writer: true,
            ..HubOptions::default()
        });
        let main = hub.endpoint();
        let mut main_events = main.subscribe();

        main.write("theme", "main").unwrap();

        assert_eq!(
            next(&mut main_events).await.and_then(|e| e.new_value),
            Some("main".to_string())
        );
    }

    #[test]
    fn test_empty_key_rejected() {
        let hub = ChannelHub::new();
        assert!(matches!(
            hub.endpoint().write("", "main"),
            Err(ChannelError::EmptyKey)
        ));
    }
}
