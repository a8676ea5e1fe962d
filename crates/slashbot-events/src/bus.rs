//! Event bus for broadcasting envelopes to subscribers.

use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, trace, warn};

use slashbot_core::EventEnvelope;

use crate::subscriber::{Subscription, SubscriberRegistry};

/// Default channel capacity for the event bus.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Event bus for broadcasting envelopes to all subscribers.
///
/// Synchronous subscribers are notified inline from [`EventBus::publish`];
/// a slow subscriber delays the others on that publish call but nothing
/// else. Async receivers consume from a broadcast channel and may lag.
pub struct EventBus {
    sender: broadcast::Sender<Arc<EventEnvelope>>,
    registry: SubscriberRegistry,
    capacity: usize,
}

impl EventBus {
    /// Create a new event bus with default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a new event bus with the specified capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            registry: SubscriberRegistry::new(),
            capacity,
        }
    }

    /// Publish an envelope to all subscribers.
    ///
    /// Synchronous subscribers run first, in registration order. Returns
    /// the number of async receivers that received the envelope.
    pub fn publish(&self, envelope: EventEnvelope) -> usize {
        let envelope = Arc::new(envelope);

        trace!(event_type = %envelope.event_type, "Publishing event");

        self.registry.notify(&envelope);

        if let Ok(count) = self.sender.send(Arc::clone(&envelope)) {
            debug!(
                event_type = %envelope.event_type,
                receiver_count = count,
                "Event published"
            );
            count
        } else {
            // No receivers - this is fine
            trace!(event_type = %envelope.event_type, "No receivers for event");
            0
        }
    }

    /// Register a synchronous subscriber for `event_type` (`"*"` for all).
    ///
    /// The returned [`Subscription`] removes the subscriber when dropped.
    #[must_use]
    pub fn subscribe_sync(
        &self,
        event_type: impl Into<String>,
        callback: impl Fn(&EventEnvelope) + Send + Sync + 'static,
    ) -> Subscription {
        self.registry.add(event_type, Arc::new(callback))
    }

    /// Subscribe to events asynchronously.
    #[must_use]
    pub fn subscribe(&self) -> EventReceiver {
        EventReceiver {
            receiver: self.sender.subscribe(),
        }
    }

    /// Number of registered synchronous subscribers.
    #[must_use]
    pub fn sync_subscriber_count(&self) -> usize {
        self.registry.len()
    }

    /// Number of active async receivers.
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Channel capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("capacity", &self.capacity)
            .field("receiver_count", &self.sender.receiver_count())
            .finish()
    }
}

/// Receiver for envelopes from the event bus.
pub struct EventReceiver {
    receiver: broadcast::Receiver<Arc<EventEnvelope>>,
}

impl EventReceiver {
    /// Receive the next envelope.
    ///
    /// Returns `None` when the channel is closed. Lagged receivers skip
    /// dropped envelopes and keep receiving.
    pub async fn recv(&mut self) -> Option<Arc<EventEnvelope>> {
        loop {
            match self.receiver.recv().await {
                Ok(envelope) => return Some(envelope),
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    warn!(skipped = count, "Event receiver lagged, events dropped");
                },
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Try to receive the next envelope without blocking.
    pub fn try_recv(&mut self) -> Option<Arc<EventEnvelope>> {
        loop {
            match self.receiver.try_recv() {
                Ok(envelope) => return Some(envelope),
                Err(broadcast::error::TryRecvError::Lagged(count)) => {
                    warn!(skipped = count, "Event receiver lagged, events dropped");
                },
                Err(
                    broadcast::error::TryRecvError::Empty
                    | broadcast::error::TryRecvError::Closed,
                ) => return None,
            }
        }
    }
}
