//! Synchronous subscriber registry.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use slashbot_core::EventEnvelope;
use tracing::trace;

/// Event type that receives every envelope.
pub const WILDCARD: &str = "*";

type Callback = Arc<dyn Fn(&EventEnvelope) + Send + Sync>;

struct Entry {
    id: u64,
    callback: Callback,
}

#[derive(Default)]
pub(crate) struct SubscriberRegistry {
    inner: Arc<Mutex<HashMap<String, Vec<Entry>>>>,
    next_id: AtomicU64,
}

impl SubscriberRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Register a callback for an event type (`"*"` for all events).
    pub(crate) fn add(
        &self,
        event_type: impl Into<String>,
        callback: Callback,
    ) -> Subscription {
        let event_type = event_type.into();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner
            .entry(event_type.clone())
            .or_default()
            .push(Entry { id, callback });
        Subscription {
            registry: Arc::downgrade(&self.inner),
            event_type,
            id,
        }
    }

    /// Invoke subscribers for this envelope: exact matches first, then the
    /// wildcard list, each in registration order. Callbacks run inline.
    pub(crate) fn notify(&self, envelope: &EventEnvelope) {
        let callbacks: Vec<Callback> = {
            let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            let mut callbacks = Vec::new();
            if let Some(entries) = inner.get(&envelope.event_type) {
                callbacks.extend(entries.iter().map(|e| Arc::clone(&e.callback)));
            }
            if let Some(entries) = inner.get(WILDCARD) {
                callbacks.extend(entries.iter().map(|e| Arc::clone(&e.callback)));
            }
            callbacks
        };

        trace!(
            event_type = %envelope.event_type,
            subscriber_count = callbacks.len(),
            "Notifying sync subscribers"
        );

        for callback in callbacks {
            callback(envelope);
        }
    }

    pub(crate) fn len(&self) -> usize {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.values().map(Vec::len).sum()
    }
}

/// Handle to a synchronous subscription. Dropping it (or calling
/// [`Subscription::dispose`]) removes the subscriber.
pub struct Subscription {
    registry: Weak<Mutex<HashMap<String, Vec<Entry>>>>,
    event_type: String,
    id: u64,
}

impl Subscription {
    /// Remove the subscriber now.
    pub fn dispose(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            let mut inner = registry.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(entries) = inner.get_mut(&self.event_type) {
                entries.retain(|e| e.id != self.id);
                if entries.is_empty() {
                    inner.remove(&self.event_type);
                }
            }
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("event_type", &self.event_type)
            .field("id", &self.id)
            .finish()
    }
}
