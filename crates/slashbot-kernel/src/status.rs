//! Status indicator registry.
//!
//! Holds a live status value per indicator. Subscribers are notified
//! only when a value actually changes; listings come back sorted by
//! ascending priority, ties by insertion order.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use serde_json::Value;

use slashbot_plugins::StatusIndicatorDef;

use crate::error::{KernelError, KernelResult};

type StatusCallback = Arc<dyn Fn(&str, &Value) + Send + Sync>;

struct Entry {
    def: StatusIndicatorDef,
    status: Value,
}

struct Subscriber {
    id: u64,
    callback: StatusCallback,
}

/// Registry of status indicators with live values.
#[derive(Default)]
pub struct StatusIndicatorRegistry {
    entries: Mutex<Vec<Entry>>,
    subscribers: Arc<Mutex<Vec<Subscriber>>>,
    next_subscriber_id: AtomicU64,
}

impl StatusIndicatorRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an indicator with its initial status.
    ///
    /// # Errors
    ///
    /// Returns [`KernelError::AlreadyRegistered`] if the id is taken.
    pub fn register(&self, def: StatusIndicatorDef) -> KernelResult<()> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        if entries.iter().any(|e| e.def.id == def.id) {
            return Err(KernelError::AlreadyRegistered {
                kind: "status indicator",
                id: def.id,
            });
        }
        let status = def.initial.clone();
        entries.push(Entry { def, status });
        Ok(())
    }

    /// Update an indicator's status. Subscribers fire only when the
    /// value changed. Returns whether it changed.
    pub fn update_status(&self, id: &str, value: Value) -> bool {
        let changed = {
            let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
            match entries.iter_mut().find(|e| e.def.id == id) {
                Some(entry) if entry.status != value => {
                    entry.status = value.clone();
                    true
                },
                _ => false,
            }
        };
        if changed {
            let callbacks: Vec<StatusCallback> = {
                let subscribers = self.subscribers.lock().unwrap_or_else(|e| e.into_inner());
                subscribers.iter().map(|s| Arc::clone(&s.callback)).collect()
            };
            for callback in callbacks {
                callback(id, &value);
            }
        }
        changed
    }

    /// Current status of one indicator.
    #[must_use]
    pub fn status(&self, id: &str) -> Option<Value> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries
            .iter()
            .find(|e| e.def.id == id)
            .map(|e| e.status.clone())
    }

    /// Snapshot of `(definition, status)` pairs sorted by ascending
    /// priority, ties by insertion order.
    #[must_use]
    pub fn list(&self) -> Vec<(StatusIndicatorDef, Value)> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let mut indexed: Vec<(usize, &Entry)> = entries.iter().enumerate().collect();
        indexed.sort_by_key(|(idx, entry)| (entry.def.priority, *idx));
        indexed
            .into_iter()
            .map(|(_, entry)| (entry.def.clone(), entry.status.clone()))
            .collect()
    }

    /// Subscribe to status changes. The subscription unsubscribes on
    /// drop.
    #[must_use]
    pub fn subscribe(
        &self,
        callback: impl Fn(&str, &Value) + Send + Sync + 'static,
    ) -> StatusSubscription {
        let id = self.next_subscriber_id.fetch_add(1, Ordering::Relaxed);
        let mut subscribers = self.subscribers.lock().unwrap_or_else(|e| e.into_inner());
        subscribers.push(Subscriber {
            id,
            callback: Arc::new(callback),
        });
        StatusSubscription {
            subscribers: Arc::downgrade(&self.subscribers),
            id,
        }
    }

    /// Number of indicators.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for StatusIndicatorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusIndicatorRegistry")
            .field("indicator_count", &self.len())
            .finish()
    }
}

/// Disposer for a status subscription.
pub struct StatusSubscription {
    subscribers: Weak<Mutex<Vec<Subscriber>>>,
    id: u64,
}

impl StatusSubscription {
    /// Unsubscribe now.
    pub fn dispose(self) {
        drop(self);
    }
}

impl Drop for StatusSubscription {
    fn drop(&mut self) {
        if let Some(subscribers) = self.subscribers.upgrade() {
            let mut subscribers = subscribers.lock().unwrap_or_else(|e| e.into_inner());
            subscribers.retain(|s| s.id != self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn indicator(id: &str, priority: i32) -> StatusIndicatorDef {
        StatusIndicatorDef {
            id: id.to_string(),
            plugin_id: "test".to_string(),
            label: id.to_string(),
            priority,
            initial: json!("idle"),
        }
    }

    #[test]
    fn notifies_only_on_change() {
        let registry = StatusIndicatorRegistry::new();
        registry.register(indicator("llm", 100)).unwrap();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&seen);
        let _sub = registry.subscribe(move |id, value| {
            log.lock().unwrap().push((id.to_string(), value.clone()));
        });

        assert!(registry.update_status("llm", json!("busy")));
        assert!(!registry.update_status("llm", json!("busy")));
        assert!(registry.update_status("llm", json!("idle")));

        let events = seen.lock().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].1, json!("busy"));
    }

    #[test]
    fn list_sorts_by_priority_then_insertion() {
        let registry = StatusIndicatorRegistry::new();
        registry.register(indicator("late-low", 200)).unwrap();
        registry.register(indicator("first-default", 100)).unwrap();
        registry.register(indicator("second-default", 100)).unwrap();
        registry.register(indicator("urgent", 1)).unwrap();

        let ids: Vec<String> = registry.list().into_iter().map(|(d, _)| d.id).collect();
        assert_eq!(
            ids,
            vec!["urgent", "first-default", "second-default", "late-low"]
        );
    }

    #[test]
    fn dropped_subscription_stops_notifications() {
        let registry = StatusIndicatorRegistry::new();
        registry.register(indicator("llm", 100)).unwrap();

        let seen = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&seen);
        let sub = registry.subscribe(move |_, _| {
            *counter.lock().unwrap() += 1;
        });
        registry.update_status("llm", json!("a"));
        sub.dispose();
        registry.update_status("llm", json!("b"));
        assert_eq!(*seen.lock().unwrap(), 1);
    }

    #[test]
    fn duplicate_indicator_fails() {
        let registry = StatusIndicatorRegistry::new();
        registry.register(indicator("llm", 100)).unwrap();
        assert!(registry.register(indicator("llm", 100)).is_err());
    }
}
