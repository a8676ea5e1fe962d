//! The generic registry.
//!
//! An insertion-ordered collection behind a single lock. `list()` returns
//! an owned snapshot: mutating the returned vector never affects the
//! registry.

use std::sync::Mutex;

use crate::error::{KernelError, KernelResult};

/// An item a registry can hold.
pub trait Registered: Clone {
    /// What kind of entry this is, for error messages.
    const KIND: &'static str;

    /// The entry's unique id.
    fn id(&self) -> &str;
}

/// Insertion-ordered, id-keyed registry.
#[derive(Debug)]
pub struct Registry<T: Registered> {
    items: Mutex<Vec<T>>,
}

impl<T: Registered> Registry<T> {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            items: Mutex::new(Vec::new()),
        }
    }

    /// Register an item.
    ///
    /// # Errors
    ///
    /// Returns [`KernelError::AlreadyRegistered`] if the id is taken.
    pub fn register(&self, item: T) -> KernelResult<()> {
        let mut items = self.items.lock().unwrap_or_else(|e| e.into_inner());
        if items.iter().any(|existing| existing.id() == item.id()) {
            return Err(KernelError::AlreadyRegistered {
                kind: T::KIND,
                id: item.id().to_string(),
            });
        }
        items.push(item);
        Ok(())
    }

    /// Insert or replace an item.
    pub fn upsert(&self, item: T) {
        let mut items = self.items.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(existing) = items.iter_mut().find(|existing| existing.id() == item.id()) {
            *existing = item;
        } else {
            items.push(item);
        }
    }

    /// Look up an item by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<T> {
        let items = self.items.lock().unwrap_or_else(|e| e.into_inner());
        items.iter().find(|item| item.id() == id).cloned()
    }

    /// Owned snapshot in insertion order.
    #[must_use]
    pub fn list(&self) -> Vec<T> {
        self.items.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Registered> Default for Registry<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Item {
        id: String,
        value: i32,
    }

    impl Registered for Item {
        const KIND: &'static str = "item";
        fn id(&self) -> &str {
            &self.id
        }
    }

    fn item(id: &str, value: i32) -> Item {
        Item {
            id: id.to_string(),
            value,
        }
    }

    #[test]
    fn duplicate_register_fails() {
        let registry = Registry::new();
        registry.register(item("a", 1)).unwrap();
        let err = registry.register(item("a", 2)).unwrap_err();
        assert!(matches!(err, KernelError::AlreadyRegistered { id, .. } if id == "a"));
        assert_eq!(registry.get("a").unwrap().value, 1);
    }

    #[test]
    fn upsert_overwrites() {
        let registry = Registry::new();
        registry.register(item("a", 1)).unwrap();
        registry.upsert(item("a", 2));
        registry.upsert(item("b", 3));
        assert_eq!(registry.get("a").unwrap().value, 2);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn list_snapshot_is_detached() {
        let registry = Registry::new();
        registry.register(item("a", 1)).unwrap();
        registry.register(item("b", 2)).unwrap();

        let mut snapshot = registry.list();
        snapshot.clear();
        assert_eq!(registry.len(), 2);

        // Insertion order is preserved.
        let ids: Vec<String> = registry.list().into_iter().map(|i| i.id).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }
}
