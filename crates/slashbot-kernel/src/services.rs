//! Service registry.
//!
//! Stores opaque implementation objects; callers are responsible for
//! type discipline when downcasting.

use std::any::Any;
use std::sync::{Arc, Mutex};

use crate::error::{KernelError, KernelResult};

type ServiceObject = Arc<dyn Any + Send + Sync>;

/// Registry of opaque service objects, keyed by id.
#[derive(Default)]
pub struct ServiceRegistry {
    services: Mutex<Vec<(String, String, ServiceObject)>>,
}

impl ServiceRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a service.
    ///
    /// # Errors
    ///
    /// Returns [`KernelError::AlreadyRegistered`] if the id is taken.
    pub fn register(
        &self,
        id: impl Into<String>,
        plugin_id: impl Into<String>,
        service: ServiceObject,
    ) -> KernelResult<()> {
        let id = id.into();
        let mut services = self.services.lock().unwrap_or_else(|e| e.into_inner());
        if services.iter().any(|(existing, _, _)| *existing == id) {
            return Err(KernelError::AlreadyRegistered { kind: "service", id });
        }
        services.push((id, plugin_id.into(), service));
        Ok(())
    }

    /// Look up a service and downcast it.
    ///
    /// Returns `None` when the id is unknown or the stored object is not
    /// a `T`.
    #[must_use]
    pub fn get<T: Send + Sync + 'static>(&self, id: &str) -> Option<Arc<T>> {
        let services = self.services.lock().unwrap_or_else(|e| e.into_inner());
        services
            .iter()
            .find(|(existing, _, _)| existing == id)
            .and_then(|(_, _, service)| Arc::clone(service).downcast::<T>().ok())
    }

    /// Registered service ids in registration order.
    #[must_use]
    pub fn ids(&self) -> Vec<String> {
        let services = self.services.lock().unwrap_or_else(|e| e.into_inner());
        services.iter().map(|(id, _, _)| id.clone()).collect()
    }

    /// Number of services.
    #[must_use]
    pub fn len(&self) -> usize {
        self.services.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceRegistry")
            .field("service_count", &self.len())
            .finish()
    }
}
