//! HTTP route registry, keyed by `(method, path)`.

use std::sync::Mutex;

use slashbot_plugins::HttpRouteDef;

use crate::error::{KernelError, KernelResult};

/// Registry of extra gateway routes. The same path may be registered
/// under different methods.
#[derive(Debug, Default)]
pub struct HttpRouteRegistry {
    routes: Mutex<Vec<HttpRouteDef>>,
}

impl HttpRouteRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a route.
    ///
    /// # Errors
    ///
    /// Returns [`KernelError::AlreadyRegistered`] if the `(method, path)`
    /// pair is taken.
    pub fn register(&self, route: HttpRouteDef) -> KernelResult<()> {
        let mut routes = self.routes.lock().unwrap_or_else(|e| e.into_inner());
        if routes
            .iter()
            .any(|r| r.method == route.method && r.path == route.path)
        {
            return Err(KernelError::AlreadyRegistered {
                kind: "route",
                id: format!("{} {}", route.method, route.path),
            });
        }
        routes.push(route);
        Ok(())
    }

    /// Look up a route.
    #[must_use]
    pub fn get(&self, method: &str, path: &str) -> Option<HttpRouteDef> {
        let routes = self.routes.lock().unwrap_or_else(|e| e.into_inner());
        routes
            .iter()
            .find(|r| r.method == method && r.path == path)
            .cloned()
    }

    /// Owned snapshot in registration order.
    #[must_use]
    pub fn list(&self) -> Vec<HttpRouteDef> {
        self.routes.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Number of routes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::Value;
    use slashbot_plugins::{GatewayError, GatewayMethodHandler};
    use std::sync::Arc;

    struct Noop;

    #[async_trait]
    impl GatewayMethodHandler for Noop {
        async fn call(&self, _params: Value) -> Result<Value, GatewayError> {
            Ok(Value::Null)
        }
    }

    fn route(method: &str, path: &str) -> HttpRouteDef {
        HttpRouteDef {
            method: method.to_string(),
            path: path.to_string(),
            plugin_id: "test".to_string(),
            requires_auth: true,
            handler: Arc::new(Noop),
        }
    }

    #[test]
    fn same_path_different_methods_coexist() {
        let registry = HttpRouteRegistry::new();
        registry.register(route("GET", "/webhook")).unwrap();
        registry.register(route("POST", "/webhook")).unwrap();
        assert_eq!(registry.len(), 2);
        assert!(registry.get("GET", "/webhook").is_some());
        assert!(registry.get("DELETE", "/webhook").is_none());
    }

    #[test]
    fn duplicate_pair_fails() {
        let registry = HttpRouteRegistry::new();
        registry.register(route("GET", "/webhook")).unwrap();
        assert!(registry.register(route("GET", "/webhook")).is_err());
    }
}
