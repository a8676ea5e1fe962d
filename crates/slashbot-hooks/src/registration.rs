//! Hook registrations and the handler trait.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use slashbot_core::{HookDomain, HookEvent};

use crate::error::HookResult;

/// Default hook priority. Lower runs first.
const DEFAULT_PRIORITY: i32 = 100;

/// Handler invoked for a matching dispatch.
///
/// The handler receives a copy of the working payload. Returning
/// `Some(object)` merges the object's top-level fields into the working
/// payload; `None` (or a non-object value) leaves it untouched.
#[async_trait]
pub trait HookHandler: Send + Sync {
    /// Handle one dispatch.
    async fn handle(&self, payload: Value, invocation: &HookInvocation)
        -> HookResult<Option<Value>>;
}

/// Per-invocation context passed to handlers.
#[derive(Debug, Clone)]
pub struct HookInvocation {
    /// Unique id for this invocation.
    pub invocation_id: Uuid,
    /// The event being dispatched.
    pub event: HookEvent,
    /// Session the dispatch belongs to, if any.
    pub session_id: Option<String>,
    /// Agent the dispatch belongs to, if any.
    pub agent_id: Option<String>,
    /// Cancellation handle for the enclosing operation.
    pub cancel: CancellationToken,
}

impl HookInvocation {
    /// Create a context for an event.
    #[must_use]
    pub fn new(event: HookEvent) -> Self {
        Self {
            invocation_id: Uuid::new_v4(),
            event,
            session_id: None,
            agent_id: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Set the session id.
    #[must_use]
    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Set the agent id.
    #[must_use]
    pub fn with_agent(mut self, agent_id: impl Into<String>) -> Self {
        self.agent_id = Some(agent_id.into());
        self
    }

    /// Set the cancellation token.
    #[must_use]
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

/// A registered hook.
#[derive(Clone)]
pub struct HookRegistration {
    /// Unique identifier for this registration.
    pub id: Uuid,
    /// Plugin that owns the hook (failure attribution and teardown).
    pub plugin_id: String,
    /// Domain the hook listens on.
    pub domain: HookDomain,
    /// Event the hook listens for.
    pub event: HookEvent,
    /// Priority (lower runs first, default 100).
    pub priority: i32,
    /// Per-hook timeout override in milliseconds.
    pub timeout_ms: Option<u64>,
    /// Human-readable description.
    pub description: Option<String>,
    /// The handler.
    pub handler: Arc<dyn HookHandler>,
}

impl HookRegistration {
    /// Create a registration for an event, with the handler given as a
    /// closure over the payload.
    pub fn new<F, Fut>(plugin_id: impl Into<String>, event: HookEvent, handler: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HookResult<Option<Value>>> + Send + 'static,
    {
        Self::with_handler(plugin_id, event, FnHook(handler))
    }

    /// Create a registration with an explicit [`HookHandler`].
    pub fn with_handler(
        plugin_id: impl Into<String>,
        event: HookEvent,
        handler: impl HookHandler + 'static,
    ) -> Self {
        let domain = event.domain();
        Self {
            id: Uuid::new_v4(),
            plugin_id: plugin_id.into(),
            domain,
            event,
            priority: DEFAULT_PRIORITY,
            timeout_ms: None,
            description: None,
            handler: Arc::new(handler),
        }
    }

    /// Set the priority.
    #[must_use]
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Set a per-hook timeout in milliseconds.
    #[must_use]
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    /// Set the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

impl std::fmt::Debug for HookRegistration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookRegistration")
            .field("id", &self.id)
            .field("plugin_id", &self.plugin_id)
            .field("domain", &self.domain)
            .field("event", &self.event)
            .field("priority", &self.priority)
            .field("timeout_ms", &self.timeout_ms)
            .finish()
    }
}

/// Adapter turning a payload closure into a [`HookHandler`].
struct FnHook<F>(F);

#[async_trait]
impl<F, Fut> HookHandler for FnHook<F>
where
    F: Fn(Value) -> Fut + Send + Sync,
    Fut: Future<Output = HookResult<Option<Value>>> + Send,
{
    async fn handle(
        &self,
        payload: Value,
        _invocation: &HookInvocation,
    ) -> HookResult<Option<Value>> {
        (self.0)(payload).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn closure_registration_carries_defaults() {
        let reg = HookRegistration::new("test.plugin", HookEvent::MessageReceived, |_| async {
            Ok(None)
        });
        assert_eq!(reg.priority, 100);
        assert_eq!(reg.domain, HookDomain::Lifecycle);
        assert!(reg.timeout_ms.is_none());
    }

    #[tokio::test]
    async fn builder_setters() {
        let reg = HookRegistration::new("test.plugin", HookEvent::Startup, |_| async { Ok(None) })
            .with_priority(5)
            .with_timeout_ms(200)
            .with_description("audit");
        assert_eq!(reg.priority, 5);
        assert_eq!(reg.timeout_ms, Some(200));
        assert_eq!(reg.domain, HookDomain::Kernel);
    }
}
