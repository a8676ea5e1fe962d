//! The hook dispatcher.
//!
//! Within one dispatch, hooks run strictly sequentially in deterministic
//! order. Across concurrent dispatches, handlers may interleave; handlers
//! must not rely on inter-invocation state without their own
//! synchronization.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde_json::{json, Value};
use tracing::{debug, warn};
use uuid::Uuid;

use slashbot_core::{cap_json, EventEnvelope, HookDomain, HookEvent};
use slashbot_events::EventBus;

use crate::registration::{HookInvocation, HookRegistration};

/// A hook failure (throw or timeout) recorded during a dispatch.
#[derive(Debug, Clone)]
pub struct HookFailure {
    /// Plugin that owns the failing hook.
    pub plugin_id: String,
    /// The failing registration's id.
    pub hook_id: Uuid,
    /// Domain of the dispatch.
    pub domain: HookDomain,
    /// Event of the dispatch.
    pub event: HookEvent,
    /// Time spent in the handler before it failed or was abandoned.
    pub elapsed_ms: u64,
    /// Error message.
    pub message: String,
    /// Whether the failure was a timeout.
    pub timed_out: bool,
}

/// The result of one dispatch.
#[derive(Debug, Clone)]
pub struct DispatchReport {
    /// The payload as handed to `dispatch`.
    pub initial_payload: Value,
    /// The payload after all handler patches were applied.
    pub final_payload: Value,
    /// One record per hook that threw or timed out.
    pub failures: Vec<HookFailure>,
}

struct Registered {
    seq: u64,
    registration: HookRegistration,
}

/// Deterministic, timeout-isolated hook dispatcher.
pub struct HookDispatcher {
    hooks: Mutex<Vec<Registered>>,
    seq: AtomicU64,
    bus: Arc<EventBus>,
    default_timeout_ms: u64,
}

impl HookDispatcher {
    /// Create a dispatcher publishing observability events on `bus`.
    #[must_use]
    pub fn new(bus: Arc<EventBus>, default_timeout_ms: u64) -> Self {
        Self {
            hooks: Mutex::new(Vec::new()),
            seq: AtomicU64::new(0),
            bus,
            default_timeout_ms,
        }
    }

    /// Register a hook.
    pub fn register(&self, registration: HookRegistration) {
        debug!(
            hook_id = %registration.id,
            plugin_id = %registration.plugin_id,
            domain = %registration.domain,
            event = %registration.event,
            priority = registration.priority,
            "Registered hook"
        );
        self.emit(
            "hook:registered",
            json!({
                "hookId": registration.id,
                "pluginId": registration.plugin_id,
                "domain": registration.domain.to_string(),
                "event": registration.event.to_string(),
                "priority": registration.priority,
            }),
        );
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        let mut hooks = self.hooks.lock().unwrap_or_else(|e| e.into_inner());
        hooks.push(Registered { seq, registration });
    }

    /// Remove every hook owned by a plugin. Returns how many were removed.
    pub fn remove_plugin(&self, plugin_id: &str) -> usize {
        let mut hooks = self.hooks.lock().unwrap_or_else(|e| e.into_inner());
        let before = hooks.len();
        hooks.retain(|h| h.registration.plugin_id != plugin_id);
        before - hooks.len()
    }

    /// Number of registered hooks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.hooks.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Whether no hooks are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Dispatch an event to all matching hooks.
    ///
    /// Handlers run sequentially in ascending `(priority, registration
    /// order)`. Each receives a copy of the working payload; an object
    /// return value is shallow-merged into the working payload. A throw or
    /// timeout is recorded in `failures` and does not roll back earlier
    /// patches or skip later hooks.
    pub async fn dispatch(
        &self,
        domain: HookDomain,
        event: &HookEvent,
        payload: Value,
        invocation: &HookInvocation,
    ) -> DispatchReport {
        let selected = self.select(domain, event);

        self.emit(
            "hook:dispatch_start",
            json!({
                "domain": domain.to_string(),
                "event": event.to_string(),
                "hookCount": selected.len(),
                "payload": cap_json(&payload),
            }),
        );

        let initial_payload = payload.clone();
        let mut working = payload;
        let mut failures = Vec::new();

        for registration in &selected {
            let timeout = Duration::from_millis(
                registration.timeout_ms.unwrap_or(self.default_timeout_ms),
            );

            self.emit(
                "hook:invoke_start",
                json!({
                    "hookId": registration.id,
                    "pluginId": registration.plugin_id,
                    "event": event.to_string(),
                }),
            );

            let started = Instant::now();
            let outcome = tokio::time::timeout(
                timeout,
                registration.handler.handle(working.clone(), invocation),
            )
            .await;
            let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

            match outcome {
                Ok(Ok(patch)) => {
                    if let Some(patch) = patch {
                        merge_top_level(&mut working, &patch);
                    }
                    self.emit(
                        "hook:invoke_success",
                        json!({
                            "hookId": registration.id,
                            "pluginId": registration.plugin_id,
                            "event": event.to_string(),
                            "elapsedMs": elapsed_ms,
                        }),
                    );
                },
                Ok(Err(e)) => {
                    let message = e.to_string();
                    warn!(
                        hook_id = %registration.id,
                        plugin_id = %registration.plugin_id,
                        event = %event,
                        error = %message,
                        "Hook handler failed"
                    );
                    self.emit_failure(registration, event, elapsed_ms, &message, false);
                    failures.push(HookFailure {
                        plugin_id: registration.plugin_id.clone(),
                        hook_id: registration.id,
                        domain,
                        event: event.clone(),
                        elapsed_ms,
                        message,
                        timed_out: false,
                    });
                },
                Err(_) => {
                    let message = format!("timed out after {}ms", timeout.as_millis());
                    warn!(
                        hook_id = %registration.id,
                        plugin_id = %registration.plugin_id,
                        event = %event,
                        timeout_ms = timeout.as_millis() as u64,
                        "Hook handler timed out"
                    );
                    self.emit_failure(registration, event, elapsed_ms, &message, true);
                    failures.push(HookFailure {
                        plugin_id: registration.plugin_id.clone(),
                        hook_id: registration.id,
                        domain,
                        event: event.clone(),
                        elapsed_ms,
                        message,
                        timed_out: true,
                    });
                },
            }
        }

        self.emit(
            "hook:dispatch_end",
            json!({
                "domain": domain.to_string(),
                "event": event.to_string(),
                "failureCount": failures.len(),
                "payload": cap_json(&working),
            }),
        );

        DispatchReport {
            initial_payload,
            final_payload: working,
            failures,
        }
    }

    /// Snapshot matching registrations in dispatch order.
    fn select(&self, domain: HookDomain, event: &HookEvent) -> Vec<HookRegistration> {
        let hooks = self.hooks.lock().unwrap_or_else(|e| e.into_inner());
        let mut matching: Vec<(i32, u64, HookRegistration)> = hooks
            .iter()
            .filter(|h| h.registration.domain == domain && h.registration.event == *event)
            .map(|h| (h.registration.priority, h.seq, h.registration.clone()))
            .collect();
        matching.sort_by_key(|(priority, seq, _)| (*priority, *seq));
        matching.into_iter().map(|(_, _, r)| r).collect()
    }

    fn emit_failure(
        &self,
        registration: &HookRegistration,
        event: &HookEvent,
        elapsed_ms: u64,
        message: &str,
        timed_out: bool,
    ) {
        self.emit(
            "hook:invoke_failure",
            json!({
                "hookId": registration.id,
                "pluginId": registration.plugin_id,
                "event": event.to_string(),
                "elapsedMs": elapsed_ms,
                "message": message,
                "timedOut": timed_out,
            }),
        );
    }

    fn emit(&self, event_type: &str, payload: Value) {
        // Observability must never disturb a dispatch.
        self.bus.publish(EventEnvelope::new(event_type, payload));
    }
}

impl std::fmt::Debug for HookDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookDispatcher")
            .field("hook_count", &self.len())
            .field("default_timeout_ms", &self.default_timeout_ms)
            .finish()
    }
}

/// Shallow merge: top-level fields of `patch` overwrite `target`'s.
fn merge_top_level(target: &mut Value, patch: &Value) {
    let Value::Object(patch_map) = patch else {
        debug!("Hook patch was not an object, ignoring");
        return;
    };
    if let Value::Object(target_map) = target {
        for (key, value) in patch_map {
            target_map.insert(key.clone(), value.clone());
        }
    } else {
        *target = patch.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HookError;
    use crate::registration::HookRegistration;
    use serde_json::json;

    fn dispatcher() -> HookDispatcher {
        HookDispatcher::new(Arc::new(EventBus::new()), 1_000)
    }

    fn add_hook(d: &HookDispatcher, priority: i32, delta: i64) {
        let reg = HookRegistration::new("test.plugin", HookEvent::Custom("input".into()), {
            move |payload: Value| async move {
                let count = payload["count"].as_i64().unwrap_or(0);
                Ok(Some(json!({"count": count + delta})))
            }
        })
        .with_priority(priority);
        d.register(reg);
    }

    #[tokio::test]
    async fn hooks_run_in_priority_then_registration_order() {
        let d = dispatcher();
        add_hook(&d, 10, 1);
        add_hook(&d, 10, 2);
        add_hook(&d, 20, 10);

        let invocation = HookInvocation::new(HookEvent::Custom("input".into()));
        let report = d
            .dispatch(
                HookDomain::Custom,
                &HookEvent::Custom("input".into()),
                json!({"count": 0}),
                &invocation,
            )
            .await;

        assert!(report.failures.is_empty());
        assert_eq!(report.final_payload["count"], 13);
        assert_eq!(report.initial_payload["count"], 0);
    }

    #[tokio::test]
    async fn failure_is_isolated_and_other_patches_stand() {
        let d = dispatcher();
        d.register(
            HookRegistration::new("bad.plugin", HookEvent::MessageReceived, |_| async {
                Err(HookError::Handler("boom".into()))
            })
            .with_priority(1),
        );
        d.register(HookRegistration::new(
            "good.plugin",
            HookEvent::MessageReceived,
            |_| async { Ok(Some(json!({"touched": true}))) },
        ));

        let invocation = HookInvocation::new(HookEvent::MessageReceived);
        let report = d
            .dispatch(
                HookDomain::Lifecycle,
                &HookEvent::MessageReceived,
                json!({}),
                &invocation,
            )
            .await;

        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].plugin_id, "bad.plugin");
        assert!(!report.failures[0].timed_out);
        assert_eq!(report.final_payload["touched"], true);
    }

    #[tokio::test]
    async fn timeout_produces_timed_out_failure() {
        let d = dispatcher();
        d.register(
            HookRegistration::new("slow.plugin", HookEvent::MessageSent, |_| async {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(None)
            })
            .with_timeout_ms(50),
        );

        let invocation = HookInvocation::new(HookEvent::MessageSent);
        let started = Instant::now();
        let report = d
            .dispatch(
                HookDomain::Lifecycle,
                &HookEvent::MessageSent,
                json!({}),
                &invocation,
            )
            .await;
        let elapsed = started.elapsed();

        assert_eq!(report.failures.len(), 1);
        assert!(report.failures[0].timed_out);
        assert!(elapsed >= Duration::from_millis(50));
        assert!(elapsed < Duration::from_millis(1_000));
    }

    #[tokio::test]
    async fn payload_merge_is_shallow() {
        let d = dispatcher();
        d.register(HookRegistration::new(
            "test.plugin",
            HookEvent::BeforeToolCall,
            |_| async { Ok(Some(json!({"args": {"replaced": true}}))) },
        ));

        let invocation = HookInvocation::new(HookEvent::BeforeToolCall);
        let report = d
            .dispatch(
                HookDomain::Lifecycle,
                &HookEvent::BeforeToolCall,
                json!({"args": {"a": 1, "b": 2}, "toolId": "bash"}),
                &invocation,
            )
            .await;

        // Top-level assign: the whole "args" value is replaced, siblings kept.
        assert_eq!(report.final_payload["args"], json!({"replaced": true}));
        assert_eq!(report.final_payload["toolId"], "bash");
    }

    #[tokio::test]
    async fn dispatch_emits_observability_events() {
        let bus = Arc::new(EventBus::new());
        let d = HookDispatcher::new(Arc::clone(&bus), 1_000);
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _sub = bus.subscribe_sync("*", move |e| {
            sink.lock().unwrap().push(e.event_type.clone());
        });

        d.register(HookRegistration::new(
            "test.plugin",
            HookEvent::SessionStart,
            |_| async { Ok(None) },
        ));
        let invocation = HookInvocation::new(HookEvent::SessionStart);
        d.dispatch(
            HookDomain::Lifecycle,
            &HookEvent::SessionStart,
            json!({}),
            &invocation,
        )
        .await;

        let events = seen.lock().unwrap().clone();
        assert_eq!(
            events,
            vec![
                "hook:registered",
                "hook:dispatch_start",
                "hook:invoke_start",
                "hook:invoke_success",
                "hook:dispatch_end",
            ]
        );
    }

    #[tokio::test]
    async fn remove_plugin_unregisters_its_hooks() {
        let d = dispatcher();
        add_hook(&d, 10, 1);
        add_hook(&d, 10, 2);
        assert_eq!(d.len(), 2);
        assert_eq!(d.remove_plugin("test.plugin"), 2);
        assert!(d.is_empty());
    }

    #[tokio::test]
    async fn no_matching_hooks_is_identity() {
        let d = dispatcher();
        let invocation = HookInvocation::new(HookEvent::CliInit);
        let report = d
            .dispatch(
                HookDomain::Lifecycle,
                &HookEvent::CliInit,
                json!({"x": 1}),
                &invocation,
            )
            .await;
        assert_eq!(report.initial_payload, report.final_payload);
        assert!(report.failures.is_empty());
    }
}
