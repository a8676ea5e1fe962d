//! The kernel façade.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use slashbot_config::RuntimeConfig;
use slashbot_core::error_codes;
use slashbot_core::{EventEnvelope, HookEvent, OpCtx, SlashbotHome, ToolResult};
use slashbot_events::EventBus;
use slashbot_hooks::{DispatchReport, HookDispatcher, HookInvocation};
use slashbot_llm::ProviderRegistry;
use slashbot_plugins::{
    deactivate_all, load_plugins, CommandDefinition, DiscoveredPlugin, GatewayMethodDef,
    LoadedPlugin, PluginContext, PluginDiagnostic, PluginManifest, PluginResult, PluginStatus,
    ToolDefinition,
};

use crate::context_impl::KernelPluginContext;
use crate::prompt::PromptAssembler;
use crate::registry::{Registered, Registry};
use crate::routes::HttpRouteRegistry;
use crate::services::ServiceRegistry;
use crate::session::SessionMeta;
use crate::status::StatusIndicatorRegistry;

/// Wall-clock budget for message-lifecycle hook dispatch. Past it the
/// dispatch continues fire-and-forget.
const LIFECYCLE_DISPATCH_BUDGET: Duration = Duration::from_millis(250);

impl Registered for ToolDefinition {
    const KIND: &'static str = "tool";
    fn id(&self) -> &str {
        &self.id
    }
}

impl Registered for CommandDefinition {
    const KIND: &'static str = "command";
    fn id(&self) -> &str {
        &self.id
    }
}

impl Registered for GatewayMethodDef {
    const KIND: &'static str = "gateway method";
    fn id(&self) -> &str {
        &self.name
    }
}

/// Overall host health.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Every plugin loaded.
    Ok,
    /// At least one plugin failed.
    Degraded,
}

/// Health payload served by the gateway.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Health {
    /// Overall status.
    pub status: HealthStatus,
    /// Registry and plugin counts.
    pub details: Value,
}

/// The kernel: owns every registry, the dispatcher, the event bus, and
/// the prompt assembler.
pub struct Kernel {
    home: SlashbotHome,
    config: RuntimeConfig,
    bus: Arc<EventBus>,
    dispatcher: Arc<HookDispatcher>,
    tools: Registry<ToolDefinition>,
    commands: Registry<CommandDefinition>,
    providers: Arc<ProviderRegistry>,
    services: ServiceRegistry,
    http_routes: HttpRouteRegistry,
    gateway_methods: Registry<GatewayMethodDef>,
    status_indicators: StatusIndicatorRegistry,
    prompt: PromptAssembler,
    plugins: Mutex<Vec<LoadedPlugin>>,
    diagnostics: Mutex<Vec<PluginDiagnostic>>,
}

impl Kernel {
    /// Create a kernel over a home directory and validated config.
    #[must_use]
    pub fn new(home: SlashbotHome, config: RuntimeConfig) -> Arc<Self> {
        let bus = Arc::new(EventBus::new());
        let dispatcher = Arc::new(HookDispatcher::new(
            Arc::clone(&bus),
            config.hooks.default_timeout_ms,
        ));
        Arc::new(Self {
            home,
            config,
            bus,
            dispatcher,
            tools: Registry::new(),
            commands: Registry::new(),
            providers: Arc::new(ProviderRegistry::new()),
            services: ServiceRegistry::new(),
            http_routes: HttpRouteRegistry::new(),
            gateway_methods: Registry::new(),
            status_indicators: StatusIndicatorRegistry::new(),
            prompt: PromptAssembler::new(),
            plugins: Mutex::new(Vec::new()),
            diagnostics: Mutex::new(Vec::new()),
        })
    }

    /// The runtime config.
    #[must_use]
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// The home directory.
    #[must_use]
    pub fn home(&self) -> &SlashbotHome {
        &self.home
    }

    /// The event bus.
    #[must_use]
    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    /// The hook dispatcher.
    #[must_use]
    pub fn dispatcher(&self) -> &Arc<HookDispatcher> {
        &self.dispatcher
    }

    /// The tool registry.
    #[must_use]
    pub fn tools(&self) -> &Registry<ToolDefinition> {
        &self.tools
    }

    /// The command registry.
    #[must_use]
    pub fn commands(&self) -> &Registry<CommandDefinition> {
        &self.commands
    }

    /// The provider registry.
    #[must_use]
    pub fn providers(&self) -> &Arc<ProviderRegistry> {
        &self.providers
    }

    /// The service registry.
    #[must_use]
    pub fn services(&self) -> &ServiceRegistry {
        &self.services
    }

    /// The HTTP route registry.
    #[must_use]
    pub fn http_routes(&self) -> &HttpRouteRegistry {
        &self.http_routes
    }

    /// The gateway method registry.
    #[must_use]
    pub fn gateway_methods(&self) -> &Registry<GatewayMethodDef> {
        &self.gateway_methods
    }

    /// The status indicator registry.
    #[must_use]
    pub fn status_indicators(&self) -> &StatusIndicatorRegistry {
        &self.status_indicators
    }

    /// The prompt assembler.
    #[must_use]
    pub fn prompt(&self) -> &PromptAssembler {
        &self.prompt
    }

    /// Plugin diagnostics recorded during activation.
    #[must_use]
    pub fn diagnostics(&self) -> Vec<PluginDiagnostic> {
        self.diagnostics
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Build a registration context for one plugin.
    #[must_use]
    pub fn plugin_context(self: &Arc<Self>, manifest: &PluginManifest) -> Arc<dyn PluginContext> {
        let plugin_config = self
            .config
            .plugins
            .entries
            .iter()
            .find(|entry| entry.id == manifest.id)
            .map(|entry| entry.config.clone())
            .unwrap_or(Value::Null);
        Arc::new(KernelPluginContext {
            kernel: Arc::clone(self),
            plugin_id: manifest.id.clone(),
            plugin_config,
        })
    }

    /// Load and activate discovered plugins, recording diagnostics.
    ///
    /// # Errors
    ///
    /// Propagates structural startup errors (invalid manifests,
    /// dependency cycles); per-plugin failures land in diagnostics.
    pub async fn load_plugins(
        self: &Arc<Self>,
        discovered: Vec<DiscoveredPlugin>,
    ) -> PluginResult<()> {
        let kernel = Arc::clone(self);
        let (loaded, diagnostics) = load_plugins(
            discovered,
            &self.config.plugins,
            move |manifest| kernel.plugin_context(manifest),
        )
        .await?;

        info!(
            loaded = loaded.len(),
            failed = diagnostics
                .iter()
                .filter(|d| d.status == PluginStatus::Failed)
                .count(),
            "Plugin activation complete"
        );
        *self.plugins.lock().unwrap_or_else(|e| e.into_inner()) = loaded;
        *self.diagnostics.lock().unwrap_or_else(|e| e.into_inner()) = diagnostics;
        Ok(())
    }

    /// Run a tool through its full hook envelope.
    ///
    /// `before_tool_call` may rewrite `args`; a missing tool yields a
    /// `TOOL_NOT_FOUND` result without dispatching `after_tool_call`; an
    /// executor failure becomes a `TOOL_EXECUTE_ERROR` result.
    pub async fn run_tool(&self, tool_id: &str, args: Value, ctx: &OpCtx) -> ToolResult {
        let Some(tool) = self.tools.get(tool_id) else {
            return ToolResult::failure(
                error_codes::TOOL_NOT_FOUND,
                format!("no tool registered as {tool_id}"),
            );
        };

        let invocation = self.invocation(HookEvent::BeforeToolCall, ctx);
        let before = self
            .dispatcher
            .dispatch(
                HookEvent::BeforeToolCall.domain(),
                &HookEvent::BeforeToolCall,
                json!({"toolId": tool_id, "args": args}),
                &invocation,
            )
            .await;
        let effective_args = before
            .final_payload
            .get("args")
            .cloned()
            .unwrap_or(Value::Null);

        let executor = Arc::clone(&tool.executor);
        let spawn_ctx = ctx.clone();
        let spawn_args = effective_args.clone();
        let result = match tokio::spawn(async move {
            executor.execute(spawn_args, &spawn_ctx).await
        })
        .await
        {
            Ok(result) => result,
            Err(e) => {
                warn!(tool_id, error = %e, "Tool executor panicked");
                ToolResult::failure(error_codes::TOOL_EXECUTE_ERROR, e.to_string())
            },
        };

        let invocation = self.invocation(HookEvent::AfterToolCall, ctx);
        let after_payload = json!({
            "toolId": tool_id,
            "args": effective_args,
            "ok": result.ok,
            "result": serde_json::to_value(&result).unwrap_or(Value::Null),
        });
        self.dispatcher
            .dispatch(
                HookEvent::AfterToolCall.domain(),
                &HookEvent::AfterToolCall,
                after_payload.clone(),
                &invocation,
            )
            .await;

        self.bus.publish(EventEnvelope::new(
            "tool:result",
            json!({"toolId": tool_id, "ok": result.ok}),
        ));

        let invocation = self.invocation(HookEvent::ToolResultPersist, ctx);
        self.dispatcher
            .dispatch(
                HookEvent::ToolResultPersist.domain(),
                &HookEvent::ToolResultPersist,
                after_payload,
                &invocation,
            )
            .await;

        result
    }

    /// Run a command. Unknown commands write to stderr and return 1.
    pub async fn run_command(&self, command_id: &str, args: Vec<String>, ctx: &OpCtx) -> i32 {
        let invocation = self.invocation(HookEvent::BeforeCommand, ctx);
        self.dispatcher
            .dispatch(
                HookEvent::BeforeCommand.domain(),
                &HookEvent::BeforeCommand,
                json!({"commandId": command_id, "args": args}),
                &invocation,
            )
            .await;

        let Some(command) = self.commands.get(command_id) else {
            eprintln!("slashbot: unknown command: {command_id}");
            return 1;
        };

        let exit_code = command.executor.execute(args.clone(), ctx).await;

        let invocation = self.invocation(HookEvent::AfterCommand, ctx);
        self.dispatcher
            .dispatch(
                HookEvent::AfterCommand.domain(),
                &HookEvent::AfterCommand,
                json!({"commandId": command_id, "args": args, "exitCode": exit_code}),
                &invocation,
            )
            .await;

        exit_code
    }

    /// Assemble the system prompt through its hook envelope.
    ///
    /// An `after_prompt_assemble` hook may replace the prompt by
    /// patching a string `prompt` field.
    pub async fn assemble_prompt(&self, ctx: &OpCtx) -> String {
        let invocation = self.invocation(HookEvent::BeforePromptAssemble, ctx);
        self.dispatcher
            .dispatch(
                HookEvent::BeforePromptAssemble.domain(),
                &HookEvent::BeforePromptAssemble,
                json!({}),
                &invocation,
            )
            .await;

        let prompt = self.prompt.assemble().await;

        let invocation = self.invocation(HookEvent::AfterPromptAssemble, ctx);
        let report = self
            .dispatcher
            .dispatch(
                HookEvent::AfterPromptAssemble.domain(),
                &HookEvent::AfterPromptAssemble,
                json!({"prompt": prompt}),
                &invocation,
            )
            .await;

        match report.final_payload.get("prompt").and_then(Value::as_str) {
            Some(patched) => patched.to_string(),
            None => prompt,
        }
    }

    /// Publish a message-lifecycle event and dispatch its hook with a
    /// 250 ms wall-clock budget. Past the budget a warning is logged and
    /// the dispatch finishes fire-and-forget; within it, the report is
    /// returned.
    pub async fn send_message_lifecycle(
        &self,
        event: HookEvent,
        session_id: &str,
        agent_id: &str,
        message: &slashbot_core::AgentMessage,
    ) -> Option<DispatchReport> {
        let payload = json!({
            "sessionId": session_id,
            "agentId": agent_id,
            "message": serde_json::to_value(message).unwrap_or(Value::Null),
        });

        self.bus.publish(EventEnvelope::new(
            format!("lifecycle:{event}"),
            payload.clone(),
        ));

        let dispatcher = Arc::clone(&self.dispatcher);
        let invocation = HookInvocation::new(event.clone())
            .with_session(session_id)
            .with_agent(agent_id);
        let domain = event.domain();
        let dispatch = tokio::spawn(async move {
            dispatcher.dispatch(domain, &event, payload, &invocation).await
        });

        match tokio::time::timeout(LIFECYCLE_DISPATCH_BUDGET, dispatch).await {
            Ok(Ok(report)) => Some(report),
            Ok(Err(e)) => {
                warn!(error = %e, "Lifecycle hook dispatch task failed");
                None
            },
            Err(_) => {
                warn!(
                    budget_ms = LIFECYCLE_DISPATCH_BUDGET.as_millis() as u64,
                    "Lifecycle hook dispatch exceeded budget, continuing fire-and-forget"
                );
                None
            },
        }
    }

    /// Start a session: persist metadata, publish, dispatch the
    /// `session_start` hook. Metadata write failure is non-fatal.
    pub async fn start_session(&self, session_id: &str, agent_id: &str) {
        let meta = SessionMeta::started(session_id, agent_id);
        if let Err(e) = meta.write(&self.home) {
            warn!(session_id, error = %e, "Failed to persist session metadata");
        }

        let payload = json!({"sessionId": session_id, "agentId": agent_id});
        self.bus.publish(EventEnvelope::new(
            "lifecycle:session_start",
            payload.clone(),
        ));
        let invocation = HookInvocation::new(HookEvent::SessionStart)
            .with_session(session_id)
            .with_agent(agent_id);
        self.dispatcher
            .dispatch(
                HookEvent::SessionStart.domain(),
                &HookEvent::SessionStart,
                payload,
                &invocation,
            )
            .await;
        debug!(session_id, agent_id, "Session started");
    }

    /// End a session: update metadata, publish, dispatch `session_end`.
    pub async fn end_session(&self, session_id: &str, agent_id: &str) {
        let mut meta = SessionMeta::read(&self.home, agent_id, session_id)
            .unwrap_or_else(|| SessionMeta::started(session_id, agent_id));
        meta.end();
        if let Err(e) = meta.write(&self.home) {
            warn!(session_id, error = %e, "Failed to persist session metadata");
        }

        let payload = json!({"sessionId": session_id, "agentId": agent_id});
        self.bus.publish(EventEnvelope::new(
            "lifecycle:session_end",
            payload.clone(),
        ));
        let invocation = HookInvocation::new(HookEvent::SessionEnd)
            .with_session(session_id)
            .with_agent(agent_id);
        self.dispatcher
            .dispatch(
                HookEvent::SessionEnd.domain(),
                &HookEvent::SessionEnd,
                payload,
                &invocation,
            )
            .await;
        debug!(session_id, agent_id, "Session ended");
    }

    /// Dispatch a kernel event (`startup` / `shutdown`).
    pub async fn dispatch_kernel_event(&self, event: HookEvent) -> DispatchReport {
        let invocation = HookInvocation::new(event.clone());
        self.dispatcher
            .dispatch(event.domain(), &event, json!({}), &invocation)
            .await
    }

    /// Host health: degraded when any plugin diagnostic is failed.
    #[must_use]
    pub fn health(&self) -> Health {
        let diagnostics = self.diagnostics();
        let failed = diagnostics
            .iter()
            .filter(|d| d.status == PluginStatus::Failed)
            .count();
        let status = if failed > 0 {
            HealthStatus::Degraded
        } else {
            HealthStatus::Ok
        };
        Health {
            status,
            details: json!({
                "tools": self.tools.len(),
                "commands": self.commands.len(),
                "providers": self.providers.len(),
                "services": self.services.len(),
                "gatewayMethods": self.gateway_methods.len(),
                "httpRoutes": self.http_routes.len(),
                "statusIndicators": self.status_indicators.len(),
                "hooks": self.dispatcher.len(),
                "pluginsLoaded": diagnostics.len() - failed,
                "pluginsFailed": failed,
            }),
        }
    }

    /// Deactivate all plugins in reverse activation order.
    pub async fn deactivate_plugins(&self) {
        let plugins = self
            .plugins
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        deactivate_all(&plugins).await;
    }

    fn invocation(&self, event: HookEvent, ctx: &OpCtx) -> HookInvocation {
        let mut invocation = HookInvocation::new(event).with_cancel(ctx.cancel.clone());
        invocation.session_id = ctx.session_id.clone();
        invocation.agent_id = ctx.agent_id.clone();
        invocation
    }
}

impl std::fmt::Debug for Kernel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Kernel")
            .field("tools", &self.tools.len())
            .field("commands", &self.commands.len())
            .field("hooks", &self.dispatcher.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use slashbot_core::AgentMessage;
    use slashbot_hooks::HookRegistration;
    use slashbot_plugins::ToolExecutor;

    struct EchoTool;

    #[async_trait]
    impl ToolExecutor for EchoTool {
        async fn execute(&self, args: Value, _ctx: &OpCtx) -> ToolResult {
            ToolResult::success(args.to_string())
        }
    }

    struct PanickyTool;

    #[async_trait]
    impl ToolExecutor for PanickyTool {
        async fn execute(&self, _args: Value, _ctx: &OpCtx) -> ToolResult {
            panic!("tool blew up")
        }
    }

    fn kernel() -> (Arc<Kernel>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let k = Kernel::new(SlashbotHome::at(dir.path()), RuntimeConfig::default());
        (k, dir)
    }

    fn tool(id: &str, executor: Arc<dyn ToolExecutor>) -> ToolDefinition {
        ToolDefinition {
            id: id.to_string(),
            plugin_id: "test".to_string(),
            title: None,
            description: "test tool".to_string(),
            parameters: json!({"type": "object"}),
            executor,
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn run_tool_applies_before_hook_arg_rewrites() {
        let (kernel, _dir) = kernel();
        kernel.tools().register(tool("echo", Arc::new(EchoTool))).unwrap();
        kernel.dispatcher().register(HookRegistration::new(
            "rewriter",
            HookEvent::BeforeToolCall,
            |_| async { Ok(Some(json!({"args": {"rewritten": true}}))) },
        ));

        let result = kernel
            .run_tool("echo", json!({"original": true}), &OpCtx::detached())
            .await;
        assert!(result.ok);
        assert!(result.llm_text().contains("rewritten"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn run_tool_missing_tool_short_circuits() {
        let (kernel, _dir) = kernel();
        let fired = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let flag = Arc::clone(&fired);
        kernel.dispatcher().register(HookRegistration::new(
            "watcher",
            HookEvent::AfterToolCall,
            move |_| {
                let flag = Arc::clone(&flag);
                async move {
                    flag.store(true, std::sync::atomic::Ordering::SeqCst);
                    Ok(None)
                }
            },
        ));

        let result = kernel
            .run_tool("ghost", json!({}), &OpCtx::detached())
            .await;
        assert!(!result.ok);
        assert_eq!(result.error.as_ref().unwrap().code, "TOOL_NOT_FOUND");
        // after_tool_call must not fire for a missing tool.
        assert!(!fired.load(std::sync::atomic::Ordering::SeqCst));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn run_tool_converts_panics_into_results() {
        let (kernel, _dir) = kernel();
        kernel
            .tools()
            .register(tool("bomb", Arc::new(PanickyTool)))
            .unwrap();

        let result = kernel.run_tool("bomb", json!({}), &OpCtx::detached()).await;
        assert!(!result.ok);
        assert_eq!(result.error.as_ref().unwrap().code, "TOOL_EXECUTE_ERROR");
    }

    #[tokio::test]
    async fn unknown_command_returns_one() {
        let (kernel, _dir) = kernel();
        let code = kernel
            .run_command("nope", vec![], &OpCtx::detached())
            .await;
        assert_eq!(code, 1);
    }

    #[tokio::test]
    async fn lifecycle_dispatch_respects_the_250ms_budget() {
        let (kernel, _dir) = kernel();
        kernel.dispatcher().register(HookRegistration::new(
            "slow",
            HookEvent::MessageReceived,
            |_| async {
                tokio::time::sleep(Duration::from_secs(10)).await;
                Ok(None)
            },
        ));

        let started = std::time::Instant::now();
        let report = kernel
            .send_message_lifecycle(
                HookEvent::MessageReceived,
                "s-1",
                "main",
                &AgentMessage::user("hi"),
            )
            .await;
        assert!(report.is_none());
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn fast_lifecycle_dispatch_returns_the_report() {
        let (kernel, _dir) = kernel();
        kernel.dispatcher().register(HookRegistration::new(
            "fast",
            HookEvent::MessageSent,
            |_| async { Ok(Some(json!({"seen": true}))) },
        ));

        let report = kernel
            .send_message_lifecycle(
                HookEvent::MessageSent,
                "s-1",
                "main",
                &AgentMessage::assistant("done"),
            )
            .await
            .unwrap();
        assert_eq!(report.final_payload["seen"], true);
    }

    #[tokio::test]
    async fn sessions_persist_and_emit() {
        let dir = tempfile::tempdir().unwrap();
        let home = SlashbotHome::at(dir.path());
        let kernel = Kernel::new(home.clone(), RuntimeConfig::default());

        let mut receiver = kernel.bus().subscribe();
        kernel.start_session("s-1", "main").await;
        let meta = SessionMeta::read(&home, "main", "s-1").unwrap();
        assert_eq!(meta.status, crate::session::SessionStatus::Active);

        let event = receiver.recv().await.unwrap();
        assert_eq!(event.event_type, "lifecycle:session_start");

        kernel.end_session("s-1", "main").await;
        let meta = SessionMeta::read(&home, "main", "s-1").unwrap();
        assert_eq!(meta.status, crate::session::SessionStatus::Ended);
    }

    #[tokio::test]
    async fn health_reflects_plugin_failures() {
        let (kernel, _dir) = kernel();
        assert_eq!(kernel.health().status, HealthStatus::Ok);

        kernel
            .diagnostics
            .lock()
            .unwrap()
            .push(PluginDiagnostic {
                plugin_id: "bad".into(),
                status: PluginStatus::Failed,
                reason: Some("setup failed".into()),
                source_path: "<builtin>".into(),
            });
        let health = kernel.health();
        assert_eq!(health.status, HealthStatus::Degraded);
        assert_eq!(health.details["pluginsFailed"], 1);
    }

    #[tokio::test]
    async fn assemble_prompt_allows_after_hook_rewrites() {
        let (kernel, _dir) = kernel();
        kernel.prompt().set_core_prompt("CORE");
        kernel.dispatcher().register(HookRegistration::new(
            "rewriter",
            HookEvent::AfterPromptAssemble,
            |payload| async move {
                let prompt = payload["prompt"].as_str().unwrap_or_default();
                Ok(Some(json!({"prompt": format!("{prompt}\n\nEXTRA")})))
            },
        ));

        let prompt = kernel.assemble_prompt(&OpCtx::detached()).await;
        assert_eq!(prompt, "CORE\n\nEXTRA");
    }
}
