//! The kernel's implementation of the plugin registration context.

use std::any::Any;
use std::sync::Arc;

use serde_json::Value;

use slashbot_hooks::HookRegistration;
use slashbot_llm::{CompletionConfig, ProviderDefinition, ProviderFactory};
use slashbot_plugins::{
    CommandDefinition, GatewayMethodDef, HttpRouteDef, PluginContext, PluginError, PluginResult,
    StatusIndicatorDef, ToolDefinition,
};

use crate::error::KernelError;
use crate::kernel::Kernel;

/// Per-plugin registration context over the kernel's registries.
pub(crate) struct KernelPluginContext {
    pub(crate) kernel: Arc<Kernel>,
    pub(crate) plugin_id: String,
    pub(crate) plugin_config: Value,
}

fn to_plugin_error(e: KernelError) -> PluginError {
    match e {
        KernelError::AlreadyRegistered { id, .. } => PluginError::AlreadyRegistered(id),
        other => PluginError::PluginFailed {
            plugin_id: String::new(),
            message: other.to_string(),
        },
    }
}

impl PluginContext for KernelPluginContext {
    fn plugin_id(&self) -> &str {
        &self.plugin_id
    }

    fn plugin_config(&self) -> Value {
        self.plugin_config.clone()
    }

    fn register_tool(&self, tool: ToolDefinition) -> PluginResult<()> {
        self.kernel.tools().register(tool).map_err(to_plugin_error)
    }

    fn register_command(&self, command: CommandDefinition) -> PluginResult<()> {
        self.kernel
            .commands()
            .register(command)
            .map_err(to_plugin_error)
    }

    fn register_provider(
        &self,
        definition: ProviderDefinition,
        factory: ProviderFactory,
        default_config: CompletionConfig,
    ) -> PluginResult<()> {
        self.kernel
            .providers()
            .register(definition, factory, default_config)
            .map_err(|e| match e {
                slashbot_llm::LlmError::AlreadyRegistered(id) => {
                    PluginError::AlreadyRegistered(id)
                },
                other => PluginError::PluginFailed {
                    plugin_id: self.plugin_id.clone(),
                    message: other.to_string(),
                },
            })
    }

    fn register_hook(&self, registration: HookRegistration) {
        self.kernel.dispatcher().register(registration);
    }

    fn register_service(
        &self,
        id: &str,
        service: Arc<dyn Any + Send + Sync>,
    ) -> PluginResult<()> {
        self.kernel
            .services()
            .register(id, &self.plugin_id, service)
            .map_err(to_plugin_error)
    }

    fn register_gateway_method(&self, method: GatewayMethodDef) -> PluginResult<()> {
        self.kernel
            .gateway_methods()
            .register(method)
            .map_err(to_plugin_error)
    }

    fn register_http_route(&self, route: HttpRouteDef) -> PluginResult<()> {
        self.kernel
            .http_routes()
            .register(route)
            .map_err(to_plugin_error)
    }

    fn register_status_indicator(&self, indicator: StatusIndicatorDef) -> PluginResult<()> {
        self.kernel
            .status_indicators()
            .register(indicator)
            .map_err(to_plugin_error)
    }
}
