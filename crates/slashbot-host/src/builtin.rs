//! Bundled plugins shipped with the host.
//!
//! `core-gateway` exposes the kernel's introspection surface over RPC so
//! external processes can drive the host without any third-party plugin
//! installed.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use slashbot_kernel::Kernel;
use slashbot_plugins::{
    safe_register, DiscoveredPlugin, GatewayError, GatewayMethodDef, GatewayMethodHandler,
    Plugin, PluginContext, PluginManifest, PluginResult,
};

/// All bundled plugins, ready for the loader.
pub fn bundled_plugins(kernel: &Arc<Kernel>) -> Vec<DiscoveredPlugin> {
    let manifest = PluginManifest::builtin("core-gateway", "Core Gateway Methods", "0.1.0");
    let kernel = Arc::clone(kernel);
    vec![DiscoveredPlugin::builtin(
        manifest.clone(),
        Arc::new(move || {
            Ok(Box::new(CoreGatewayPlugin {
                manifest: manifest.clone(),
                kernel: Arc::clone(&kernel),
            }) as Box<dyn Plugin>)
        }),
    )]
}

struct CoreGatewayPlugin {
    manifest: PluginManifest,
    kernel: Arc<Kernel>,
}

#[async_trait]
impl Plugin for CoreGatewayPlugin {
    fn manifest(&self) -> &PluginManifest {
        &self.manifest
    }

    async fn setup(&self, context: &dyn PluginContext) -> PluginResult<()> {
        let plugin_id = context.plugin_id().to_string();
        let methods: Vec<(&str, Arc<dyn GatewayMethodHandler>)> = vec![
            (
                "kernel.health",
                Arc::new(HealthMethod {
                    kernel: Arc::clone(&self.kernel),
                }),
            ),
            (
                "tools.list",
                Arc::new(ToolsList {
                    kernel: Arc::clone(&self.kernel),
                }),
            ),
            (
                "commands.list",
                Arc::new(CommandsList {
                    kernel: Arc::clone(&self.kernel),
                }),
            ),
            (
                "providers.list",
                Arc::new(ProvidersList {
                    kernel: Arc::clone(&self.kernel),
                }),
            ),
            (
                "status.list",
                Arc::new(StatusList {
                    kernel: Arc::clone(&self.kernel),
                }),
            ),
        ];

        for (name, handler) in methods {
            safe_register(&format!("gateway method {name}"), || {
                context.register_gateway_method(GatewayMethodDef {
                    name: name.to_string(),
                    plugin_id: plugin_id.clone(),
                    handler,
                })
            });
        }
        Ok(())
    }
}

struct HealthMethod {
    kernel: Arc<Kernel>,
}

#[async_trait]
impl GatewayMethodHandler for HealthMethod {
    async fn call(&self, _params: Value) -> Result<Value, GatewayError> {
        serde_json::to_value(self.kernel.health())
            .map_err(|e| GatewayError::new("INTERNAL", e.to_string()))
    }
}

struct ToolsList {
    kernel: Arc<Kernel>,
}

#[async_trait]
impl GatewayMethodHandler for ToolsList {
    async fn call(&self, _params: Value) -> Result<Value, GatewayError> {
        let tools: Vec<Value> = self
            .kernel
            .tools()
            .list()
            .into_iter()
            .map(|t| {
                json!({
                    "id": t.id,
                    "pluginId": t.plugin_id,
                    "title": t.title,
                    "description": t.description,
                    "parameters": t.parameters,
                })
            })
            .collect();
        Ok(Value::Array(tools))
    }
}

struct CommandsList {
    kernel: Arc<Kernel>,
}

#[async_trait]
impl GatewayMethodHandler for CommandsList {
    async fn call(&self, _params: Value) -> Result<Value, GatewayError> {
        let commands: Vec<Value> = self
            .kernel
            .commands()
            .list()
            .into_iter()
            .map(|c| {
                json!({
                    "id": c.id,
                    "pluginId": c.plugin_id,
                    "description": c.description,
                    "subcommands": c.subcommands,
                })
            })
            .collect();
        Ok(Value::Array(commands))
    }
}

struct ProvidersList {
    kernel: Arc<Kernel>,
}

#[async_trait]
impl GatewayMethodHandler for ProvidersList {
    async fn call(&self, _params: Value) -> Result<Value, GatewayError> {
        let providers: Vec<Value> = self
            .kernel
            .providers()
            .list()
            .into_iter()
            .map(|entry| {
                serde_json::to_value(&entry.definition).unwrap_or(Value::Null)
            })
            .collect();
        Ok(Value::Array(providers))
    }
}

struct StatusList {
    kernel: Arc<Kernel>,
}

#[async_trait]
impl GatewayMethodHandler for StatusList {
    async fn call(&self, _params: Value) -> Result<Value, GatewayError> {
        let indicators: Vec<Value> = self
            .kernel
            .status_indicators()
            .list()
            .into_iter()
            .map(|(def, status)| {
                json!({
                    "id": def.id,
                    "label": def.label,
                    "priority": def.priority,
                    "status": status,
                })
            })
            .collect();
        Ok(Value::Array(indicators))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slashbot_config::RuntimeConfig;
    use slashbot_core::SlashbotHome;

    #[tokio::test]
    async fn core_gateway_plugin_registers_its_methods() {
        let dir = tempfile::tempdir().unwrap();
        let kernel = Kernel::new(SlashbotHome::at(dir.path()), RuntimeConfig::default());

        kernel
            .load_plugins(bundled_plugins(&kernel))
            .await
            .unwrap();

        assert!(kernel.gateway_methods().get("kernel.health").is_some());
        assert!(kernel.gateway_methods().get("tools.list").is_some());
        assert_eq!(kernel.health().details["pluginsFailed"], 0);

        let method = kernel.gateway_methods().get("kernel.health").unwrap();
        let health = method.handler.call(Value::Null).await.unwrap();
        assert_eq!(health["status"], "ok");
    }
}
