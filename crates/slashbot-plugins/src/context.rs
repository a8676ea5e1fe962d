//! The registration context handed to plugin `setup`.
//!
//! Instead of a wide kernel handle, plugins get narrow capabilities, one
//! per contribution kind. The kernel implements this trait over its
//! registries.

use std::any::Any;
use std::sync::Arc;

use serde_json::Value;
use tracing::warn;

use slashbot_hooks::HookRegistration;
use slashbot_llm::{CompletionConfig, ProviderDefinition, ProviderFactory};

use crate::contrib::{
    CommandDefinition, GatewayMethodDef, HttpRouteDef, StatusIndicatorDef, ToolDefinition,
};
use crate::error::PluginResult;

/// Narrow registration capabilities exposed to plugin `setup`.
pub trait PluginContext: Send + Sync {
    /// The plugin this context was built for.
    fn plugin_id(&self) -> &str;

    /// The plugin's `config` entry from `plugins.entries`, `Null` when
    /// absent.
    fn plugin_config(&self) -> Value;

    /// Register a tool.
    ///
    /// # Errors
    ///
    /// Fails on a duplicate tool id.
    fn register_tool(&self, tool: ToolDefinition) -> PluginResult<()>;

    /// Register a command.
    ///
    /// # Errors
    ///
    /// Fails on a duplicate command id.
    fn register_command(&self, command: CommandDefinition) -> PluginResult<()>;

    /// Register an LLM provider.
    ///
    /// # Errors
    ///
    /// Fails on a duplicate provider id.
    fn register_provider(
        &self,
        definition: ProviderDefinition,
        factory: ProviderFactory,
        default_config: CompletionConfig,
    ) -> PluginResult<()>;

    /// Register a hook.
    fn register_hook(&self, registration: HookRegistration);

    /// Register an opaque service object.
    ///
    /// # Errors
    ///
    /// Fails on a duplicate service id.
    fn register_service(
        &self,
        id: &str,
        service: Arc<dyn Any + Send + Sync>,
    ) -> PluginResult<()>;

    /// Register a gateway RPC method.
    ///
    /// # Errors
    ///
    /// Fails on a duplicate method name.
    fn register_gateway_method(&self, method: GatewayMethodDef) -> PluginResult<()>;

    /// Register an extra HTTP route.
    ///
    /// # Errors
    ///
    /// Fails on a duplicate `(method, path)` pair.
    fn register_http_route(&self, route: HttpRouteDef) -> PluginResult<()>;

    /// Register a status indicator.
    ///
    /// # Errors
    ///
    /// Fails on a duplicate indicator id.
    fn register_status_indicator(&self, indicator: StatusIndicatorDef) -> PluginResult<()>;
}

/// Outcome of one guarded registration.
#[derive(Debug, Clone)]
pub struct RegisterOutcome {
    /// Whether the registration succeeded.
    pub ok: bool,
    /// Failure reason when it did not.
    pub reason: Option<String>,
}

/// Run one registration, logging and absorbing its error so one bad
/// contribution never aborts a plugin's remaining contributions.
pub fn safe_register<F>(label: &str, f: F) -> RegisterOutcome
where
    F: FnOnce() -> PluginResult<()>,
{
    match f() {
        Ok(()) => RegisterOutcome {
            ok: true,
            reason: None,
        },
        Err(e) => {
            warn!(label, error = %e, "Registration failed, continuing");
            RegisterOutcome {
                ok: false,
                reason: Some(e.to_string()),
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PluginError;

    #[test]
    fn safe_register_absorbs_errors() {
        let ok = safe_register("tool good.echo", || Ok(()));
        assert!(ok.ok);
        assert!(ok.reason.is_none());

        let failed = safe_register("tool dup.echo", || {
            Err(PluginError::AlreadyRegistered("dup.echo".into()))
        });
        assert!(!failed.ok);
        assert!(failed.reason.unwrap().contains("dup.echo"));
    }
}
