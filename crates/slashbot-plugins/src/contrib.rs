//! Contribution types plugins register through the context.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use slashbot_core::{OpCtx, ToolResult};

/// Executes a tool.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    /// Run the tool with the given arguments.
    async fn execute(&self, args: Value, ctx: &OpCtx) -> ToolResult;
}

/// A tool contributed to the kernel.
#[derive(Clone)]
pub struct ToolDefinition {
    /// Tool id, unique across the host.
    pub id: String,
    /// Plugin that contributed the tool.
    pub plugin_id: String,
    /// Short title for user surfaces.
    pub title: Option<String>,
    /// Description offered to the model.
    pub description: String,
    /// JSON Schema for the tool's arguments.
    pub parameters: Value,
    /// The implementation.
    pub executor: Arc<dyn ToolExecutor>,
}

impl std::fmt::Debug for ToolDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolDefinition")
            .field("id", &self.id)
            .field("plugin_id", &self.plugin_id)
            .finish()
    }
}

/// Executes a command.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Run the command, returning its exit code.
    async fn execute(&self, args: Vec<String>, ctx: &OpCtx) -> i32;
}

/// A slash command contributed to the kernel.
#[derive(Clone)]
pub struct CommandDefinition {
    /// Command id, unique across the host.
    pub id: String,
    /// Plugin that contributed the command.
    pub plugin_id: String,
    /// Description for help surfaces.
    pub description: String,
    /// Subcommand names, when the command has any.
    pub subcommands: Vec<String>,
    /// The implementation.
    pub executor: Arc<dyn CommandExecutor>,
}

impl std::fmt::Debug for CommandDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandDefinition")
            .field("id", &self.id)
            .field("plugin_id", &self.plugin_id)
            .finish()
    }
}

/// Error returned by gateway methods and HTTP routes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayError {
    /// Stable error code.
    pub code: String,
    /// Human-readable message.
    pub message: String,
}

impl GatewayError {
    /// Create an error.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for GatewayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

/// Handles one gateway RPC method.
#[async_trait]
pub trait GatewayMethodHandler: Send + Sync {
    /// Run the method.
    async fn call(&self, params: Value) -> Result<Value, GatewayError>;
}

/// A gateway RPC method contributed to the kernel.
#[derive(Clone)]
pub struct GatewayMethodDef {
    /// Method name, e.g. `sessions.list`.
    pub name: String,
    /// Plugin that contributed the method.
    pub plugin_id: String,
    /// The implementation. Runs in-process with full access to whatever
    /// services the plugin closure captured.
    pub handler: Arc<dyn GatewayMethodHandler>,
}

impl std::fmt::Debug for GatewayMethodDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayMethodDef")
            .field("name", &self.name)
            .field("plugin_id", &self.plugin_id)
            .finish()
    }
}

/// An extra HTTP route contributed to the gateway. JSON in, JSON out.
#[derive(Clone)]
pub struct HttpRouteDef {
    /// HTTP method, uppercase.
    pub method: String,
    /// Path, e.g. `/telegram/webhook`.
    pub path: String,
    /// Plugin that contributed the route.
    pub plugin_id: String,
    /// Whether the route requires the gateway bearer token (default true).
    pub requires_auth: bool,
    /// The implementation; receives the request body as JSON.
    pub handler: Arc<dyn GatewayMethodHandler>,
}

impl std::fmt::Debug for HttpRouteDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpRouteDef")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("plugin_id", &self.plugin_id)
            .field("requires_auth", &self.requires_auth)
            .finish()
    }
}

/// A status indicator contributed to the kernel.
#[derive(Debug, Clone)]
pub struct StatusIndicatorDef {
    /// Indicator id.
    pub id: String,
    /// Plugin that contributed the indicator.
    pub plugin_id: String,
    /// Label for user surfaces.
    pub label: String,
    /// Display ordering (lower first, default 100).
    pub priority: i32,
    /// Initial status value.
    pub initial: Value,
}
