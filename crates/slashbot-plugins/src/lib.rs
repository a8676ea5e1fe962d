//! Slashbot Plugins - manifests, dependency ordering, and the loader.
//!
//! Plugins contribute tools, commands, providers, hooks, services,
//! gateway methods, HTTP routes, and status indicators through a narrow
//! registration context ([`PluginContext`]) handed to their `setup`. The
//! loader validates manifests, rejects dependency cycles at startup, and
//! isolates per-plugin failures so one broken plugin never takes down its
//! siblings.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

mod context;
mod contrib;
mod error;
mod graph;
mod loader;
mod manifest;
mod plugin;

pub use context::{safe_register, PluginContext, RegisterOutcome};
pub use contrib::{
    CommandDefinition, CommandExecutor, GatewayError, GatewayMethodDef, GatewayMethodHandler,
    HttpRouteDef, StatusIndicatorDef, ToolDefinition, ToolExecutor,
};
pub use error::{PluginError, PluginResult};
pub use graph::activation_order;
pub use loader::{
    deactivate_all, discover_manifest_plugins, load_plugins, DiscoveredPlugin, LoadedPlugin,
    PluginFactory,
};
pub use manifest::{PluginDiagnostic, PluginManifest, PluginStatus};
pub use plugin::Plugin;
