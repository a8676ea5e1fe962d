//! Runtime configuration types.
//!
//! Field names follow the on-disk camelCase contract of
//! `.slashbot/config.json`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// Validated, layered runtime configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RuntimeConfig {
    /// Gateway server settings.
    pub gateway: GatewayConfig,
    /// Plugin discovery and enablement.
    pub plugins: PluginsConfig,
    /// Provider selection.
    pub providers: ProvidersConfig,
    /// Hook defaults and config-declared rules.
    pub hooks: HooksConfig,
    /// Command execution safety policy.
    pub command_safety: CommandSafetyConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Gateway server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GatewayConfig {
    /// Bind host.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// Bearer token required on `/rpc`. Unset means the gateway rejects
    /// every RPC call.
    pub auth_token: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 4370,
            auth_token: None,
        }
    }
}

/// Plugin discovery and enablement.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PluginsConfig {
    /// If non-empty, only these plugin ids load.
    pub allow: Vec<String>,
    /// Plugin ids that never load.
    pub deny: Vec<String>,
    /// Per-plugin settings.
    pub entries: Vec<PluginEntry>,
    /// Extra plugin directories. Extends (deduped) across config layers.
    pub paths: Vec<PathBuf>,
}

/// Per-plugin settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginEntry {
    /// Plugin id.
    pub id: String,
    /// Whether the plugin loads (default true).
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Opaque plugin-specific config.
    #[serde(default)]
    pub config: Value,
}

fn default_enabled() -> bool {
    true
}

/// Provider selection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProvidersConfig {
    /// The active provider, if one is configured.
    pub active: Option<ActiveProvider>,
}

/// The configured active provider and model.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveProvider {
    /// Provider id.
    pub provider_id: String,
    /// Model id.
    pub model_id: String,
    /// Inline API key (discouraged; profiles are preferred).
    #[serde(default)]
    pub api_key: Option<String>,
}

/// Hook defaults and config-declared rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HooksConfig {
    /// Default per-hook timeout in milliseconds.
    pub default_timeout_ms: u64,
    /// Config-declared hooks, keyed by event name.
    pub rules: BTreeMap<String, Vec<HookRule>>,
}

impl Default for HooksConfig {
    fn default() -> Self {
        Self {
            default_timeout_ms: 5_000,
            rules: BTreeMap::new(),
        }
    }
}

/// One config-declared hook rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HookRule {
    /// Optional matcher compared against the event's match field
    /// (e.g. `toolId` for tool events).
    #[serde(default)]
    pub matcher: Option<String>,
    /// Actions to register for this rule.
    pub hooks: Vec<HookAction>,
}

/// An action a config-declared hook performs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum HookAction {
    /// Execute a shell command.
    Command {
        /// The command line, run through the shell.
        command: String,
        /// Per-action timeout override.
        #[serde(default, rename = "timeoutMs")]
        timeout_ms: Option<u64>,
    },
}

/// Command execution safety policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CommandSafetyConfig {
    /// Default command timeout in milliseconds.
    pub default_timeout_ms: u64,
    /// Command prefixes that require approval.
    pub risky_commands: Vec<String>,
    /// Whether risky commands always prompt.
    pub require_explicit_approval: bool,
}

impl Default for CommandSafetyConfig {
    fn default() -> Self {
        Self {
            default_timeout_ms: 60_000,
            risky_commands: Vec::new(),
            require_explicit_approval: true,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingConfig {
    /// Minimum level emitted.
    pub level: LogLevel,
}

/// Log level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Debug and above.
    Debug,
    /// Info and above.
    #[default]
    Info,
    /// Warnings and errors.
    Warn,
    /// Errors only.
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Debug => write!(f, "debug"),
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}
