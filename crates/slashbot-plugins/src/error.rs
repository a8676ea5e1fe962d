//! Plugin error types.

use thiserror::Error;

/// Errors raised by the plugin substrate.
#[derive(Debug, Error)]
pub enum PluginError {
    /// A manifest failed validation. Startup-fatal.
    #[error("invalid manifest for {plugin_id}: {message}")]
    InvalidManifest {
        /// The offending plugin.
        plugin_id: String,
        /// What went wrong.
        message: String,
    },

    /// The dependency graph contains at least one cycle. Startup-fatal.
    #[error("plugin dependency cycle involving: {}", ids.join(", "))]
    DependencyCycle {
        /// Every id on a cycle, ascending.
        ids: Vec<String>,
    },

    /// An entry with this id already exists in the target registry.
    #[error("already registered: {0}")]
    AlreadyRegistered(String),

    /// A manifest references an unknown constructor.
    #[error("unknown plugin constructor: {0}")]
    UnknownConstructor(String),

    /// A plugin failed during instantiation, setup, or activation.
    #[error("plugin {plugin_id} failed: {message}")]
    PluginFailed {
        /// The failing plugin.
        plugin_id: String,
        /// What went wrong.
        message: String,
    },

    /// A manifest file could not be read or parsed.
    #[error("failed to load manifest {path}: {message}")]
    ManifestRead {
        /// The offending path.
        path: String,
        /// What went wrong.
        message: String,
    },
}

/// Result type for plugin operations.
pub type PluginResult<T> = Result<T, PluginError>;
