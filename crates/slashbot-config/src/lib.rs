//! Slashbot Config - layered JSON configuration.
//!
//! Implements the `load()` algorithm:
//! 1. Serialize built-in defaults → base
//! 2. Merge `~/.slashbot/config.json` (user)
//! 3. Merge `$CWD/.slashbot/config.json` (cwd)
//! 4. Merge `{workspace}/.slashbot/config.json` (workspace)
//! 5. Deserialize merged tree → [`RuntimeConfig`]
//! 6. Validate
//!
//! Objects merge recursively; scalars and arrays from a later layer
//! replace earlier values — except `plugins.paths`, which extends with
//! dedupe so every layer can contribute plugin directories.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

mod error;
pub mod fs;
mod loader;
mod merge;
mod types;
mod validate;

pub use error::{ConfigError, ConfigResult};
pub use loader::{load, load_file};
pub use merge::deep_merge;
pub use types::{
    ActiveProvider, CommandSafetyConfig, GatewayConfig, HookAction, HookRule, HooksConfig,
    LogLevel, LoggingConfig, PluginEntry, PluginsConfig, ProvidersConfig, RuntimeConfig,
};
pub use validate::validate;
