//! Config file discovery and layered loading.

use std::path::Path;

use serde_json::Value;
use tracing::{debug, info};

use slashbot_core::{SlashbotHome, WorkspaceDir};

use crate::error::{ConfigError, ConfigResult};
use crate::merge::deep_merge;
use crate::types::RuntimeConfig;
use crate::validate;

/// Maximum allowed config file size (1 MB).
const MAX_CONFIG_FILE_SIZE: usize = 1_048_576;

/// Load the unified configuration with layered file precedence.
///
/// Layers, later wins: built-in defaults ← user (`~/.slashbot/config.json`)
/// ← cwd (`$CWD/.slashbot/config.json`) ← workspace. The cwd layer is
/// skipped when it resolves to the same file as the workspace layer.
///
/// # Errors
///
/// Returns a [`ConfigError`] if any present config file is malformed, or
/// if the merged configuration fails validation.
pub fn load(home: &SlashbotHome, workspace_root: Option<&Path>) -> ConfigResult<RuntimeConfig> {
    let mut merged = serde_json::to_value(RuntimeConfig::default()).map_err(|e| {
        ConfigError::Parse {
            path: "<defaults>".to_string(),
            source: e,
        }
    })?;

    let user_path = home.config_file();
    if let Some(overlay) = try_load_file(&user_path)? {
        deep_merge(&mut merged, &overlay);
        info!(path = %user_path.display(), "loaded user config");
    }

    let workspace_config = workspace_root.map(|root| WorkspaceDir::new(root).config_file());

    if let Ok(cwd) = std::env::current_dir() {
        let cwd_path = WorkspaceDir::new(&cwd).config_file();
        let shadowed = workspace_config.as_deref() == Some(cwd_path.as_path());
        if !shadowed {
            if let Some(overlay) = try_load_file(&cwd_path)? {
                deep_merge(&mut merged, &overlay);
                info!(path = %cwd_path.display(), "loaded cwd config");
            }
        }
    }

    if let Some(ws_path) = workspace_config {
        if let Some(overlay) = try_load_file(&ws_path)? {
            deep_merge(&mut merged, &overlay);
            info!(path = %ws_path.display(), "loaded workspace config");
        }
    }

    let config: RuntimeConfig =
        serde_json::from_value(merged).map_err(|e| ConfigError::Parse {
            path: "<merged config>".to_string(),
            source: e,
        })?;

    validate::validate(&config)?;
    Ok(config)
}

/// Load a config from a specific file path (no layering).
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file cannot be read or parsed, or
/// fails validation.
pub fn load_file(path: &Path) -> ConfigResult<RuntimeConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
        path: path.display().to_string(),
        source: e,
    })?;
    let config: RuntimeConfig =
        serde_json::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            source: e,
        })?;
    validate::validate(&config)?;
    Ok(config)
}

/// Try to load a file, returning `None` if it doesn't exist.
///
/// Uses a single read operation to avoid TOCTOU races (no separate
/// exists/metadata checks before reading).
fn try_load_file(path: &Path) -> ConfigResult<Option<Value>> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "config file not found, skipping");
            return Ok(None);
        },
        Err(e) => {
            return Err(ConfigError::Read {
                path: path.display().to_string(),
                source: e,
            });
        },
    };

    if content.len() > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::Invalid {
            field: path.display().to_string(),
            message: format!(
                "config file is {} bytes, exceeding the {MAX_CONFIG_FILE_SIZE} byte limit",
                content.len()
            ),
        });
    }

    let value: Value = serde_json::from_str(&content).map_err(|e| ConfigError::Parse {
        path: path.display().to_string(),
        source: e,
    })?;

    Ok(Some(value))
}
