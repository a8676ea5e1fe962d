//! Plugin manifests and diagnostics.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{PluginError, PluginResult};

/// A plugin's manifest. Immutable for a process lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginManifest {
    /// Unique plugin id, `[a-z0-9_-]`.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Version string.
    pub version: String,
    /// Entry point: the registered constructor name.
    pub main: String,
    /// Plugin ids that must activate before this one.
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Human-readable description.
    #[serde(default)]
    pub description: Option<String>,
    /// Activation tie-break (lower activates first, default 100).
    #[serde(default = "default_priority")]
    pub priority: i32,
}

fn default_priority() -> i32 {
    100
}

impl PluginManifest {
    /// Minimal manifest for a compiled-in plugin.
    pub fn builtin(id: impl Into<String>, name: impl Into<String>, version: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            main: id.clone(),
            id,
            name: name.into(),
            version: version.into(),
            dependencies: Vec::new(),
            description: None,
            priority: 100,
        }
    }

    /// Add dependencies.
    #[must_use]
    pub fn with_dependencies(mut self, dependencies: Vec<String>) -> Self {
        self.dependencies = dependencies;
        self
    }

    /// Set the activation priority.
    #[must_use]
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Validate the manifest.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::InvalidManifest`] on empty fields or an id
    /// outside `[a-z0-9_-]`.
    pub fn validate(&self) -> PluginResult<()> {
        let invalid = |message: &str| PluginError::InvalidManifest {
            plugin_id: self.id.clone(),
            message: message.to_string(),
        };
        if self.id.is_empty() {
            return Err(invalid("id must be non-empty"));
        }
        if !self
            .id
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
        {
            return Err(invalid("id must match [a-z0-9_-]"));
        }
        if self.name.trim().is_empty() {
            return Err(invalid("name must be non-empty"));
        }
        if self.version.trim().is_empty() {
            return Err(invalid("version must be non-empty"));
        }
        if self.main.trim().is_empty() {
            return Err(invalid("main must be non-empty"));
        }
        Ok(())
    }
}

/// Load status of one discovered plugin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PluginStatus {
    /// Setup (and activate, when present) completed.
    Loaded,
    /// The plugin threw during instantiation, setup, or activation.
    Failed,
}

/// One diagnostic per discovered plugin, produced during activation and
/// never mutated after.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginDiagnostic {
    /// The plugin.
    pub plugin_id: String,
    /// Outcome.
    pub status: PluginStatus,
    /// Failure reason, when failed.
    #[serde(default)]
    pub reason: Option<String>,
    /// Where the plugin came from.
    pub source_path: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_manifest_validates() {
        let manifest = PluginManifest::builtin("telegram", "Telegram", "1.0.0");
        assert!(manifest.validate().is_ok());
        assert_eq!(manifest.main, "telegram");
        assert_eq!(manifest.priority, 100);
    }

    #[test]
    fn bad_ids_are_rejected() {
        for id in ["", "Has Caps", "with.dot", "spa ce"] {
            let manifest = PluginManifest::builtin(id, "X", "1.0.0");
            assert!(manifest.validate().is_err(), "id {id:?} should be invalid");
        }
    }

    #[test]
    fn manifest_parses_from_json() {
        let manifest: PluginManifest = serde_json::from_value(serde_json::json!({
            "id": "wallet",
            "name": "Wallet",
            "version": "0.3.0",
            "main": "wallet",
            "dependencies": ["telegram"],
            "priority": 10
        }))
        .unwrap();
        assert_eq!(manifest.dependencies, vec!["telegram"]);
        assert_eq!(manifest.priority, 10);
    }
}
