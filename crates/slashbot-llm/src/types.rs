//! Provider and model definitions.

use serde::{Deserialize, Serialize};
use slashbot_core::AuthMethod;

/// A provider contributed by a plugin (or built in).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderDefinition {
    /// Provider id, e.g. `anthropic`.
    pub id: String,
    /// Plugin that contributed the provider.
    pub plugin_id: String,
    /// Human-readable name.
    pub display_name: String,
    /// Models this provider serves.
    pub models: Vec<ModelDefinition>,
    /// Auth methods the provider can handle.
    pub auth_handlers: Vec<AuthMethod>,
    /// Preference order used when ranking stored profiles.
    pub preferred_auth_order: Vec<AuthMethod>,
}

impl ProviderDefinition {
    /// The provider's default model: highest `priority`, ties broken by
    /// declaration order.
    #[must_use]
    pub fn default_model(&self) -> Option<&ModelDefinition> {
        self.models
            .iter()
            .enumerate()
            .min_by_key(|(idx, m)| (std::cmp::Reverse(m.priority), *idx))
            .map(|(_, m)| m)
    }

    /// Look up a model by id.
    #[must_use]
    pub fn model(&self, model_id: &str) -> Option<&ModelDefinition> {
        self.models.iter().find(|m| m.id == model_id)
    }
}

/// One model served by a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelDefinition {
    /// Model id, e.g. `claude-sonnet-4-20250514`.
    pub id: String,
    /// Human-readable name.
    pub display_name: String,
    /// Context window in tokens.
    pub context_window: usize,
    /// Selection priority (higher preferred, default 0).
    #[serde(default)]
    pub priority: i32,
    /// Capability tags, e.g. `tools`, `vision`.
    #[serde(default)]
    pub capabilities: Vec<String>,
}

/// Default completion parameters for a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionConfig {
    /// Maximum tokens to generate.
    pub max_tokens: usize,
    /// Sampling temperature (0.0 - 1.0).
    pub temperature: f64,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            max_tokens: 4096,
            temperature: 0.7,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(id: &str, priority: i32) -> ModelDefinition {
        ModelDefinition {
            id: id.to_string(),
            display_name: id.to_string(),
            context_window: 200_000,
            priority,
            capabilities: vec![],
        }
    }

    #[test]
    fn default_model_prefers_priority_then_declaration_order() {
        let def = ProviderDefinition {
            id: "anthropic".into(),
            plugin_id: "core".into(),
            display_name: "Anthropic".into(),
            models: vec![model("a", 0), model("b", 10), model("c", 10)],
            auth_handlers: vec![],
            preferred_auth_order: vec![],
        };
        assert_eq!(def.default_model().unwrap().id, "b");
    }

    #[test]
    fn model_lookup_by_id() {
        let def = ProviderDefinition {
            id: "openai".into(),
            plugin_id: "core".into(),
            display_name: "OpenAI".into(),
            models: vec![model("gpt", 0)],
            auth_handlers: vec![],
            preferred_auth_order: vec![],
        };
        assert!(def.model("gpt").is_some());
        assert!(def.model("missing").is_none());
    }
}
