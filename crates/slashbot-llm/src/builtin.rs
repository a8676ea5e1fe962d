//! Built-in provider definitions.
//!
//! Registered at kernel init so auth routing and model selection work out
//! of the box. The factories here are unbound: `complete` fails with
//! [`LlmError::NoTransport`] until a provider plugin upserts a real
//! transport over the same id.

use std::sync::Arc;

use async_trait::async_trait;

use slashbot_core::AuthMethod;

use crate::error::{LlmError, LlmResult};
use crate::provider::{CompletionRequest, CompletionResponse, LlmProvider};
use crate::registry::{ProviderFactory, ProviderRegistry};
use crate::types::{CompletionConfig, ModelDefinition, ProviderDefinition};

/// Plugin id attributed to built-in definitions.
const BUILTIN_PLUGIN_ID: &str = "core";

/// Register the built-in provider definitions.
///
/// # Errors
///
/// Returns [`LlmError::AlreadyRegistered`] if called twice on the same
/// registry.
pub fn register_builtin_providers(registry: &ProviderRegistry) -> LlmResult<()> {
    for definition in [anthropic(), openai(), google()] {
        let provider_id = definition.id.clone();
        registry.register(
            definition,
            unbound_factory(provider_id),
            CompletionConfig::default(),
        )?;
    }
    Ok(())
}

fn unbound_factory(provider_id: String) -> ProviderFactory {
    Arc::new(move |model, _config| {
        Ok(Arc::new(UnboundProvider {
            provider_id: provider_id.clone(),
            model_id: model.id.clone(),
            context_window: model.context_window,
        }) as Arc<dyn LlmProvider>)
    })
}

/// Placeholder instance produced before any transport plugin binds the
/// provider. Carries real model metadata so context budgeting works.
#[derive(Debug)]
struct UnboundProvider {
    provider_id: String,
    model_id: String,
    context_window: usize,
}

#[async_trait]
impl LlmProvider for UnboundProvider {
    fn provider_id(&self) -> &str {
        &self.provider_id
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn context_window(&self) -> usize {
        self.context_window
    }

    async fn complete(&self, _request: &CompletionRequest) -> LlmResult<CompletionResponse> {
        Err(LlmError::NoTransport(self.provider_id.clone()))
    }
}

fn model(id: &str, display_name: &str, context_window: usize, priority: i32) -> ModelDefinition {
    ModelDefinition {
        id: id.to_string(),
        display_name: display_name.to_string(),
        context_window,
        priority,
        capabilities: vec!["tools".to_string()],
    }
}

fn anthropic() -> ProviderDefinition {
    ProviderDefinition {
        id: "anthropic".to_string(),
        plugin_id: BUILTIN_PLUGIN_ID.to_string(),
        display_name: "Anthropic".to_string(),
        models: vec![
            model("claude-opus-4-20250514", "Claude Opus 4", 200_000, 5),
            model("claude-sonnet-4-20250514", "Claude Sonnet 4", 200_000, 10),
            model("claude-3-5-haiku-20241022", "Claude 3.5 Haiku", 200_000, 0),
        ],
        auth_handlers: vec![
            AuthMethod::OauthPkce,
            AuthMethod::ApiKey,
            AuthMethod::SetupToken,
            AuthMethod::ClaudeCodeImport,
        ],
        preferred_auth_order: vec![
            AuthMethod::OauthPkce,
            AuthMethod::ClaudeCodeImport,
            AuthMethod::ApiKey,
            AuthMethod::SetupToken,
        ],
    }
}

fn openai() -> ProviderDefinition {
    ProviderDefinition {
        id: "openai".to_string(),
        plugin_id: BUILTIN_PLUGIN_ID.to_string(),
        display_name: "OpenAI".to_string(),
        models: vec![
            model("gpt-4o", "GPT-4o", 128_000, 10),
            model("gpt-4o-mini", "GPT-4o mini", 128_000, 0),
        ],
        auth_handlers: vec![AuthMethod::ApiKey],
        preferred_auth_order: vec![AuthMethod::ApiKey],
    }
}

fn google() -> ProviderDefinition {
    ProviderDefinition {
        id: "google".to_string(),
        plugin_id: BUILTIN_PLUGIN_ID.to_string(),
        display_name: "Google".to_string(),
        models: vec![
            model("gemini-2.0-flash", "Gemini 2.0 Flash", 1_000_000, 10),
            model("gemini-1.5-pro", "Gemini 1.5 Pro", 2_000_000, 5),
        ],
        auth_handlers: vec![AuthMethod::ApiKey, AuthMethod::OauthPkce],
        preferred_auth_order: vec![AuthMethod::ApiKey, AuthMethod::OauthPkce],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn builtins_register_and_default_models_resolve() {
        let registry = ProviderRegistry::new();
        register_builtin_providers(&registry).unwrap();
        assert_eq!(registry.len(), 3);

        let provider = registry.create("anthropic", None).unwrap();
        assert_eq!(provider.model_id(), "claude-sonnet-4-20250514");

        let request = CompletionRequest {
            messages: vec![],
            tools: vec![],
        };
        let err = provider.complete(&request).await.unwrap_err();
        assert!(matches!(err, LlmError::NoTransport(_)));
    }

    #[test]
    fn double_registration_is_rejected() {
        let registry = ProviderRegistry::new();
        register_builtin_providers(&registry).unwrap();
        assert!(register_builtin_providers(&registry).is_err());
    }
}
