//! Provider registry.
//!
//! Maps a provider id to its definition, its default completion config,
//! and a factory constructing [`LlmProvider`] instances for one of its
//! models.

use std::sync::{Arc, Mutex};

use tracing::info;

use crate::error::{LlmError, LlmResult};
use crate::provider::LlmProvider;
use crate::types::{CompletionConfig, ModelDefinition, ProviderDefinition};

/// Constructs a provider instance for one model.
pub type ProviderFactory = Arc<
    dyn Fn(&ModelDefinition, &CompletionConfig) -> LlmResult<Arc<dyn LlmProvider>> + Send + Sync,
>;

/// One registered provider.
#[derive(Clone)]
pub struct ProviderEntry {
    /// The provider definition.
    pub definition: ProviderDefinition,
    /// Default completion parameters.
    pub default_config: CompletionConfig,
    /// Instance factory.
    pub factory: ProviderFactory,
}

impl std::fmt::Debug for ProviderEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderEntry")
            .field("id", &self.definition.id)
            .field("models", &self.definition.models.len())
            .finish()
    }
}

/// Registry of LLM providers, keyed by provider id.
#[derive(Default)]
pub struct ProviderRegistry {
    entries: Mutex<Vec<(String, ProviderEntry)>>,
}

impl ProviderRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::AlreadyRegistered`] if the id is taken.
    pub fn register(
        &self,
        definition: ProviderDefinition,
        factory: ProviderFactory,
        default_config: CompletionConfig,
    ) -> LlmResult<()> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        if entries.iter().any(|(id, _)| *id == definition.id) {
            return Err(LlmError::AlreadyRegistered(definition.id));
        }
        info!(provider_id = %definition.id, models = definition.models.len(), "Registered LLM provider");
        entries.push((
            definition.id.clone(),
            ProviderEntry {
                definition,
                default_config,
                factory,
            },
        ));
        Ok(())
    }

    /// Insert or replace a provider. Plugins use this to bind a real
    /// transport over a built-in definition.
    pub fn upsert(
        &self,
        definition: ProviderDefinition,
        factory: ProviderFactory,
        default_config: CompletionConfig,
    ) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let entry = ProviderEntry {
            definition,
            default_config,
            factory,
        };
        if let Some(existing) = entries.iter_mut().find(|(id, _)| *id == entry.definition.id) {
            existing.1 = entry;
        } else {
            entries.push((entry.definition.id.clone(), entry));
        }
    }

    /// Look up a provider entry by id.
    #[must_use]
    pub fn get(&self, provider_id: &str) -> Option<ProviderEntry> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries
            .iter()
            .find(|(id, _)| id == provider_id)
            .map(|(_, e)| e.clone())
    }

    /// Snapshot of all registered entries in registration order.
    #[must_use]
    pub fn list(&self) -> Vec<ProviderEntry> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.iter().map(|(_, e)| e.clone()).collect()
    }

    /// Number of registered providers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Construct a provider instance.
    ///
    /// `model_id` of `None` selects the provider's default model.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider or model is unknown, or if the
    /// factory fails.
    pub fn create(
        &self,
        provider_id: &str,
        model_id: Option<&str>,
    ) -> LlmResult<Arc<dyn LlmProvider>> {
        let entry = self
            .get(provider_id)
            .ok_or_else(|| LlmError::ProviderNotFound(provider_id.to_string()))?;

        let model = match model_id {
            Some(id) => entry
                .definition
                .model(id)
                .ok_or_else(|| LlmError::ModelNotFound {
                    provider_id: provider_id.to_string(),
                    model_id: id.to_string(),
                })?,
            None => entry
                .definition
                .default_model()
                .ok_or_else(|| LlmError::NoModels(provider_id.to_string()))?,
        };

        (entry.factory)(model, &entry.default_config)
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("provider_count", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{CompletionRequest, CompletionResponse};
    use async_trait::async_trait;
    use slashbot_core::AgentMessage;

    #[derive(Debug)]
    struct FixedProvider {
        model_id: String,
        context_window: usize,
    }

    #[async_trait]
    impl LlmProvider for FixedProvider {
        fn provider_id(&self) -> &str {
            "fixed"
        }
        fn model_id(&self) -> &str {
            &self.model_id
        }
        fn context_window(&self) -> usize {
            self.context_window
        }
        async fn complete(&self, _request: &CompletionRequest) -> LlmResult<CompletionResponse> {
            Ok(CompletionResponse {
                message: AgentMessage::assistant("ok"),
                tool_calls: vec![],
                usage: None,
            })
        }
    }

    fn definition(id: &str) -> ProviderDefinition {
        ProviderDefinition {
            id: id.to_string(),
            plugin_id: "test".into(),
            display_name: id.to_string(),
            models: vec![ModelDefinition {
                id: "m1".into(),
                display_name: "M1".into(),
                context_window: 100_000,
                priority: 0,
                capabilities: vec![],
            }],
            auth_handlers: vec![],
            preferred_auth_order: vec![],
        }
    }

    fn factory() -> ProviderFactory {
        Arc::new(|model, _config| {
            Ok(Arc::new(FixedProvider {
                model_id: model.id.clone(),
                context_window: model.context_window,
            }) as Arc<dyn LlmProvider>)
        })
    }

    #[test]
    fn duplicate_register_fails_but_upsert_replaces() {
        let registry = ProviderRegistry::new();
        registry
            .register(definition("p"), factory(), CompletionConfig::default())
            .unwrap();
        let err = registry
            .register(definition("p"), factory(), CompletionConfig::default())
            .unwrap_err();
        assert!(matches!(err, LlmError::AlreadyRegistered(_)));

        registry.upsert(definition("p"), factory(), CompletionConfig::default());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn create_resolves_default_and_named_models() {
        let registry = ProviderRegistry::new();
        registry
            .register(definition("p"), factory(), CompletionConfig::default())
            .unwrap();

        let provider = registry.create("p", None).unwrap();
        assert_eq!(provider.model_id(), "m1");
        assert_eq!(provider.context_window(), 100_000);

        let err = registry.create("p", Some("missing")).unwrap_err();
        assert!(matches!(err, LlmError::ModelNotFound { .. }));

        let err = registry.create("nope", None).unwrap_err();
        assert!(matches!(err, LlmError::ProviderNotFound(_)));
    }

    #[test]
    fn list_returns_a_snapshot() {
        let registry = ProviderRegistry::new();
        registry
            .register(definition("p"), factory(), CompletionConfig::default())
            .unwrap();
        let mut listed = registry.list();
        listed.clear();
        assert_eq!(registry.len(), 1);
    }
}
