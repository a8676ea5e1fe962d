//! Prompt assembly.
//!
//! The assembled prompt is the core prompt, then plugin sections in
//! ascending priority, then the outputs of dynamic context providers,
//! joined by blank lines with empty parts skipped.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::warn;

/// A static prompt section contributed by a plugin.
#[derive(Debug, Clone)]
pub struct PromptSection {
    /// Section id.
    pub id: String,
    /// Ordering (lower first, default 100).
    pub priority: i32,
    /// Section text.
    pub content: String,
}

/// A dynamic context source queried at assembly time.
#[async_trait]
pub trait ContextProvider: Send + Sync {
    /// Produce the provider's current context block.
    async fn provide(&self) -> String;
}

/// Collects prompt sections and context providers.
#[derive(Default)]
pub struct PromptAssembler {
    core_prompt: Mutex<String>,
    sections: Mutex<Vec<PromptSection>>,
    providers: Mutex<Vec<(String, Arc<dyn ContextProvider>)>>,
}

impl PromptAssembler {
    /// Create an empty assembler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the core prompt.
    pub fn set_core_prompt(&self, prompt: impl Into<String>) {
        *self.core_prompt.lock().unwrap_or_else(|e| e.into_inner()) = prompt.into();
    }

    /// Add a section.
    pub fn add_section(&self, section: PromptSection) {
        let mut sections = self.sections.lock().unwrap_or_else(|e| e.into_inner());
        sections.push(section);
    }

    /// Add a dynamic context provider.
    pub fn add_context_provider(
        &self,
        id: impl Into<String>,
        provider: Arc<dyn ContextProvider>,
    ) {
        let mut providers = self.providers.lock().unwrap_or_else(|e| e.into_inner());
        providers.push((id.into(), provider));
    }

    /// Assemble the full prompt.
    pub async fn assemble(&self) -> String {
        let mut parts: Vec<String> = Vec::new();

        let core = self
            .core_prompt
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        parts.push(core);

        let mut sections = self
            .sections
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        let indexed: Vec<(usize, PromptSection)> = sections.drain(..).enumerate().collect();
        let mut ordered = indexed;
        ordered.sort_by_key(|(idx, section)| (section.priority, *idx));
        parts.extend(ordered.into_iter().map(|(_, section)| section.content));

        let providers: Vec<(String, Arc<dyn ContextProvider>)> = self
            .providers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        for (id, provider) in providers {
            let block = provider.provide().await;
            if block.trim().is_empty() {
                warn!(provider_id = %id, "Context provider produced empty output");
            }
            parts.push(block);
        }

        parts.retain(|part| !part.trim().is_empty());
        parts.join("\n\n")
    }
}

impl std::fmt::Debug for PromptAssembler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sections = self.sections.lock().map(|s| s.len()).unwrap_or(0);
        let providers = self.providers.lock().map(|p| p.len()).unwrap_or(0);
        f.debug_struct("PromptAssembler")
            .field("sections", &sections)
            .field("providers", &providers)
            .finish()
    }
}
