//! LLM error types.

use thiserror::Error;

/// Errors raised by providers and the provider registry.
#[derive(Debug, Error)]
pub enum LlmError {
    /// A provider with this id is already registered.
    #[error("provider already registered: {0}")]
    AlreadyRegistered(String),

    /// No provider registered under this id.
    #[error("provider not found: {0}")]
    ProviderNotFound(String),

    /// The provider has no model with this id.
    #[error("model not found: {provider_id}/{model_id}")]
    ModelNotFound {
        /// The provider that was asked.
        provider_id: String,
        /// The missing model.
        model_id: String,
    },

    /// The provider definition declares no models at all.
    #[error("provider {0} declares no models")]
    NoModels(String),

    /// No transport is bound for this provider (no SDK plugin installed).
    #[error("no transport bound for provider {0}; install a provider plugin")]
    NoTransport(String),

    /// The remote model call failed.
    #[error("completion failed: {0}")]
    Completion(String),
}

/// Result type for LLM operations.
pub type LlmResult<T> = Result<T, LlmError>;
