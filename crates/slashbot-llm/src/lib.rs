//! Slashbot LLM - provider definitions and the provider registry.
//!
//! A provider contributes model definitions, supported auth methods, and a
//! factory that constructs [`LlmProvider`] instances. Concrete SDK
//! transports arrive through plugins; the built-in definitions registered
//! at init carry model metadata and an unbound factory that errors until a
//! transport plugin replaces it via `upsert`.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

mod builtin;
mod error;
mod provider;
mod registry;
mod types;

pub use builtin::register_builtin_providers;
pub use error::{LlmError, LlmResult};
pub use provider::{
    CompletionRequest, CompletionResponse, LlmProvider, ToolCallRequest, Usage,
};
pub use registry::{ProviderEntry, ProviderFactory, ProviderRegistry};
pub use types::{CompletionConfig, ModelDefinition, ProviderDefinition};
