//! Auth error types.

use thiserror::Error;

/// Errors raised by the credential store and the auth router.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The credential file could not be read.
    #[error("failed to read credentials {path}: {source}")]
    Read {
        /// The offending path.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The credential file contained malformed JSON.
    #[error("failed to parse credentials {path}: {source}")]
    Parse {
        /// The offending path.
        path: String,
        /// Underlying parse error.
        source: serde_json::Error,
    },

    /// The credential file could not be written.
    #[error("failed to write credentials {path}: {detail}")]
    Write {
        /// The offending path.
        path: String,
        /// What went wrong.
        detail: String,
    },

    /// The profile lock was not acquired before the deadline.
    #[error("timed out acquiring credential lock for {agent_id}/{provider_id} after {waited_ms}ms")]
    LockTimeout {
        /// Agent whose lock was contended.
        agent_id: String,
        /// Provider whose lock was contended.
        provider_id: String,
        /// How long the caller waited.
        waited_ms: u64,
    },

    /// No provider is pinned or configured as active.
    #[error("no provider configured")]
    NoProviderConfigured,

    /// No registered provider under the selected id.
    #[error("unknown provider: {0}")]
    UnknownProvider(String),

    /// Every profile for the provider is missing or failed this session.
    #[error("no usable auth profile for provider {provider_id}")]
    NoUsableProfile {
        /// The provider that was asked.
        provider_id: String,
    },
}

/// Result type for auth operations.
pub type AuthResult<T> = Result<T, AuthError>;
