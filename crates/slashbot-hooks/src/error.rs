//! Hook error types.

use thiserror::Error;

/// Errors raised by hook handlers and the surrounding machinery.
#[derive(Debug, Error)]
pub enum HookError {
    /// The handler itself failed.
    #[error("{0}")]
    Handler(String),

    /// A spawned hook command could not start or exited non-zero.
    #[error("command failed: {0}")]
    Command(String),

    /// Hook payload could not be serialized for a command handler.
    #[error("payload serialization failed: {0}")]
    Payload(#[from] serde_json::Error),

    /// I/O failure while running a command handler.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for hook handlers.
pub type HookResult<T> = Result<T, HookError>;
