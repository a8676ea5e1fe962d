//! Kernel error types.

use thiserror::Error;

/// Errors raised by kernel registries and operations.
#[derive(Debug, Error)]
pub enum KernelError {
    /// A registry already holds an entry with this id.
    #[error("already registered: {kind} {id}")]
    AlreadyRegistered {
        /// What kind of entry collided (tool, command, route, …).
        kind: &'static str,
        /// The colliding id.
        id: String,
    },

    /// Session metadata could not be written.
    #[error("failed to persist session {session_id}: {message}")]
    SessionPersist {
        /// The session.
        session_id: String,
        /// What went wrong.
        message: String,
    },
}

/// Result type for kernel operations.
pub type KernelResult<T> = Result<T, KernelError>;
