//! Operation context.
//!
//! Every high-level kernel operation (tool call, command, RPC handler)
//! carries one of these. The cancellation token is cooperative: tools and
//! hook handlers should observe it, the kernel never forcibly interrupts
//! beyond its own timeouts.

use tokio_util::sync::CancellationToken;

/// Context for one kernel operation.
#[derive(Debug, Clone, Default)]
pub struct OpCtx {
    /// Session the operation belongs to, if any.
    pub session_id: Option<String>,
    /// Agent the operation belongs to, if any.
    pub agent_id: Option<String>,
    /// Cooperative cancellation handle.
    pub cancel: CancellationToken,
}

impl OpCtx {
    /// Context with no session scoping.
    #[must_use]
    pub fn detached() -> Self {
        Self::default()
    }

    /// Context scoped to a session and agent.
    pub fn for_session(session_id: impl Into<String>, agent_id: impl Into<String>) -> Self {
        Self {
            session_id: Some(session_id.into()),
            agent_id: Some(agent_id.into()),
            cancel: CancellationToken::new(),
        }
    }

    /// Whether the operation was cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}
