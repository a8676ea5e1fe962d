//! Slashbot Context - deterministic context preparation and overflow
//! recovery.
//!
//! [`prepare_context`] guarantees the next LLM call fits its context
//! budget while preserving the most recent work, in four stages: history
//! turn limit → prune → token-fit trim → sanitize.
//! [`with_overflow_recovery`] wraps the LLM call itself in an escalating
//! retry ladder for the cases where the provider still rejects the input
//! as too large. [`truncate_tool_result`] caps a single tool result
//! before it is fed back to the model.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

mod config;
mod overflow;
mod pipeline;
mod tokens;
mod truncate;

pub use config::ContextPipelineConfig;
pub use overflow::{
    is_context_overflow_error, with_overflow_recovery, OverflowRecoveryError, RetryStrategy,
};
pub use pipeline::{prepare_context, PreparedContext};
pub use tokens::{estimate_message_tokens, estimate_total_tokens, token_budget};
pub use truncate::truncate_tool_result;
