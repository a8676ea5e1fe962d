//! Pipeline configuration.

use serde::{Deserialize, Serialize};

/// Configuration for one pipeline run.
///
/// Every threshold is a declared field; there are no implicit defaults at
/// the pipeline boundary. Callers (the kernel) derive these values from
/// the selected model and their own policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextPipelineConfig {
    /// The model's context window in tokens.
    pub context_limit: usize,
    /// Tokens reserved for the model's reply.
    pub reserve_tokens: usize,
    /// Share of the context a single tool result may occupy, in `[0, 1]`.
    pub tool_result_max_context_share: f64,
    /// Absolute cap on a single tool result, in characters.
    pub tool_result_hard_max: usize,
    /// Lower bound on the effective tool-result limit, in characters.
    pub tool_result_min_keep: usize,
    /// Usage ratio at which pruning starts soft-trimming tool results.
    pub soft_trim_threshold: f64,
    /// Usage ratio at which pruning clears tool results outright.
    pub hard_clear_threshold: f64,
    /// Soft trim only touches tool results longer than this.
    pub soft_trim_min_chars: usize,
    /// Characters kept at each end of a soft-trimmed tool result.
    pub soft_trim_keep_chars: usize,
    /// Number of recent assistant messages pruning must not modify.
    pub protected_recent_messages: usize,
    /// Keep only this many recent user turns (0 = unlimited).
    pub max_history_turns: usize,
    /// Provider the prepared context targets; drives provider-specific
    /// sanitizing.
    pub provider_id: Option<String>,
}
