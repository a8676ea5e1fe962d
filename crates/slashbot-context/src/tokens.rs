//! Token estimation.
//!
//! Estimates are deliberately cheap: `ceil(chars / 4) + 4` per message,
//! the `+ 4` covering role and framing overhead.

use slashbot_core::AgentMessage;

use crate::config::ContextPipelineConfig;

/// Floor on the token budget regardless of configuration.
const MIN_BUDGET: usize = 1_000;

/// Estimated tokens for one message.
#[must_use]
pub fn estimate_message_tokens(message: &AgentMessage) -> usize {
    estimate_text_tokens(message.content_len())
}

/// Estimated tokens for a character count.
#[must_use]
pub(crate) fn estimate_text_tokens(chars: usize) -> usize {
    chars.div_ceil(4) + 4
}

/// Estimated tokens for a whole conversation.
#[must_use]
pub fn estimate_total_tokens(messages: &[AgentMessage]) -> usize {
    messages.iter().map(estimate_message_tokens).sum()
}

/// The token budget for prepared input:
/// `max(1000, context_limit − reserve_tokens)`.
#[must_use]
pub fn token_budget(config: &ContextPipelineConfig) -> usize {
    config
        .context_limit
        .saturating_sub(config.reserve_tokens)
        .max(MIN_BUDGET)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(context_limit: usize, reserve_tokens: usize) -> ContextPipelineConfig {
        ContextPipelineConfig {
            context_limit,
            reserve_tokens,
            tool_result_max_context_share: 0.3,
            tool_result_hard_max: 30_000,
            tool_result_min_keep: 2_000,
            soft_trim_threshold: 0.7,
            hard_clear_threshold: 0.9,
            soft_trim_min_chars: 1_500,
            soft_trim_keep_chars: 500,
            protected_recent_messages: 3,
            max_history_turns: 0,
            provider_id: None,
        }
    }

    #[test]
    fn token_estimate_rounds_up_and_adds_overhead() {
        assert_eq!(estimate_text_tokens(0), 4);
        assert_eq!(estimate_text_tokens(1), 5);
        assert_eq!(estimate_text_tokens(4), 5);
        assert_eq!(estimate_text_tokens(5), 6);
    }

    #[test]
    fn budget_is_floored() {
        assert_eq!(token_budget(&config(10_000, 2_000)), 8_000);
        assert_eq!(token_budget(&config(1_200, 1_000)), 1_000);
        assert_eq!(token_budget(&config(500, 2_000)), 1_000);
    }
}
