//! The four-stage context preparation pipeline.
//!
//! Stages run in a fixed order: history turn limit → prune → token-fit
//! trim → sanitize. The pipeline is pure: it never mutates its input and
//! the same input and config always produce the same output.

use tracing::debug;

use slashbot_core::{AgentMessage, MessageContent, MessageRole};

use crate::config::ContextPipelineConfig;
use crate::tokens::{estimate_text_tokens, estimate_total_tokens, token_budget};

/// Replacement content for hard-cleared tool results.
const HARD_CLEAR_PLACEHOLDER: &str = "[earlier tool result cleared]";

/// Marker appended to a system message truncated by the token-fit stage.
const SYSTEM_TRUNCATION_MARKER: &str = "\n[... system content truncated ...]";

/// Tool results longer than this are "likely tool results" regardless of
/// shape.
const LIKELY_TOOL_RESULT_MIN_CHARS: usize = 2_000;

/// Content prefixes marking a likely tool result.
const LIKELY_TOOL_RESULT_PREFIXES: &[&str] = &["{", "[", "ERROR [", "OK (", "```"];

/// Output of [`prepare_context`].
#[derive(Debug, Clone)]
pub struct PreparedContext {
    /// The prepared conversation.
    pub messages: Vec<AgentMessage>,
    /// Whether the prune stage modified any message.
    pub pruned: bool,
    /// Whether the token-fit stage dropped or truncated anything.
    pub trimmed: bool,
}

/// Run the pipeline.
#[must_use]
pub fn prepare_context(
    messages: &[AgentMessage],
    config: &ContextPipelineConfig,
) -> PreparedContext {
    let mut working: Vec<AgentMessage> = messages.to_vec();

    apply_history_limit(&mut working, config.max_history_turns);
    let pruned = prune(&mut working, config);
    let trimmed = token_fit(&mut working, config);
    sanitize(&mut working, config.provider_id.as_deref());

    debug!(
        input_count = messages.len(),
        output_count = working.len(),
        pruned,
        trimmed,
        "Prepared context"
    );

    PreparedContext {
        messages: working,
        pruned,
        trimmed,
    }
}

/// Stage 1: keep all system messages plus the most recent `max_turns`
/// user turns together with every intervening non-system message.
fn apply_history_limit(messages: &mut Vec<AgentMessage>, max_turns: usize) {
    if max_turns == 0 {
        return;
    }
    let user_count = messages
        .iter()
        .filter(|m| m.role == MessageRole::User)
        .count();
    if user_count <= max_turns {
        return;
    }

    // Index of the first user message inside the kept window.
    let mut remaining = max_turns;
    let mut cutoff = messages.len();
    for (idx, message) in messages.iter().enumerate().rev() {
        if message.role == MessageRole::User {
            cutoff = idx;
            remaining -= 1;
            if remaining == 0 {
                break;
            }
        }
    }

    let mut kept = Vec::with_capacity(messages.len());
    for (idx, message) in messages.iter().enumerate() {
        if message.is_system() || idx >= cutoff {
            kept.push(message.clone());
        }
    }
    *messages = kept;
}

/// Stage 2: shrink likely tool results once the usage ratio crosses the
/// soft threshold; clear them outright past the hard threshold. The
/// protected zone (the last N assistant messages) is never touched.
fn prune(messages: &mut [AgentMessage], config: &ContextPipelineConfig) -> bool {
    let budget = token_budget(config);
    #[allow(clippy::cast_precision_loss)]
    let usage_ratio = estimate_total_tokens(messages) as f64 / budget as f64;
    if usage_ratio < config.soft_trim_threshold {
        return false;
    }

    let protected = protected_zone(messages, config.protected_recent_messages);
    let hard_clear = usage_ratio >= config.hard_clear_threshold;
    let mut modified = false;

    for (idx, message) in messages.iter_mut().enumerate() {
        if message.is_system() || protected.contains(&idx) {
            continue;
        }
        let text = message.text();
        if !is_likely_tool_result(&text) {
            continue;
        }

        if hard_clear {
            message.content = MessageContent::Text(HARD_CLEAR_PLACEHOLDER.to_string());
            modified = true;
        } else if text.chars().count() > config.soft_trim_min_chars {
            message.content =
                MessageContent::Text(soft_trim(&text, config.soft_trim_keep_chars));
            modified = true;
        }
    }
    modified
}

/// Indices of the last `count` assistant messages.
fn protected_zone(messages: &[AgentMessage], count: usize) -> Vec<usize> {
    let mut indices: Vec<usize> = messages
        .iter()
        .enumerate()
        .filter(|(_, m)| m.role == MessageRole::Assistant)
        .map(|(idx, _)| idx)
        .collect();
    let keep_from = indices.len().saturating_sub(count);
    indices.split_off(keep_from)
}

/// The "likely tool result" heuristic: long, or shaped like structured
/// output.
fn is_likely_tool_result(text: &str) -> bool {
    if text.chars().count() > LIKELY_TOOL_RESULT_MIN_CHARS {
        return true;
    }
    LIKELY_TOOL_RESULT_PREFIXES
        .iter()
        .any(|prefix| text.starts_with(prefix))
}

/// Keep both ends of `text`, eliding the middle with a count marker.
fn soft_trim(text: &str, keep_chars: usize) -> String {
    let total = text.chars().count();
    let elided = total.saturating_sub(keep_chars * 2);
    format!(
        "{}\n[... {elided} characters elided ...]\n{}",
        char_prefix(text, keep_chars),
        char_suffix(text, keep_chars)
    )
}

/// Stage 3: make the conversation fit the token budget. System content is
/// capped at half the budget; the conversation is filled greedily from
/// the end, always keeping at least one non-system message.
fn token_fit(messages: &mut Vec<AgentMessage>, config: &ContextPipelineConfig) -> bool {
    let budget = token_budget(config);
    if estimate_total_tokens(messages) <= budget {
        return false;
    }

    let system_budget = budget / 2;
    let mut system_tokens = 0usize;
    let mut kept_system: Vec<AgentMessage> = Vec::new();
    for message in messages.iter().filter(|m| m.is_system()) {
        let tokens = estimate_text_tokens(message.content_len());
        if system_tokens + tokens <= system_budget {
            system_tokens += tokens;
            kept_system.push(message.clone());
        } else {
            let remaining = system_budget.saturating_sub(system_tokens);
            let allowed_chars = remaining.saturating_sub(4).saturating_mul(4);
            if allowed_chars > SYSTEM_TRUNCATION_MARKER.len() {
                let text = message.text();
                let mut truncated =
                    char_prefix(&text, allowed_chars - SYSTEM_TRUNCATION_MARKER.len())
                        .to_string();
                truncated.push_str(SYSTEM_TRUNCATION_MARKER);
                system_tokens += estimate_text_tokens(truncated.chars().count());
                kept_system.push(AgentMessage::system(truncated));
            }
            break;
        }
    }

    let conversation_budget = budget.saturating_sub(system_tokens);
    let conversation: Vec<&AgentMessage> =
        messages.iter().filter(|m| !m.is_system()).collect();
    let mut kept_conversation: Vec<AgentMessage> = Vec::new();
    let mut conversation_tokens = 0usize;
    for message in conversation.iter().rev() {
        let tokens = estimate_text_tokens(message.content_len());
        if conversation_tokens + tokens > conversation_budget && !kept_conversation.is_empty() {
            break;
        }
        conversation_tokens += tokens;
        kept_conversation.push((*message).clone());
    }
    kept_conversation.reverse();

    let mut result = kept_system;
    result.extend(kept_conversation);
    *messages = result;
    true
}

/// Stage 4: drop empty non-system messages; for Google, fold consecutive
/// same-role non-system messages so turns strictly alternate.
fn sanitize(messages: &mut Vec<AgentMessage>, provider_id: Option<&str>) {
    messages.retain(|m| m.is_system() || !m.content.is_empty());

    if provider_id != Some("google") {
        return;
    }

    let mut folded: Vec<AgentMessage> = Vec::with_capacity(messages.len());
    for message in messages.drain(..) {
        match folded.last_mut() {
            Some(last)
                if !last.is_system()
                    && !message.is_system()
                    && last.role == message.role =>
            {
                let joined = format!("{}\n\n{}", last.text(), message.text());
                last.content = MessageContent::Text(joined);
            },
            _ => folded.push(message),
        }
    }
    *messages = folded;
}

/// First `n` chars of `s`.
fn char_prefix(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Last `n` chars of `s`.
fn char_suffix(s: &str, n: usize) -> &str {
    let total = s.chars().count();
    if total <= n {
        return s;
    }
    match s.char_indices().nth(total - n) {
        Some((idx, _)) => &s[idx..],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ContextPipelineConfig {
        ContextPipelineConfig {
            context_limit: 10_000,
            reserve_tokens: 2_000,
            tool_result_max_context_share: 0.3,
            tool_result_hard_max: 30_000,
            tool_result_min_keep: 2_000,
            soft_trim_threshold: 0.7,
            hard_clear_threshold: 0.9,
            soft_trim_min_chars: 1_500,
            soft_trim_keep_chars: 200,
            protected_recent_messages: 3,
            max_history_turns: 0,
            provider_id: None,
        }
    }

    #[test]
    fn identity_when_input_fits() {
        let messages = vec![
            AgentMessage::system("SYS"),
            AgentMessage::user("hello"),
            AgentMessage::assistant("hi"),
        ];
        let prepared = prepare_context(&messages, &config());
        assert_eq!(prepared.messages, messages);
        assert!(!prepared.pruned);
        assert!(!prepared.trimmed);
    }

    #[test]
    fn history_limit_keeps_system_and_recent_turns() {
        let mut cfg = config();
        cfg.max_history_turns = 2;
        let messages = vec![
            AgentMessage::system("SYS"),
            AgentMessage::user("turn 1"),
            AgentMessage::assistant("reply 1"),
            AgentMessage::user("turn 2"),
            AgentMessage::assistant("reply 2"),
            AgentMessage::user("turn 3"),
            AgentMessage::assistant("reply 3"),
        ];
        let prepared = prepare_context(&messages, &cfg);
        let texts: Vec<String> = prepared.messages.iter().map(AgentMessage::text).collect();
        assert_eq!(
            texts,
            vec!["SYS", "turn 2", "reply 2", "turn 3", "reply 3"]
        );
    }

    #[test]
    fn prune_soft_trims_long_tool_results() {
        let mut cfg = config();
        cfg.soft_trim_threshold = 0.0;
        cfg.hard_clear_threshold = 100.0;
        let long_result = "x".repeat(3_000);
        let messages = vec![
            AgentMessage::user(long_result),
            AgentMessage::assistant("done"),
        ];
        let prepared = prepare_context(&messages, &cfg);
        assert!(prepared.pruned);
        let text = prepared.messages[0].text();
        assert!(text.contains("characters elided"));
        assert!(text.chars().count() < 3_000);
        // The protected assistant message is untouched.
        assert_eq!(prepared.messages[1].text(), "done");
    }

    #[test]
    fn prune_hard_clears_past_the_hard_threshold() {
        let mut cfg = config();
        cfg.soft_trim_threshold = 0.0;
        cfg.hard_clear_threshold = 0.0;
        let messages = vec![
            AgentMessage::user("{\"result\": 1}"),
            AgentMessage::assistant("ack"),
        ];
        let prepared = prepare_context(&messages, &cfg);
        assert!(prepared.pruned);
        assert_eq!(prepared.messages[0].text(), HARD_CLEAR_PLACEHOLDER);
    }

    #[test]
    fn prune_never_touches_protected_recent_assistants() {
        let mut cfg = config();
        cfg.soft_trim_threshold = 0.0;
        cfg.hard_clear_threshold = 0.0;
        cfg.protected_recent_messages = 3;
        let tool_shaped = format!("OK ({})", "y".repeat(2_500));
        let messages = vec![
            AgentMessage::assistant(tool_shaped.clone()),
            AgentMessage::assistant(tool_shaped.clone()),
            AgentMessage::assistant(tool_shaped.clone()),
            AgentMessage::assistant(tool_shaped.clone()),
        ];
        let prepared = prepare_context(&messages, &cfg);
        // Only the first (oldest) assistant message is outside the zone.
        assert_eq!(prepared.messages[0].text(), HARD_CLEAR_PLACEHOLDER);
        for message in &prepared.messages[1..] {
            assert_eq!(message.text(), tool_shaped);
        }
    }

    #[test]
    fn token_fit_keeps_system_and_conversation_tail() {
        let cfg = config();
        let mut messages = vec![AgentMessage::system("S".repeat(1_000))];
        for i in 0..200 {
            messages.push(AgentMessage::user(format!("{i:0>200}")));
        }
        let prepared = prepare_context(&messages, &cfg);
        assert!(prepared.trimmed);

        // System message survives.
        assert!(prepared.messages[0].is_system());
        // At least one user message survives and the tail is preferred.
        let users: Vec<&AgentMessage> = prepared
            .messages
            .iter()
            .filter(|m| m.role == MessageRole::User)
            .collect();
        assert!(!users.is_empty());
        assert!(users.len() < 200);
        assert_eq!(users.last().unwrap().text(), format!("{:0>200}", 199));
        // The oldest messages are the ones dropped.
        assert_ne!(users[0].text(), format!("{:0>200}", 0));

        // Total fits the budget.
        assert!(estimate_total_tokens(&prepared.messages) <= token_budget(&cfg));
    }

    #[test]
    fn token_fit_truncates_oversized_system_content() {
        let mut cfg = config();
        cfg.context_limit = 5_000;
        cfg.reserve_tokens = 1_000;
        // System alone exceeds half the budget.
        let messages = vec![
            AgentMessage::system("S".repeat(20_000)),
            AgentMessage::user("question"),
        ];
        let prepared = prepare_context(&messages, &cfg);
        assert!(prepared.trimmed);
        let system_text = prepared.messages[0].text();
        assert!(system_text.ends_with(SYSTEM_TRUNCATION_MARKER));
        assert!(system_text.chars().count() < 20_000);
        // The conversation message is still there.
        assert_eq!(prepared.messages[1].text(), "question");
    }

    #[test]
    fn sanitize_drops_empty_messages() {
        let messages = vec![
            AgentMessage::system(""),
            AgentMessage::user(""),
            AgentMessage::user("real"),
        ];
        let prepared = prepare_context(&messages, &config());
        let texts: Vec<String> = prepared.messages.iter().map(AgentMessage::text).collect();
        assert_eq!(texts, vec!["", "real"]);
    }

    #[test]
    fn google_folds_consecutive_same_role_messages() {
        let mut cfg = config();
        cfg.provider_id = Some("google".to_string());
        let messages = vec![
            AgentMessage::user("first"),
            AgentMessage::user("second"),
            AgentMessage::assistant("reply"),
        ];
        let prepared = prepare_context(&messages, &cfg);
        assert_eq!(prepared.messages.len(), 2);
        assert_eq!(prepared.messages[0].text(), "first\n\nsecond");
        assert_eq!(prepared.messages[1].text(), "reply");

        // Any other provider keeps both user messages.
        let prepared = prepare_context(&messages, &config());
        assert_eq!(prepared.messages.len(), 3);
    }

    #[test]
    fn char_helpers_respect_boundaries() {
        let s = "aé🦀b";
        assert_eq!(char_prefix(s, 2), "aé");
        assert_eq!(char_suffix(s, 2), "🦀b");
        assert_eq!(char_prefix(s, 10), s);
        assert_eq!(char_suffix(s, 10), s);
    }
}
