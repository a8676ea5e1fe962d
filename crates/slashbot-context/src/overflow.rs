//! Overflow recovery: an escalating retry ladder around LLM calls.
//!
//! Providers signal oversized input with loosely standardized error
//! strings. When an error matches the curated pattern set, the call is
//! retried with progressively harsher reductions of the conversation;
//! any other error propagates untouched.

use std::fmt;
use std::future::Future;

use thiserror::Error;
use tracing::{debug, warn};

use slashbot_core::{AgentMessage, MessageContent};

use crate::config::ContextPipelineConfig;
use crate::pipeline::prepare_context;

/// Substrings that identify a context-overflow error (matched
/// case-insensitively).
const OVERFLOW_PATTERNS: &[&str] = &[
    "request too large",
    "context length exceeded",
    "maximum context length",
    "prompt is too long",
    "exceeds model context window",
    "context overflow",
];

/// Messages longer than this are shrunk by the truncate-oversized
/// strategy.
const OVERSIZED_MESSAGE_CHARS: usize = 8_000;
/// How much of an oversized message the truncate-oversized strategy keeps.
const OVERSIZED_KEEP_CHARS: usize = 4_000;
/// How many trailing non-system messages the minimal-context strategy keeps.
const MINIMAL_CONTEXT_TAIL: usize = 4;

/// The reduction applied before a retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryStrategy {
    /// Rerun the pipeline with an extra quarter of the context reserved.
    AggressiveTrim,
    /// Replace every oversized message body with its head.
    TruncateOversized,
    /// Keep only system messages and the last few conversation messages.
    MinimalContext,
}

impl fmt::Display for RetryStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AggressiveTrim => write!(f, "aggressive-trim"),
            Self::TruncateOversized => write!(f, "truncate-oversized"),
            Self::MinimalContext => write!(f, "minimal-context"),
        }
    }
}

/// Error from [`with_overflow_recovery`].
#[derive(Debug, Error)]
pub enum OverflowRecoveryError<E> {
    /// The call failed with a non-overflow error; it propagates as-is.
    #[error("{0}")]
    Execute(E),

    /// Every strategy was tried and the provider still rejected the input.
    #[error("OVERFLOW_RECOVERY_EXHAUSTED after {attempts} attempts: {last_error}")]
    Exhausted {
        /// Total attempts made (including the initial call).
        attempts: usize,
        /// The final overflow error.
        last_error: E,
    },
}

/// Whether an error message matches the context-overflow pattern set.
#[must_use]
pub fn is_context_overflow_error(message: &str) -> bool {
    let lowered = message.to_lowercase();
    if OVERFLOW_PATTERNS.iter().any(|p| lowered.contains(p)) {
        return true;
    }
    lowered.contains("413") && lowered.contains("too large")
}

/// Run `execute` with up to three overflow retries.
///
/// Attempt 0 uses the caller-prepared messages. On a matching overflow
/// error, retries apply [`RetryStrategy::AggressiveTrim`],
/// [`RetryStrategy::TruncateOversized`], then
/// [`RetryStrategy::MinimalContext`] — each derived from the original
/// input. `on_retry(attempt, strategy)` fires before each retry.
///
/// # Errors
///
/// Non-overflow errors propagate as [`OverflowRecoveryError::Execute`];
/// running out of strategies yields
/// [`OverflowRecoveryError::Exhausted`].
pub async fn with_overflow_recovery<T, E, F, Fut>(
    messages: &[AgentMessage],
    config: &ContextPipelineConfig,
    mut execute: F,
    mut on_retry: impl FnMut(usize, RetryStrategy),
) -> Result<T, OverflowRecoveryError<E>>
where
    F: FnMut(Vec<AgentMessage>) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    let mut last_error = match execute(messages.to_vec()).await {
        Ok(value) => return Ok(value),
        Err(e) => {
            if !is_context_overflow_error(&e.to_string()) {
                return Err(OverflowRecoveryError::Execute(e));
            }
            debug!(error = %e, "Context overflow on initial attempt, starting recovery");
            e
        },
    };

    let strategies = [
        RetryStrategy::AggressiveTrim,
        RetryStrategy::TruncateOversized,
        RetryStrategy::MinimalContext,
    ];

    for (idx, strategy) in strategies.into_iter().enumerate() {
        let attempt = idx + 1;
        on_retry(attempt, strategy);
        warn!(attempt, strategy = %strategy, "Retrying after context overflow");

        let reduced = apply_strategy(messages, config, strategy);
        match execute(reduced).await {
            Ok(value) => return Ok(value),
            Err(e) => {
                if !is_context_overflow_error(&e.to_string()) {
                    return Err(OverflowRecoveryError::Execute(e));
                }
                last_error = e;
            },
        }
    }

    Err(OverflowRecoveryError::Exhausted {
        attempts: strategies.len() + 1,
        last_error,
    })
}

fn apply_strategy(
    messages: &[AgentMessage],
    config: &ContextPipelineConfig,
    strategy: RetryStrategy,
) -> Vec<AgentMessage> {
    match strategy {
        RetryStrategy::AggressiveTrim => {
            let mut harsher = config.clone();
            harsher.reserve_tokens =
                config.reserve_tokens + config.context_limit / 4;
            prepare_context(messages, &harsher).messages
        },
        RetryStrategy::TruncateOversized => messages
            .iter()
            .map(|message| {
                if message.is_system() {
                    return message.clone();
                }
                let text = message.text();
                if text.chars().count() <= OVERSIZED_MESSAGE_CHARS {
                    return message.clone();
                }
                let head: String = text.chars().take(OVERSIZED_KEEP_CHARS).collect();
                AgentMessage {
                    role: message.role,
                    content: MessageContent::Text(format!(
                        "{head}\n[... truncated for context recovery ...]"
                    )),
                }
            })
            .collect(),
        RetryStrategy::MinimalContext => {
            let system: Vec<AgentMessage> = messages
                .iter()
                .filter(|m| m.is_system())
                .cloned()
                .collect();
            let conversation: Vec<AgentMessage> = messages
                .iter()
                .filter(|m| !m.is_system())
                .cloned()
                .collect();
            let tail_start = conversation.len().saturating_sub(MINIMAL_CONTEXT_TAIL);
            let mut result = system;
            result.extend_from_slice(&conversation[tail_start..]);
            result
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

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
    fn overflow_pattern_matching() {
        assert!(is_context_overflow_error("Request Too Large for model"));
        assert!(is_context_overflow_error("this model's maximum context length is 200000"));
        assert!(is_context_overflow_error("prompt is too long: 250000 tokens"));
        assert!(is_context_overflow_error("HTTP 413: payload too large"));
        assert!(!is_context_overflow_error("HTTP 413"));
        assert!(!is_context_overflow_error("rate limit exceeded"));
        assert!(!is_context_overflow_error("connection reset"));
    }

    #[tokio::test]
    async fn success_on_first_attempt_skips_callbacks() {
        let retries = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&retries);
        let result: Result<i32, OverflowRecoveryError<String>> = with_overflow_recovery(
            &[AgentMessage::user("hi")],
            &config(),
            |_| async { Ok::<_, String>(42) },
            move |_, _| {
                counter.fetch_add(1, Ordering::SeqCst);
            },
        )
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(retries.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn escalates_through_strategies_then_succeeds() {
        let calls = Arc::new(AtomicUsize::new(0));
        let strategies = Arc::new(std::sync::Mutex::new(Vec::new()));

        let call_counter = Arc::clone(&calls);
        let strategy_log = Arc::clone(&strategies);
        let result = with_overflow_recovery(
            &[AgentMessage::user("hi")],
            &config(),
            move |_| {
                let n = call_counter.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err("request too large".to_string())
                    } else {
                        Ok("done")
                    }
                }
            },
            move |attempt, strategy| {
                strategy_log.lock().unwrap().push((attempt, strategy));
            },
        )
        .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(
            *strategies.lock().unwrap(),
            vec![
                (1, RetryStrategy::AggressiveTrim),
                (2, RetryStrategy::TruncateOversized),
            ]
        );
    }

    #[tokio::test]
    async fn non_overflow_errors_propagate_immediately() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let result: Result<(), _> = with_overflow_recovery(
            &[AgentMessage::user("hi")],
            &config(),
            move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Err("rate limit exceeded".to_string()) }
            },
            |_, _| {},
        )
        .await;
        assert!(matches!(result, Err(OverflowRecoveryError::Execute(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exhaustion_surfaces_a_distinct_error() {
        let result: Result<(), _> = with_overflow_recovery(
            &[AgentMessage::user("hi")],
            &config(),
            |_| async { Err("context overflow".to_string()) },
            |_, _| {},
        )
        .await;
        let err = result.unwrap_err();
        assert!(matches!(
            err,
            OverflowRecoveryError::Exhausted { attempts: 4, .. }
        ));
        assert!(err.to_string().contains("OVERFLOW_RECOVERY_EXHAUSTED"));
    }

    #[tokio::test]
    async fn truncate_oversized_strategy_shrinks_large_messages() {
        let big = AgentMessage::user("z".repeat(9_000));
        let seen_lens = Arc::new(std::sync::Mutex::new(Vec::new()));

        let log = Arc::clone(&seen_lens);
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let _ignored: Result<(), _> = with_overflow_recovery(
            &[big],
            &config(),
            move |messages| {
                log.lock()
                    .unwrap()
                    .push(messages.iter().map(AgentMessage::content_len).sum::<usize>());
                let n = counter.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err("request too large".to_string())
                    } else {
                        Ok(())
                    }
                }
            },
            |_, _| {},
        )
        .await;

        let lens = seen_lens.lock().unwrap();
        // Attempt 2 saw the 4000-char head plus a short marker.
        assert!(lens[2] < 4_100, "attempt 2 length was {}", lens[2]);
    }

    #[tokio::test]
    async fn minimal_context_keeps_system_plus_tail() {
        let mut messages = vec![AgentMessage::system("SYS")];
        for i in 0..10 {
            messages.push(AgentMessage::user(format!("m{i}")));
        }

        let kept = apply_strategy(&messages, &config(), RetryStrategy::MinimalContext);
        let texts: Vec<String> = kept.iter().map(AgentMessage::text).collect();
        assert_eq!(texts, vec!["SYS", "m6", "m7", "m8", "m9"]);
    }
}
