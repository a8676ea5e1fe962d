//! Per-call tool-result truncation.

use crate::config::ContextPipelineConfig;

/// Window (in chars) before the limit searched for a newline cut point.
const CUT_SEARCH_WINDOW: usize = 200;

/// Cap a tool result before it is fed back to the model.
///
/// The limit is `min(context_limit * 4 * tool_result_max_context_share,
/// tool_result_hard_max)`, lower-bounded by `tool_result_min_keep`. An
/// over-limit result is cut at the last newline within the final 200
/// characters before the limit (falling back to the limit itself) and a
/// marker noting the elided character count is appended.
#[must_use]
pub fn truncate_tool_result(text: &str, config: &ContextPipelineConfig) -> String {
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let share_limit =
        ((config.context_limit * 4) as f64 * config.tool_result_max_context_share) as usize;
    let max_chars = share_limit
        .min(config.tool_result_hard_max)
        .max(config.tool_result_min_keep);

    let total_chars = text.chars().count();
    if total_chars <= max_chars {
        return text.to_string();
    }

    let limit_byte = byte_index_of_char(text, max_chars);
    let window_start_byte =
        byte_index_of_char(text, max_chars.saturating_sub(CUT_SEARCH_WINDOW));
    let cut_byte = text[window_start_byte..limit_byte]
        .rfind('\n')
        .map_or(limit_byte, |offset| window_start_byte + offset);

    let kept = &text[..cut_byte];
    let elided = total_chars - kept.chars().count();
    format!("{kept}\n\n[... truncated {elided} characters ...]")
}

/// Byte index of the `n`th char (or the string's end).
fn byte_index_of_char(s: &str, n: usize) -> usize {
    s.char_indices().nth(n).map_or(s.len(), |(idx, _)| idx)
}
