//! Token estimation utilities.
//!
//! Uses a character-based heuristic: ~4 characters per token. Budgets are
//! enforced in characters; these estimates are only reported alongside the
//! assembled context and prompt.

use webmind_core::provider::PromptMessage;

/// Per-message overhead for role name and delimiters in the API wire format.
const MESSAGE_OVERHEAD: usize = 4;

/// Estimate the token count for a string.
///
/// Heuristic: 1 token ≈ 4 characters. Rounds up.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(4)
}

/// Estimate tokens for a single prompt message including overhead.
pub fn estimate_message_tokens(message: &PromptMessage) -> usize {
    MESSAGE_OVERHEAD + estimate_tokens(&message.content)
}

/// Estimate tokens for a full prompt.
pub fn estimate_prompt_tokens(messages: &[PromptMessage]) -> usize {
    messages.iter().map(estimate_message_tokens).sum()
}
