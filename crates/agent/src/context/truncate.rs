//! Word-safe truncation under a character budget.
//!
//! Oversized text keeps a head (70% of the room left after the ellipsis) and
//! a tail (the remaining 30%), joined by [`ELLIPSIS`]. Each cut moves inward
//! to the nearest whitespace so no word is split. All lengths are counted in
//! chars.

/// Marker placed between head and tail.
pub const ELLIPSIS: &str = " ... ";

const HEAD_SHARE_PERCENT: usize = 70;

/// Truncate `text` to at most `budget` chars.
///
/// Text already within budget is returned unchanged. A budget smaller than
/// the ellipsis yields an empty string.
pub fn truncate(text: &str, budget: usize) -> String {
    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();
    if len <= budget {
        return text.to_string();
    }

    let ellipsis_cost = ELLIPSIS.chars().count();
    if budget < ellipsis_cost {
        return String::new();
    }

    let available = budget - ellipsis_cost;
    let head_budget = available * HEAD_SHARE_PERCENT / 100;
    let tail_budget = available - head_budget;

    // len > budget, so head_budget < len and tail_start > head_budget.
    let mut head_end = head_budget;
    while head_end > 0 && !chars[head_end].is_whitespace() {
        head_end -= 1;
    }

    let mut tail_start = len - tail_budget;
    while tail_start < len && !chars[tail_start - 1].is_whitespace() {
        tail_start += 1;
    }

    let head: String = chars[..head_end].iter().collect();
    let tail: String = chars[tail_start..].iter().collect();
    format!("{}{ELLIPSIS}{}", head.trim_end(), tail.trim_start())
}

/// Keep at most `max_chars` chars from the start of `text`, cutting at the
/// last whitespace when there is one.
pub fn clip_head(text: &str, max_chars: usize) -> &str {
    let Some((cut, _)) = text.char_indices().nth(max_chars) else {
        return text;
    };

    let prefix = &text[..cut];
    let word_safe = if text[cut..].starts_with(char::is_whitespace) {
        prefix
    } else {
        prefix
            .rfind(char::is_whitespace)
            .map_or(prefix, |pos| &prefix[..pos])
    };
    word_safe.trim_end()
}
