//! Relevance scorer for freshly fetched content.
//!
//! A cheap lexical heuristic, independent of the relevance index:
//!
//! ```text
//! score = 0.7 × word_match_ratio + 0.3 × length_preference
//! ```
//!
//! `word_match_ratio` is the share of distinct query words found
//! (case-insensitively, as substrings) in the content. `length_preference`
//! is `min(1, 1000 / max(len, 100))` with `len` in chars.

use std::collections::BTreeSet;

pub const WORD_MATCH_WEIGHT: f32 = 0.7;
pub const LENGTH_WEIGHT: f32 = 0.3;

/// Content length (chars) at and below which the length preference is 1.
pub const PREFERRED_LENGTH: f32 = 1000.0;
/// Lengths below this are counted as this.
pub const MIN_COUNTED_LENGTH: usize = 100;

/// Score `content` against `query`. Always in `[0, 1]`.
pub fn score(query: &str, content: &str) -> f32 {
    let score = WORD_MATCH_WEIGHT * word_match_ratio(query, content)
        + LENGTH_WEIGHT * length_preference(content);
    score.clamp(0.0, 1.0)
}

/// Share of distinct query words that occur in `content`. 0 for an empty query.
pub fn word_match_ratio(query: &str, content: &str) -> f32 {
    let words: BTreeSet<String> = query.split_whitespace().map(str::to_lowercase).collect();
    if words.is_empty() {
        return 0.0;
    }

    let haystack = content.to_lowercase();
    let matched = words.iter().filter(|w| haystack.contains(w.as_str())).count();
    matched as f32 / words.len() as f32
}

pub fn length_preference(content: &str) -> f32 {
    let len = content.chars().count().max(MIN_COUNTED_LENGTH);
    (PREFERRED_LENGTH / len as f32).min(1.0)
}
