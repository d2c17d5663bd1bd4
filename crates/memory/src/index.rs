//! Relevance index — lexical vector space over the store's texts.
//!
//! Pure-Rust implementation of:
//! - Case-folded tokenisation with a discounted stop-word list
//! - Term-frequency × smoothed inverse-document-frequency weighting
//! - Cosine similarity over sparse vectors
//!
//! The index is a derived projection of the record store and is always
//! rebuilt whole; the corpus is bounded by `max_history`, so a rebuild is a
//! few dozen short texts.
//!
//! # Degenerate queries
//!
//! - Empty corpus → empty result.
//! - Query with no tokens (blank or punctuation only) → empty result.
//! - Query whose tokens are all out of vocabulary → every (filtered) entry at
//!   similarity 0, in corpus order, up to `k`.

use std::collections::HashMap;
use std::fmt;
use webmind_core::record::RecordId;

use crate::stopwords::is_stop_word;

/// Multiplier applied to stop-word weights.
pub const STOP_WORD_WEIGHT: f64 = 0.01;

type SparseVector = HashMap<String, f64>;

/// What kind of record a corpus entry was projected from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CorpusTag {
    Conversation,
    Tool,
}

impl CorpusTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Conversation => "conversation",
            Self::Tool => "tool",
        }
    }
}

impl fmt::Display for CorpusTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One indexed text.
#[derive(Debug, Clone, PartialEq)]
pub struct CorpusEntry {
    pub text: String,
    pub tag: CorpusTag,
    /// The record this entry was projected from, if any.
    pub record: Option<RecordId>,
}

impl CorpusEntry {
    pub fn new(text: impl Into<String>, tag: CorpusTag) -> Self {
        Self {
            text: text.into(),
            tag,
            record: None,
        }
    }

    pub fn with_record(mut self, id: RecordId) -> Self {
        self.record = Some(id);
        self
    }
}

/// A ranked query result.
#[derive(Debug, Clone, Copy)]
pub struct IndexHit<'a> {
    pub entry: &'a CorpusEntry,
    /// Position of the entry in the corpus.
    pub position: usize,
    /// Cosine similarity in [0, 1].
    pub similarity: f64,
}

/// Split text into lowercase terms of at least two chars.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| token.chars().count() >= 2)
        .map(str::to_lowercase)
        .collect()
}

/// Compute cosine similarity between two sparse vectors.
///
/// Returns 0.0 if either vector is empty or zero.
pub fn cosine_similarity(a: &SparseVector, b: &SparseVector) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    let dot: f64 = small
        .iter()
        .filter_map(|(term, x)| large.get(term).map(|y| x * y))
        .sum();

    let norm_a: f64 = a.values().map(|x| x * x).sum();
    let norm_b: f64 = b.values().map(|y| y * y).sum();

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < 1e-10 {
        return 0.0;
    }

    dot / denom
}

/// Term-frequency vector space over a corpus.
#[derive(Debug, Default)]
pub struct RelevanceIndex {
    entries: Vec<CorpusEntry>,
    vectors: Vec<SparseVector>,
    idf: HashMap<String, f64>,
}

impl RelevanceIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Discard the current vector space and rebuild it from `corpus`.
    pub fn reindex(&mut self, corpus: impl IntoIterator<Item = CorpusEntry>) {
        self.entries = corpus.into_iter().collect();
        let tokenized: Vec<Vec<String>> = self.entries.iter().map(|e| tokenize(&e.text)).collect();

        let mut document_frequency: HashMap<&str, usize> = HashMap::new();
        for tokens in &tokenized {
            let mut seen: Vec<&str> = tokens.iter().map(String::as_str).collect();
            seen.sort_unstable();
            seen.dedup();
            for term in seen {
                *document_frequency.entry(term).or_default() += 1;
            }
        }

        let n = self.entries.len() as f64;
        self.idf = document_frequency
            .into_iter()
            .map(|(term, df)| (term.to_string(), ((1.0 + n) / (1.0 + df as f64)).ln() + 1.0))
            .collect();

        self.vectors = tokenized.iter().map(|tokens| self.vectorize(tokens)).collect();

        tracing::debug!(
            entries = self.entries.len(),
            vocabulary = self.idf.len(),
            "Rebuilt relevance index"
        );
    }

    /// Weight terms that are in the vocabulary; others are dropped.
    fn vectorize(&self, tokens: &[String]) -> SparseVector {
        let mut tf: HashMap<&str, f64> = HashMap::new();
        for token in tokens {
            *tf.entry(token.as_str()).or_default() += 1.0;
        }

        tf.into_iter()
            .filter_map(|(term, count)| {
                let idf = self.idf.get(term)?;
                let discount = if is_stop_word(term) { STOP_WORD_WEIGHT } else { 1.0 };
                Some((term.to_string(), count * idf * discount))
            })
            .collect()
    }

    /// Rank entries by cosine similarity to `text`, most similar first.
    ///
    /// Ties keep corpus order. At most `k` hits are returned.
    pub fn rank(&self, text: &str, k: usize, tag_filter: Option<CorpusTag>) -> Vec<IndexHit<'_>> {
        if self.entries.is_empty() || k == 0 {
            return Vec::new();
        }

        let tokens = tokenize(text);
        if tokens.is_empty() {
            return Vec::new();
        }
        let query = self.vectorize(&tokens);

        let mut hits: Vec<IndexHit<'_>> = self
            .entries
            .iter()
            .zip(&self.vectors)
            .enumerate()
            .filter(|(_, (entry, _))| tag_filter.is_none_or(|tag| entry.tag == tag))
            .map(|(position, (entry, vector))| IndexHit {
                entry,
                position,
                similarity: cosine_similarity(&query, vector),
            })
            .collect();

        // Stable sort keeps insertion order among equal similarities.
        hits.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        hits.truncate(k);
        hits
    }

    /// Texts of the top `k` entries for `text`.
    pub fn query(&self, text: &str, k: usize, tag_filter: Option<CorpusTag>) -> Vec<&str> {
        self.rank(text, k, tag_filter)
            .into_iter()
            .map(|hit| hit.entry.text.as_str())
            .collect()
    }

    pub fn entries(&self) -> &[CorpusEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop the corpus and vocabulary.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.vectors.clear();
        self.idf.clear();
    }
}
