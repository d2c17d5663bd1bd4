//! Context assembly — fetch, score, rank, render, truncate, persist.
//!
//! Builds the single string handed to the model for one query:
//!
//! 1. Resolve every candidate concurrently (fan-out/fan-in) under one overall
//!    timeout. A failed, empty or unfinished fetch excludes only that
//!    candidate.
//! 2. Score candidates that arrive without a score.
//! 3. Rank by score, descending. Equal scores keep discovery order.
//! 4. Render each as a labelled section, body capped per item.
//! 5. Append relevant past tool records and recent conversation from memory.
//! 6. Truncate the whole to the character budget (70/30 head/tail).
//! 7. Persist newly scored candidates as tool records.
//!
//! Nothing data-dependent escapes as an error: exclusions are reported in
//! the returned [`AssembledContext`].

use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use webmind_config::AppConfig;
use webmind_core::error::FetchError;
use webmind_core::record::{RecordId, ToolRecord};
use webmind_memory::{NewToolRecord, RecentTurn, SessionMemory};

use crate::context::{scorer, token, truncate};

// ── Types ─────────────────────────────────────────────────────────────────

/// Content of a candidate: already in hand, or still to be fetched.
pub enum CandidateContent {
    Ready(String),
    Pending(BoxFuture<'static, Result<String, FetchError>>),
}

impl std::fmt::Debug for CandidateContent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ready(text) => f.debug_tuple("Ready").field(&text.len()).finish(),
            Self::Pending(_) => f.write_str("Pending"),
        }
    }
}

/// A source that may contribute to the context.
#[derive(Debug)]
pub struct Candidate {
    /// URL or other identifier shown in the rendered section.
    pub source_id: String,
    /// Tool kind that produced the content (e.g. "browser").
    pub kind: String,
    pub content: CandidateContent,
    /// Pre-computed relevance. `None` means score on arrival.
    pub score: Option<f32>,
}

impl Candidate {
    pub fn ready(
        source_id: impl Into<String>,
        kind: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            kind: kind.into(),
            content: CandidateContent::Ready(content.into()),
            score: None,
        }
    }

    pub fn pending<F>(source_id: impl Into<String>, kind: impl Into<String>, fetch: F) -> Self
    where
        F: Future<Output = Result<String, FetchError>> + Send + 'static,
    {
        Self {
            source_id: source_id.into(),
            kind: kind.into(),
            content: CandidateContent::Pending(Box::pin(fetch)),
            score: None,
        }
    }

    /// Use `score` instead of scoring on arrival. Pre-scored candidates are
    /// not persisted again.
    pub fn with_score(mut self, score: f32) -> Self {
        self.score = Some(score);
        self
    }
}

/// A candidate that made it into the ranking.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedSource {
    pub source_id: String,
    pub kind: String,
    pub score: f32,
}

/// A candidate left out of the context, and why.
#[derive(Debug, Clone, PartialEq)]
pub struct Exclusion {
    pub source_id: String,
    pub kind: String,
    pub reason: FetchError,
}

/// The bounded context for one query.
#[derive(Debug, Clone)]
pub struct AssembledContext {
    /// Final context string, at most `budget_chars` chars.
    pub context: String,
    /// Tool records created for newly scored candidates, in discovery order.
    pub new_records: Vec<Arc<ToolRecord>>,
    /// Ranked sources, best first.
    pub ranked: Vec<RankedSource>,
    pub exclusions: Vec<Exclusion>,
    /// Whether the budget forced a head/tail cut.
    pub truncated: bool,
    /// Rough token count of `context` (4 chars per token).
    pub estimated_tokens: usize,
}

impl AssembledContext {
    pub fn is_empty(&self) -> bool {
        self.context.is_empty()
    }
}

/// Limits applied during assembly.
#[derive(Debug, Clone)]
pub struct AssemblyPolicy {
    /// Global budget for the context string, in chars.
    pub budget_chars: usize,
    /// Cap on each candidate body and each recalled tool record, in chars.
    pub per_item_chars: usize,
    /// Past tool records recalled from the index.
    pub recall_k: usize,
    /// Recent conversation turns rendered.
    pub history_entries: usize,
    /// Bound on the whole fetch phase.
    pub timeout: Duration,
}

impl Default for AssemblyPolicy {
    fn default() -> Self {
        Self {
            budget_chars: 4000,
            per_item_chars: 1000,
            recall_k: 3,
            history_entries: 10,
            timeout: Duration::from_secs(30),
        }
    }
}

impl AssemblyPolicy {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            budget_chars: config.context.budget_chars,
            per_item_chars: config.context.per_item_chars,
            recall_k: config.memory.recall_k,
            history_entries: config.memory.history_entries,
            timeout: Duration::from_secs(config.context.assembly_timeout_secs),
        }
    }
}

/// A resolved candidate, before ranking.
struct Resolved {
    position: usize,
    source_id: String,
    kind: String,
    content: String,
    score: f32,
    newly_scored: bool,
}

// ── Assembler ─────────────────────────────────────────────────────────────

/// The context assembler. Holds a handle to the session memory it reads
/// history from and persists into.
#[derive(Debug, Clone)]
pub struct ContextAssembler {
    memory: SessionMemory,
    policy: AssemblyPolicy,
}

impl ContextAssembler {
    pub fn new(memory: SessionMemory, policy: AssemblyPolicy) -> Self {
        Self { memory, policy }
    }

    pub fn policy(&self) -> &AssemblyPolicy {
        &self.policy
    }

    pub fn memory(&self) -> &SessionMemory {
        &self.memory
    }

    /// Build the bounded context for `query` from `candidates` and memory.
    pub async fn build_context(
        &self,
        query: &str,
        candidates: Vec<Candidate>,
    ) -> AssembledContext {
        self.build_context_skipping(query, candidates, &[]).await
    }

    /// Like [`build_context`](Self::build_context), but tool records in
    /// `skip_recall` are never recalled as relevant history. Callers pass the
    /// records they created for this same query.
    pub async fn build_context_skipping(
        &self,
        query: &str,
        candidates: Vec<Candidate>,
        skip_recall: &[RecordId],
    ) -> AssembledContext {
        let total = candidates.len();
        let (resolved, exclusions) = self.resolve(query, candidates).await;

        let mut ranked = resolved;
        // Stable sort keeps discovery order among equal scores.
        ranked.sort_by(|a, b| b.score.total_cmp(&a.score));

        let mut sections: Vec<String> = ranked
            .iter()
            .map(|r| {
                format!(
                    "Content from {} (relevance: {:.2}):\n{}",
                    r.source_id,
                    r.score,
                    truncate::clip_head(&r.content, self.policy.per_item_chars)
                )
            })
            .collect();

        // Recall before persisting so new candidates do not recall themselves.
        // Records already shown under a recent turn are not recalled again.
        let turns = self.recent_turns().await;
        let mut skip: HashSet<RecordId> = skip_recall.iter().copied().collect();
        skip.extend(turns.iter().flat_map(|t| t.tools.iter().map(|record| record.id)));

        if let Some(section) = self.render_relevant_history(query, &skip).await {
            sections.push(section);
        }
        if let Some(section) = self.render_conversation_history(&turns) {
            sections.push(section);
        }

        let full = sections.join("\n\n");
        let context = truncate::truncate(&full, self.policy.budget_chars);
        let truncated = full.chars().count() > self.policy.budget_chars;

        let new_records = self.persist(&ranked).await;

        info!(
            candidates = total,
            ranked = ranked.len(),
            excluded = exclusions.len(),
            persisted = new_records.len(),
            chars = context.chars().count(),
            truncated,
            "Context assembled"
        );

        AssembledContext {
            estimated_tokens: token::estimate_tokens(&context),
            context,
            new_records,
            ranked: ranked
                .into_iter()
                .map(|r| RankedSource {
                    source_id: r.source_id,
                    kind: r.kind,
                    score: r.score,
                })
                .collect(),
            exclusions,
            truncated,
        }
    }

    // ── Fetch phase ───────────────────────────────────────────────────────

    /// Fetch pending candidates concurrently and score everything that
    /// arrived. Output keeps discovery order.
    async fn resolve(
        &self,
        query: &str,
        candidates: Vec<Candidate>,
    ) -> (Vec<Resolved>, Vec<Exclusion>) {
        let mut outcomes: Vec<Option<Result<String, FetchError>>> =
            Vec::with_capacity(candidates.len());
        let mut meta: Vec<(String, String, Option<f32>)> = Vec::with_capacity(candidates.len());
        let mut in_flight = FuturesUnordered::new();

        for (position, candidate) in candidates.into_iter().enumerate() {
            meta.push((candidate.source_id, candidate.kind, candidate.score));
            match candidate.content {
                CandidateContent::Ready(text) => outcomes.push(Some(Ok(text))),
                CandidateContent::Pending(fetch) => {
                    outcomes.push(None);
                    in_flight.push(async move { (position, fetch.await) });
                }
            }
        }

        if !in_flight.is_empty() {
            let pending = in_flight.len();
            let gather = async {
                while let Some((position, result)) = in_flight.next().await {
                    outcomes[position] = Some(result);
                }
            };
            if tokio::time::timeout(self.policy.timeout, gather).await.is_err() {
                warn!(
                    pending,
                    timeout_secs = self.policy.timeout.as_secs_f64(),
                    "Context assembly timed out; continuing with completed candidates"
                );
            }
        }

        let mut resolved = Vec::new();
        let mut exclusions = Vec::new();
        let arrivals = meta.into_iter().zip(outcomes).enumerate();
        for (position, ((source_id, kind, preset), outcome)) in arrivals {
            let result = match outcome {
                Some(Ok(text)) if text.trim().is_empty() => {
                    Err(FetchError::Empty(source_id.clone()))
                }
                Some(result) => result,
                None => Err(FetchError::Timeout(source_id.clone())),
            };

            match result {
                Ok(content) => {
                    let (score, newly_scored) = match preset {
                        Some(score) => (score, false),
                        None => (scorer::score(query, &content), true),
                    };
                    debug!(source = %source_id, score, "Scored candidate");
                    resolved.push(Resolved {
                        position,
                        source_id,
                        kind,
                        content,
                        score,
                        newly_scored,
                    });
                }
                Err(reason) => {
                    warn!(
                        source = %source_id,
                        kind = %kind,
                        error = %reason,
                        "Excluding candidate"
                    );
                    exclusions.push(Exclusion { source_id, kind, reason });
                }
            }
        }

        (resolved, exclusions)
    }

    // ── Memory sections ───────────────────────────────────────────────────

    async fn render_relevant_history(
        &self,
        query: &str,
        skip: &HashSet<RecordId>,
    ) -> Option<String> {
        if self.policy.recall_k == 0 {
            return None;
        }
        let records = self
            .memory
            .relevant_tool_outputs(query, self.policy.recall_k + skip.len())
            .await;

        let entries: Vec<String> = records
            .iter()
            .filter(|record| !skip.contains(&record.id))
            .take(self.policy.recall_k)
            .map(|record| {
                let rendered = format!(
                    "[Tool: {}]\nInput: {}\nOutput: {}",
                    record.kind, record.input, record.output
                );
                truncate::clip_head(&rendered, self.policy.per_item_chars).to_string()
            })
            .collect();
        if entries.is_empty() {
            return None;
        }
        Some(format!("Relevant History:\n{}", entries.join("\n\n")))
    }

    async fn recent_turns(&self) -> Vec<RecentTurn> {
        if self.policy.history_entries == 0 {
            return Vec::new();
        }
        self.memory
            .recent_turns(Some(self.policy.history_entries))
            .await
    }

    /// Each turn followed by its tool records, every record capped per item.
    fn render_conversation_history(&self, turns: &[RecentTurn]) -> Option<String> {
        if turns.is_empty() {
            return None;
        }
        let lines: Vec<String> = turns
            .iter()
            .map(|recent| {
                let mut out = recent.turn.render_line();
                for record in &recent.tools {
                    out.push('\n');
                    let rendered = record.render();
                    out.push_str(truncate::clip_head(&rendered, self.policy.per_item_chars));
                }
                out
            })
            .collect();
        Some(format!("Conversation History:\n{}", lines.join("\n")))
    }

    // ── Persistence ───────────────────────────────────────────────────────

    /// Store newly scored candidates, in discovery order, with one reindex.
    async fn persist(&self, ranked: &[Resolved]) -> Vec<Arc<ToolRecord>> {
        let mut fresh: Vec<&Resolved> = ranked.iter().filter(|r| r.newly_scored).collect();
        if fresh.is_empty() {
            return Vec::new();
        }
        fresh.sort_by_key(|r| r.position);

        let batch = fresh
            .into_iter()
            .map(|r| NewToolRecord::new(r.kind.clone(), r.source_id.clone(), r.content.clone()))
            .collect();
        self.memory.append_tools(batch).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use webmind_core::record::Role;

    fn assembler(memory: &SessionMemory) -> ContextAssembler {
        ContextAssembler::new(memory.clone(), AssemblyPolicy::default())
    }

    fn fetched(text: &str) -> impl Future<Output = Result<String, FetchError>> + Send + 'static {
        let text = text.to_string();
        async move { Ok(text) }
    }

    fn failing(url: &str) -> impl Future<Output = Result<String, FetchError>> + Send + 'static {
        let err = FetchError::Network {
            url: url.to_string(),
            reason: "connection refused".into(),
        };
        async move { Err(err) }
    }

    #[tokio::test]
    async fn failed_fetch_is_isolated() {
        let memory = SessionMemory::with_capacity(10);
        let candidates = vec![
            Candidate::pending(
                "https://a.example",
                "browser",
                fetched("Rust is a systems language"),
            ),
            Candidate::pending("https://b.example", "browser", failing("https://b.example")),
            Candidate::pending(
                "https://c.example",
                "browser",
                fetched("Rust has a borrow checker"),
            ),
        ];

        let result = assembler(&memory).build_context("rust", candidates).await;

        assert_eq!(result.ranked.len(), 2);
        assert_eq!(result.exclusions.len(), 1);
        assert_eq!(result.exclusions[0].source_id, "https://b.example");
        assert!(matches!(result.exclusions[0].reason, FetchError::Network { .. }));
        assert!(result.context.contains("Content from https://a.example"));
        assert!(result.context.contains("Content from https://c.example"));
        assert!(!result.context.contains("https://b.example"));
    }

    #[tokio::test]
    async fn empty_content_is_excluded() {
        let memory = SessionMemory::with_capacity(10);
        let candidates = vec![
            Candidate::ready("https://blank.example", "browser", "   \n"),
            Candidate::ready("https://full.example", "browser", "some text"),
        ];

        let result = assembler(&memory).build_context("text", candidates).await;

        assert_eq!(result.ranked.len(), 1);
        assert_eq!(
            result.exclusions[0].reason,
            FetchError::Empty("https://blank.example".into())
        );
    }

    #[tokio::test]
    async fn ranks_by_score_with_stable_ties() {
        let memory = SessionMemory::with_capacity(10);
        let candidates = vec![
            Candidate::ready("first", "browser", "x").with_score(0.5),
            Candidate::ready("best", "browser", "x").with_score(0.9),
            Candidate::ready("second", "browser", "x").with_score(0.5),
        ];

        let result = assembler(&memory).build_context("q", candidates).await;

        let order: Vec<&str> = result.ranked.iter().map(|r| r.source_id.as_str()).collect();
        assert_eq!(order, vec!["best", "first", "second"]);
    }

    #[tokio::test]
    async fn renders_labelled_sections() {
        let memory = SessionMemory::with_capacity(10);
        let candidates = vec![Candidate::ready(
            "https://python.org",
            "browser",
            "Python is a popular programming language",
        )];

        let result = assembler(&memory)
            .build_context("python programming", candidates)
            .await;

        assert_eq!(
            result.context,
            "Content from https://python.org (relevance: 1.00):\nPython is a popular programming language"
        );
        assert!(!result.truncated);
        assert_eq!(result.estimated_tokens, token::estimate_tokens(&result.context));
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_keeps_completed_candidates() {
        let memory = SessionMemory::with_capacity(10);
        let policy = AssemblyPolicy {
            timeout: Duration::from_millis(50),
            ..AssemblyPolicy::default()
        };
        let candidates = vec![
            Candidate::pending("https://slow.example", "browser", async {
                std::future::pending::<()>().await;
                Ok(String::new())
            }),
            Candidate::pending("https://fast.example", "browser", fetched("fast content")),
        ];

        let result = ContextAssembler::new(memory, policy)
            .build_context("content", candidates)
            .await;

        assert_eq!(result.ranked.len(), 1);
        assert_eq!(result.ranked[0].source_id, "https://fast.example");
        assert_eq!(
            result.exclusions[0].reason,
            FetchError::Timeout("https://slow.example".into())
        );
    }

    #[tokio::test]
    async fn persists_newly_scored_candidates_in_discovery_order() {
        let memory = SessionMemory::with_capacity(10);
        let candidates = vec![
            Candidate::ready("https://low.example", "browser", "nothing relevant here"),
            Candidate::ready("https://high.example", "http", "rust rust rust"),
            Candidate::ready("https://known.example", "browser", "rust").with_score(0.2),
        ];

        let result = assembler(&memory).build_context("rust", candidates).await;

        assert_eq!(result.ranked[0].source_id, "https://high.example");
        let persisted: Vec<(&str, String)> = result
            .new_records
            .iter()
            .map(|r| (r.kind.as_str(), r.input.to_string()))
            .collect();
        assert_eq!(
            persisted,
            vec![
                ("browser", "https://low.example".to_string()),
                ("http", "https://high.example".to_string()),
            ]
        );
        assert_eq!(memory.stats().await.tools, 2);
    }

    #[tokio::test]
    async fn new_candidates_do_not_recall_themselves() {
        let memory = SessionMemory::with_capacity(10);
        let candidates = vec![Candidate::ready("https://a.example", "browser", "rust memory")];

        let result = assembler(&memory).build_context("rust", candidates).await;

        assert!(!result.context.contains("Relevant History:"));
        assert_eq!(result.new_records.len(), 1);
    }

    #[tokio::test]
    async fn includes_relevant_history_and_conversation() {
        let memory = SessionMemory::with_capacity(10);
        memory
            .append_tool("search", "rust ownership", "Rust ownership rules")
            .await;
        memory.append_conversation(Role::User, "tell me about rust", vec![]).await;

        let result = assembler(&memory).build_context("rust", vec![]).await;

        assert!(result.context.contains(
            "Relevant History:\n[Tool: search]\nInput: rust ownership\nOutput: Rust ownership rules"
        ));
        assert!(result.context.contains("Conversation History:\nuser: tell me about rust"));
        assert!(result.new_records.is_empty());
    }

    #[tokio::test]
    async fn skipped_records_are_not_recalled() {
        let memory = SessionMemory::with_capacity(10);
        let own = memory.append_tool("search", "rust", "hit list").await;
        memory
            .append_tool("browser", "https://old.example", "rust notes")
            .await;

        let result = assembler(&memory)
            .build_context_skipping("rust", vec![], &[own.id])
            .await;

        assert!(result.context.contains("Input: https://old.example"));
        assert!(!result.context.contains("[Tool: search]"));
    }

    #[tokio::test]
    async fn turn_attached_record_renders_once_and_capped() {
        let memory = SessionMemory::with_capacity(10);
        let policy = AssemblyPolicy {
            per_item_chars: 100,
            ..AssemblyPolicy::default()
        };
        let body = format!("Rust page body {}", "filler ".repeat(50));
        memory
            .append_tool("browser", "https://a.example", body.as_str())
            .await;
        memory.record_turn(Role::User, "tell me about rust").await;

        let result = ContextAssembler::new(memory, policy)
            .build_context("tell me about rust", vec![])
            .await;

        assert_eq!(result.context.matches("Rust page body").count(), 1);
        assert!(!result.context.contains("Relevant History:"));
        let history = result
            .context
            .split_once("Conversation History:\n")
            .map(|(_, rest)| rest)
            .unwrap();
        let turn_line = "user: tell me about rust\n";
        assert!(history.starts_with("user: tell me about rust\n[Tool Output - browser]"));
        assert!(history.chars().count() <= turn_line.len() + 100);
    }

    #[tokio::test]
    async fn context_respects_budget() {
        let memory = SessionMemory::with_capacity(10);
        let policy = AssemblyPolicy {
            budget_chars: 200,
            ..AssemblyPolicy::default()
        };
        let body = "word ".repeat(200);
        let candidates = vec![
            Candidate::ready("https://a.example", "browser", body.clone()),
            Candidate::ready("https://b.example", "browser", body),
        ];

        let result = ContextAssembler::new(memory, policy)
            .build_context("word", candidates)
            .await;

        assert!(result.truncated);
        assert!(result.context.chars().count() <= 200);
        assert!(result.context.contains(truncate::ELLIPSIS));
        assert!(result.context.starts_with("Content from https://a.example"));
    }

    #[tokio::test]
    async fn per_item_cap_limits_each_body() {
        let memory = SessionMemory::with_capacity(10);
        let policy = AssemblyPolicy {
            per_item_chars: 20,
            ..AssemblyPolicy::default()
        };
        let candidates = vec![Candidate::ready(
            "https://a.example",
            "browser",
            "alpha beta gamma delta epsilon zeta eta theta",
        )];

        let result = ContextAssembler::new(memory, policy)
            .build_context("alpha", candidates)
            .await;

        assert!(result.context.ends_with("\nalpha beta gamma"));
        // the full content is still what gets stored
        assert!(result.new_records[0].output.to_string().ends_with("theta"));
    }

    #[tokio::test]
    async fn no_candidates_and_no_memory_is_empty() {
        let memory = SessionMemory::with_capacity(10);
        let result = assembler(&memory).build_context("anything", vec![]).await;
        assert!(result.is_empty());
        assert!(result.ranked.is_empty() && result.exclusions.is_empty());
    }
}
