//! End-to-end integration tests for webmind.
//!
//! These tests drive a full session from user input to provider request,
//! with scripted collaborators standing in for the network.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use webmind_agent::context::{ELLIPSIS, truncate};
use webmind_agent::{AgentSession, AssemblyPolicy, Candidate, Collaborators, ContextAssembler};
use webmind_config::AppConfig;
use webmind_core::capability::{
    BrowseCapability, HttpCapability, HttpResponse, SearchCapability, SearchHit,
};
use webmind_core::error::{Error, FetchError, ProviderError};
use webmind_core::provider::{PromptRole, Provider, ProviderRequest, ProviderResponse, Usage};
use webmind_core::record::Role;
use webmind_memory::{RecordStore, SessionMemory};

// ── Mock Collaborators ───────────────────────────────────────────────────

struct ScriptedSearch {
    hits: Vec<SearchHit>,
}

#[async_trait::async_trait]
impl SearchCapability for ScriptedSearch {
    async fn search(&self, _query: &str) -> Vec<SearchHit> {
        self.hits.clone()
    }
}

/// Serves known pages; everything else is unreachable (empty text).
struct ScriptedBrowser {
    pages: HashMap<String, String>,
    slow: Option<(String, Duration)>,
}

#[async_trait::async_trait]
impl BrowseCapability for ScriptedBrowser {
    async fn fetch(&self, url: &str) -> String {
        if let Some((slow_url, delay)) = &self.slow {
            if slow_url == url {
                tokio::time::sleep(*delay).await;
            }
        }
        self.pages.get(url).cloned().unwrap_or_default()
    }
}

struct ScriptedHttp;

#[async_trait::async_trait]
impl HttpCapability for ScriptedHttp {
    async fn request(&self, url: &str) -> Result<HttpResponse, FetchError> {
        Ok(HttpResponse {
            status_code: 200,
            content_type: "application/json".into(),
            body: format!(r#"{{"url":"{url}","stars":42}}"#),
        })
    }
}

// ── Mock Provider ────────────────────────────────────────────────────────

/// A mock provider that returns scripted responses in sequence and keeps
/// every request it saw.
struct ScriptedProvider {
    responses: Mutex<Vec<Result<ProviderResponse, ProviderError>>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    fn new(responses: Vec<Result<ProviderResponse, ProviderError>>) -> Self {
        Self {
            responses: Mutex::new(responses),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn text(replies: &[&str]) -> Self {
        Self::new(replies.iter().map(|r| Ok(text_response(r))).collect())
    }

    fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn system_prompt(&self, call: usize) -> String {
        let requests = self.requests.lock().unwrap();
        let message = &requests[call].messages[0];
        assert_eq!(message.role, PromptRole::System);
        message.content.clone()
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "e2e_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let call = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request);
            requests.len() - 1
        };
        let mut responses = self.responses.lock().unwrap();
        assert!(
            !responses.is_empty(),
            "ScriptedProvider exhausted: call #{call}"
        );
        responses.remove(0)
    }
}

fn text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        content: text.into(),
        model: "mock-model".into(),
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
    }
}

// ── Fixtures ─────────────────────────────────────────────────────────────

fn hit(link: &str) -> SearchHit {
    SearchHit {
        title: format!("Page at {link}"),
        link: link.into(),
        snippet: String::new(),
    }
}

fn collaborators(pages: &[(&str, &str)], slow: Option<(&str, Duration)>) -> Collaborators {
    let hits = pages.iter().map(|(link, _)| hit(link)).collect();
    let pages = pages
        .iter()
        .filter(|(_, body)| !body.is_empty())
        .map(|(link, body)| (link.to_string(), body.to_string()))
        .collect();
    Collaborators {
        search: Arc::new(ScriptedSearch { hits }),
        browser: Arc::new(ScriptedBrowser {
            pages,
            slow: slow.map(|(url, delay)| (url.to_string(), delay)),
        }),
        http: Arc::new(ScriptedHttp),
    }
}

fn config(max_history: usize) -> AppConfig {
    let mut config = AppConfig::default();
    config.memory.max_history = max_history;
    config
}

// ── Research ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_one_failed_source_does_not_sink_the_others() {
    let tools = collaborators(
        &[
            ("https://a.example", "Tokio is an async runtime for Rust"),
            ("https://b.example", ""),
            ("https://c.example", "Rust async tasks are driven by an executor"),
        ],
        None,
    );
    let session = AgentSession::from_config(&config(50), tools);

    let assembled = session.research("rust async runtime").await;

    assert_eq!(assembled.ranked.len(), 2);
    assert_eq!(assembled.exclusions.len(), 1);
    assert_eq!(assembled.exclusions[0].source_id, "https://b.example");
    assert_eq!(
        assembled.exclusions[0].reason,
        FetchError::Empty("https://b.example".into())
    );
    assert!(assembled.context.contains("Content from https://a.example"));
    assert!(assembled.context.contains("Content from https://c.example"));

    // The search record plus one browser record per fetched page.
    let tools = session.memory().tool_records().await;
    let kinds: Vec<&str> = tools.iter().map(|t| t.kind.as_str()).collect();
    assert_eq!(kinds, vec!["search", "browser", "browser"]);
    assert_eq!(tools[1].input.to_string(), "https://a.example");
    assert_eq!(tools[2].input.to_string(), "https://c.example");
}

#[tokio::test(start_paused = true)]
async fn e2e_slow_source_times_out_and_the_rest_is_kept() {
    let tools = collaborators(
        &[
            ("https://fast.example", "Ownership rules in Rust"),
            ("https://slow.example", "Borrowing rules in Rust"),
        ],
        Some(("https://slow.example", Duration::from_secs(120))),
    );
    let mut config = config(50);
    config.context.assembly_timeout_secs = 5;
    let session = AgentSession::from_config(&config, tools);

    let assembled = session.research("rust ownership").await;

    assert_eq!(assembled.ranked.len(), 1);
    assert_eq!(assembled.ranked[0].source_id, "https://fast.example");
    assert_eq!(
        assembled.exclusions[0].reason,
        FetchError::Timeout("https://slow.example".into())
    );
}

#[tokio::test]
async fn e2e_fetched_pages_are_recalled_on_the_next_query() {
    let tools = collaborators(
        &[("https://rust.example", "The borrow checker enforces aliasing rules")],
        None,
    );
    let session = AgentSession::from_config(&config(50), tools);

    let first = session.research("borrow checker").await;
    // Neither the fresh page nor this query's own hit list is recalled.
    assert!(!first.context.contains("Relevant History:"));

    let second = session.context("borrow checker aliasing").await;
    assert!(second.context.contains("Relevant History:"));
    assert!(second.context.contains("[Tool: browser]\nInput: https://rust.example"));
    assert!(second.ranked.is_empty());
    assert!(second.new_records.is_empty());
}

// ── Bounded history ──────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_history_is_bounded_per_kind() {
    let provider = Arc::new(ScriptedProvider::text(&["one", "two", "three"]));
    let session = AgentSession::from_config(&config(4), collaborators(&[], None))
        .with_provider(provider.clone(), "mock-model");

    for i in 1..=5 {
        session.http(&format!("https://{i}.example")).await.unwrap();
    }
    for msg in ["first question", "second question", "third question"] {
        session.respond(msg).await.unwrap();
    }

    let stats = session.memory().stats().await;
    assert_eq!(stats.tools, 4);
    assert_eq!(stats.conversations, 4);
    assert_eq!(stats.indexed, 8);

    let messages = session.memory().recent_conversation(None).await;
    assert_eq!(messages.first().map(String::as_str), Some("user: second question"));
    assert_eq!(messages.last().map(String::as_str), Some("assistant: three"));

    // The oldest http record was evicted; the newest survives.
    let inputs: Vec<String> = session
        .memory()
        .tool_records()
        .await
        .iter()
        .map(|t| t.input.to_string())
        .collect();
    assert_eq!(inputs.first().map(String::as_str), Some("https://2.example"));
    assert_eq!(inputs.last().map(String::as_str), Some("https://5.example"));
}

#[tokio::test]
async fn e2e_store_output_limit_applies_to_fetched_pages() {
    let long_page = "rust ".repeat(500);
    let tools = collaborators(&[("https://long.example", long_page.as_str())], None);
    let mut config = config(10);
    config.memory.max_tool_output_chars = 100;
    let session = AgentSession::from_config(&config, tools);

    let text = session.browse("https://long.example").await.unwrap();
    assert_eq!(text, long_page);

    let stored = session.memory().tool_records().await;
    assert!(stored[0].output.char_len() < long_page.len());
}

// ── Truncation ───────────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_context_respects_the_budget() {
    let pages: Vec<(String, String)> = (0..4)
        .map(|i| {
            (
                format!("https://{i}.example"),
                format!("rust memory safety article number {i} ").repeat(40),
            )
        })
        .collect();
    let memory = SessionMemory::new(RecordStore::new(20));
    let policy = AssemblyPolicy {
        budget_chars: 600,
        ..AssemblyPolicy::default()
    };
    let assembler = ContextAssembler::new(memory, policy);
    let candidates = pages
        .iter()
        .map(|(id, body)| Candidate::ready(id.clone(), "browser", body.clone()))
        .collect();

    let assembled = assembler.build_context("rust memory safety", candidates).await;

    assert!(assembled.truncated);
    assert!(assembled.context.chars().count() <= 600);
    assert!(assembled.context.contains(ELLIPSIS));
    assert!(assembled.context.starts_with("Content from https://0.example"));
    assert_eq!(assembled.estimated_tokens, assembled.context.chars().count().div_ceil(4));
}

#[test]
fn e2e_truncation_is_word_safe_and_idempotent() {
    let text = "alpha beta gamma delta epsilon zeta eta theta iota kappa lambda mu";
    for budget in [12, 20, 33, 50] {
        let cut = truncate(text, budget);
        assert!(cut.chars().count() <= budget, "budget {budget}: {cut:?}");
        for word in cut.split(ELLIPSIS).flat_map(str::split_whitespace) {
            assert!(text.split_whitespace().any(|w| w == word), "partial word {word:?}");
        }
        assert_eq!(truncate(&cut, budget), cut);
    }
    assert_eq!(truncate(text, 1000), text);
}

// ── Full turn ────────────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_full_turn_sends_context_to_the_provider() {
    let tools = collaborators(
        &[("https://tokio.example", "Tokio schedules async tasks on a work stealing runtime")],
        None,
    );
    let provider = Arc::new(ScriptedProvider::text(&[
        "Tokio uses work stealing.",
        "Yes, it is multi-threaded by default.",
    ]));
    let session = AgentSession::from_config(&config(50), tools)
        .with_provider(provider.clone(), "mock-model");

    session.research("tokio runtime").await;
    let outcome = session.respond("how does the tokio runtime schedule tasks?").await.unwrap();

    assert_eq!(outcome.reply, "Tokio uses work stealing.");
    assert_eq!(outcome.usage.map(|u| u.total_tokens), Some(15));
    let system = provider.system_prompt(0);
    assert!(system.contains("Context:"));
    // The research records hang off the user turn and are rendered there once.
    assert!(!system.contains("Relevant History:"));
    assert!(system.contains("[Tool Output - browser]\nInput: https://tokio.example"));
    assert_eq!(system.matches("work stealing runtime").count(), 1);
    assert!(
        system.contains("Conversation History:\nuser: how does the tokio runtime schedule tasks?")
    );

    // The second turn sees the first exchange.
    session.respond("is it multi-threaded?").await.unwrap();
    let system = provider.system_prompt(1);
    assert!(system.contains("assistant: Tokio uses work stealing."));
    assert_eq!(provider.calls(), 2);

    // Turns carry the tool records created before them.
    let turns = session.memory().conversation_records().await;
    assert_eq!(turns[0].role, Role::User);
    assert_eq!(turns[0].related_tools.len(), 2);
    assert!(turns[1].related_tools.is_empty());
}

#[tokio::test]
async fn e2e_http_json_is_remembered_structured() {
    let session = AgentSession::from_config(&config(10), collaborators(&[], None));
    let response = session.http("https://api.example/repo").await.unwrap();
    assert_eq!(response.status_code, 200);

    let record = &session.memory().tool_records().await[0];
    assert_eq!(record.kind, "http");
    let rendered = record.output.to_string();
    let value: serde_json::Value = serde_json::from_str(&rendered).unwrap();
    assert_eq!(value["status_code"], 200);
    assert_eq!(value["body"]["stars"], 42);
}

#[tokio::test]
async fn e2e_provider_failure_surfaces_and_keeps_the_user_turn() {
    let provider = Arc::new(ScriptedProvider::new(vec![Err(ProviderError::RateLimited {
        retry_after_secs: 30,
    })]));
    let session = AgentSession::from_config(&config(10), collaborators(&[], None))
        .with_provider(provider, "mock-model");

    let err = session.respond("hello?").await.unwrap_err();
    assert!(matches!(err, Error::Provider(ProviderError::RateLimited { .. })));
    assert_eq!(session.memory().recent_conversation(None).await, vec!["user: hello?"]);
}

#[tokio::test]
async fn e2e_chat_without_provider_is_not_configured() {
    let session = AgentSession::from_config(&config(10), collaborators(&[], None));
    let err = session.respond("hello?").await.unwrap_err();
    assert!(matches!(err, Error::Provider(ProviderError::NotConfigured(_))));
    assert_eq!(session.memory().stats().await.conversations, 0);
}

// ── Configuration ────────────────────────────────────────────────────────

#[test]
fn e2e_config_file_drives_policy() {
    let config: AppConfig = toml::from_str(
        r#"
        model = "gpt-4o-mini"

        [memory]
        max_history = 7
        recall_k = 2

        [context]
        budget_chars = 1200
        assembly_timeout_secs = 9
        "#,
    )
    .unwrap();

    let policy = AssemblyPolicy::from_config(&config);
    assert_eq!(policy.budget_chars, 1200);
    assert_eq!(policy.recall_k, 2);
    assert_eq!(policy.timeout, Duration::from_secs(9));
    assert_eq!(config.memory.max_history, 7);
}
