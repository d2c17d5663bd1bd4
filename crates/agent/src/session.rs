//! Agent session — ties collaborators, memory, assembler and provider
//! together for one user.

use serde_json::{Map, Value, json};
use std::sync::Arc;
use tracing::{debug, info};
use webmind_config::AppConfig;
use webmind_core::capability::{
    BrowseCapability, HttpCapability, HttpResponse, SearchCapability, SearchHit,
};
use webmind_core::error::{FetchError, ProviderError, Result};
use webmind_core::provider::{PromptMessage, Provider, ProviderRequest, Usage};
use webmind_core::record::{RecordId, Role, ToolRecord};
use webmind_memory::{RecordStore, SessionMemory};

use crate::context::{AssembledContext, AssemblyPolicy, Candidate, ContextAssembler, token};

pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a helpful research assistant. Use the provided context when it is relevant \
     and say so when it does not answer the question.";

/// The external tools a session can call.
#[derive(Clone)]
pub struct Collaborators {
    pub search: Arc<dyn SearchCapability>,
    pub browser: Arc<dyn BrowseCapability>,
    pub http: Arc<dyn HttpCapability>,
}

/// The result of one chat turn.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub reply: String,
    pub context: AssembledContext,
    pub usage: Option<Usage>,
}

/// One agent session with its own memory.
pub struct AgentSession {
    memory: SessionMemory,
    assembler: ContextAssembler,
    tools: Collaborators,

    /// Absent when no API key is configured; tools and memory still work.
    provider: Option<Arc<dyn Provider>>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,

    /// Search hits browsed per research query.
    max_sources: usize,
    system_prompt: String,
}

impl AgentSession {
    pub fn new(memory: SessionMemory, policy: AssemblyPolicy, tools: Collaborators) -> Self {
        Self {
            assembler: ContextAssembler::new(memory.clone(), policy),
            memory,
            tools,
            provider: None,
            model: "gpt-3.5-turbo".into(),
            temperature: 0.7,
            max_tokens: None,
            max_sources: 3,
            system_prompt: DEFAULT_SYSTEM_PROMPT.into(),
        }
    }

    /// Build a session with memory, limits and model settings from `config`.
    pub fn from_config(config: &AppConfig, tools: Collaborators) -> Self {
        let store = RecordStore::new(config.memory.max_history)
            .with_output_limit(config.memory.max_tool_output_chars);
        let policy = AssemblyPolicy::from_config(config);
        let mut session = Self::new(SessionMemory::new(store), policy, tools)
            .with_max_sources(config.context.max_sources);
        session.model = config.model.clone();
        session.temperature = config.temperature;
        session
    }

    /// Attach the LLM used by [`respond`](Self::respond).
    pub fn with_provider(mut self, provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        self.provider = Some(provider);
        self.model = model.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    pub fn with_max_sources(mut self, max_sources: usize) -> Self {
        self.max_sources = max_sources;
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn memory(&self) -> &SessionMemory {
        &self.memory
    }

    pub fn has_provider(&self) -> bool {
        self.provider.is_some()
    }

    // ── Tool commands ─────────────────────────────────────────────────────

    /// Run a search and remember the hit list.
    pub async fn search(&self, query: &str) -> Vec<SearchHit> {
        self.search_and_record(query).await.0
    }

    /// The hits, and the tool record storing them when there were any.
    async fn search_and_record(
        &self,
        query: &str,
    ) -> (Vec<SearchHit>, Option<Arc<ToolRecord>>) {
        let hits = self.tools.search.search(query).await;
        if hits.is_empty() {
            debug!(query, "Search returned no results");
            return (hits, None);
        }

        let results: Vec<Value> = hits
            .iter()
            .map(|hit| json!({ "title": hit.title, "link": hit.link, "snippet": hit.snippet }))
            .collect();
        let mut output = Map::new();
        output.insert("results".into(), Value::Array(results));
        let record = self.memory.append_tool("search", query, output).await;
        (hits, Some(record))
    }

    /// Fetch a page's readable text and remember it.
    pub async fn browse(&self, url: &str) -> std::result::Result<String, FetchError> {
        let text = self.tools.browser.fetch(url).await;
        if text.trim().is_empty() {
            return Err(FetchError::Empty(url.to_string()));
        }
        self.memory.append_tool("browser", url, text.as_str()).await;
        Ok(text)
    }

    /// Issue a raw GET and remember the response.
    pub async fn http(&self, url: &str) -> std::result::Result<HttpResponse, FetchError> {
        let response = self.tools.http.request(url).await?;

        let body = if response.is_json() {
            serde_json::from_str(&response.body)
                .unwrap_or_else(|_| Value::String(response.body.clone()))
        } else {
            Value::String(response.body.clone())
        };
        let mut output = Map::new();
        output.insert("status_code".into(), json!(response.status_code));
        output.insert("content_type".into(), json!(response.content_type));
        output.insert("body".into(), body);
        self.memory.append_tool("http", url, output).await;

        Ok(response)
    }

    // ── Context ───────────────────────────────────────────────────────────

    /// Context for `query` from memory alone.
    pub async fn context(&self, query: &str) -> AssembledContext {
        self.assembler.build_context(query, Vec::new()).await
    }

    /// Search, browse the top hits concurrently and assemble context from
    /// the pages plus memory. The hit list of this search is not recalled
    /// into its own context.
    pub async fn research(&self, query: &str) -> AssembledContext {
        let (hits, search_record) = self.search_and_record(query).await;
        let skip: Vec<RecordId> = search_record.iter().map(|record| record.id).collect();

        let candidates: Vec<Candidate> = hits
            .into_iter()
            .take(self.max_sources)
            .map(|hit| {
                let browser = Arc::clone(&self.tools.browser);
                let link = hit.link.clone();
                Candidate::pending(hit.link, "browser", async move {
                    Ok(browser.fetch(&link).await)
                })
            })
            .collect();

        info!(query, sources = candidates.len(), "Researching");
        self.assembler
            .build_context_skipping(query, candidates, &skip)
            .await
    }

    // ── Chat ──────────────────────────────────────────────────────────────

    /// Run one chat turn: record the message, assemble context, ask the
    /// provider and record its reply.
    ///
    /// Only a provider failure is an error; missing context never is.
    pub async fn respond(&self, message: &str) -> Result<TurnOutcome> {
        let provider = self
            .provider
            .as_ref()
            .ok_or_else(|| ProviderError::NotConfigured("no API key configured".into()))?;

        self.memory.record_turn(Role::User, message).await;
        let context = self.assembler.build_context(message, Vec::new()).await;

        let system = if context.is_empty() {
            self.system_prompt.clone()
        } else {
            format!("{}\n\nContext:\n{}", self.system_prompt, context.context)
        };
        let messages = vec![PromptMessage::system(system), PromptMessage::user(message)];

        info!(
            provider = provider.name(),
            model = %self.model,
            prompt_tokens = token::estimate_prompt_tokens(&messages),
            "Sending turn to provider"
        );

        let request = ProviderRequest {
            model: self.model.clone(),
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };
        let response = provider.complete(request).await?;

        self.memory.record_turn(Role::Assistant, response.content.as_str()).await;

        Ok(TurnOutcome {
            reply: response.content,
            context,
            usage: response.usage,
        })
    }

    /// Forget everything this session has seen.
    pub async fn clear(&self) {
        self.memory.clear().await;
    }
}
