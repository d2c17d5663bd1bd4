//! Subcommand implementations.

pub mod chat;
pub mod config_cmd;
pub mod context;
pub mod repl;

use std::sync::Arc;
use webmind_agent::{AgentSession, Collaborators};
use webmind_config::AppConfig;
use webmind_providers::OpenAiCompatProvider;
use webmind_tools::{DuckDuckGoSearch, HttpClient};

/// Wire network collaborators and, when a key is configured, the provider.
pub fn build_session(config: &AppConfig) -> AgentSession {
    let http = Arc::new(HttpClient::new());
    let tools = Collaborators {
        search: Arc::new(DuckDuckGoSearch::new(http.client())),
        browser: http.clone(),
        http,
    };

    let session = AgentSession::from_config(config, tools);
    match OpenAiCompatProvider::from_config(config) {
        Some(provider) => session.with_provider(Arc::new(provider), config.model.clone()),
        None => session,
    }
}
