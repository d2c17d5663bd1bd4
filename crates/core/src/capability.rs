//! Collaborator capabilities — the tools the memory core consumes but does
//! not implement.
//!
//! The context assembler only needs the *shape* of their output. Concrete
//! implementations live in `webmind-tools`; tests plug in scripted fakes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::FetchError;

/// One web search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub link: String,
    #[serde(default)]
    pub snippet: String,
}

/// The outcome of an HTTP request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpResponse {
    pub status_code: u16,
    /// Media type without parameters (e.g. `text/html`).
    pub content_type: String,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    pub fn is_json(&self) -> bool {
        self.content_type == "application/json"
    }
}

/// Web search.
#[async_trait]
pub trait SearchCapability: Send + Sync {
    /// Run a search. An empty list means nothing was found or the backend
    /// failed; search failures are logged by the implementation.
    async fn search(&self, query: &str) -> Vec<SearchHit>;
}

/// Page fetch with readable-text extraction.
#[async_trait]
pub trait BrowseCapability: Send + Sync {
    /// Fetch a page and return its readable text. Returns an empty string on
    /// any failure; never errors past this boundary.
    async fn fetch(&self, url: &str) -> String;
}

/// Raw HTTP.
#[async_trait]
pub trait HttpCapability: Send + Sync {
    async fn request(&self, url: &str) -> Result<HttpResponse, FetchError>;
}
