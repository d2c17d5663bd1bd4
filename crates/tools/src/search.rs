//! Web search collaborator backed by DuckDuckGo's HTML endpoint.

use async_trait::async_trait;
use regex_lite::Regex;
use reqwest::Url;
use tracing::{info, warn};
use webmind_core::capability::{SearchCapability, SearchHit};

use crate::html;

const ENDPOINT: &str = "https://html.duckduckgo.com/html/";

/// Searches DuckDuckGo and parses the result list out of the HTML page.
#[derive(Debug, Clone)]
pub struct DuckDuckGoSearch {
    client: reqwest::Client,
    endpoint: String,
    max_results: usize,
}

impl DuckDuckGoSearch {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            endpoint: ENDPOINT.into(),
            max_results: 10,
        }
    }

    /// Point at another endpoint serving the same markup.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_max_results(mut self, max: usize) -> Self {
        self.max_results = max;
        self
    }

    async fn fetch_page(&self, query: &str) -> Result<String, String> {
        let url =
            Url::parse_with_params(&self.endpoint, &[("q", query)]).map_err(|e| e.to_string())?;
        let response = self.client.get(url).send().await.map_err(|e| e.to_string())?;
        if !response.status().is_success() {
            return Err(format!("status {}", response.status()));
        }
        response.text().await.map_err(|e| e.to_string())
    }
}

#[async_trait]
impl SearchCapability for DuckDuckGoSearch {
    async fn search(&self, query: &str) -> Vec<SearchHit> {
        let page = match self.fetch_page(query).await {
            Ok(page) => page,
            Err(reason) => {
                warn!(query, error = %reason, "Search failed");
                return Vec::new();
            }
        };

        let mut hits = parse_results(&page);
        hits.truncate(self.max_results);
        info!(query, results = hits.len(), "Search completed");
        hits
    }
}

/// Pull `{title, link, snippet}` triples out of a result page.
///
/// Result titles are anchors with class `result__a`; a following anchor
/// with class `result__snippet` belongs to the latest title.
pub fn parse_results(page: &str) -> Vec<SearchHit> {
    let (Ok(anchor), Ok(href)) = (
        Regex::new(r#"(?is)<a\b([^>]*)>(.*?)</a\s*>"#),
        Regex::new(r#"(?i)href\s*=\s*"([^"]*)""#),
    ) else {
        return Vec::new();
    };

    let mut hits: Vec<SearchHit> = Vec::new();
    for caps in anchor.captures_iter(page) {
        let attrs = caps.get(1).map_or("", |m| m.as_str());
        let inner = caps.get(2).map_or("", |m| m.as_str());

        if attrs.contains("result__a") {
            let Some(link) = href
                .captures(attrs)
                .and_then(|c| c.get(1))
                .and_then(|m| resolve_link(m.as_str()))
            else {
                continue;
            };
            hits.push(SearchHit {
                title: html::to_plain_text(inner).unwrap_or_default(),
                link,
                snippet: String::new(),
            });
        } else if attrs.contains("result__snippet") {
            if let Some(last) = hits.last_mut().filter(|hit| hit.snippet.is_empty()) {
                last.snippet = html::to_plain_text(inner).unwrap_or_default();
            }
        }
    }
    hits
}

/// Unwrap DuckDuckGo redirect links (`//duckduckgo.com/l/?uddg=<target>`).
fn resolve_link(raw: &str) -> Option<String> {
    let raw = html::decode_entities(raw);
    let absolute = if raw.starts_with("//") {
        format!("https:{raw}")
    } else {
        raw
    };
    let url = Url::parse(&absolute).ok()?;

    if let Some((_, target)) = url.query_pairs().find(|(key, _)| key == "uddg") {
        return Some(target.into_owned());
    }
    matches!(url.scheme(), "http" | "https").then(|| url.to_string())
}
