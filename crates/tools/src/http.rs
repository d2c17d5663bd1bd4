//! HTTP client collaborator — raw GET and page browsing over `reqwest`.

use async_trait::async_trait;
use reqwest::Url;
use std::time::Duration;
use tracing::{debug, info, warn};
use webmind_core::capability::{BrowseCapability, HttpCapability, HttpResponse};
use webmind_core::error::FetchError;

use crate::html;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const USER_AGENT: &str = concat!("webmind/", env!("CARGO_PKG_VERSION"));

/// GET-only HTTP client. Also serves as the browser: pages are fetched and
/// reduced to their readable text.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
}

impl HttpClient {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "Falling back to default HTTP client");
                reqwest::Client::new()
            });
        Self { client }
    }

    /// Use a preconfigured client (proxies, custom timeouts).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// The underlying client, for sharing its connection pool.
    pub fn client(&self) -> reqwest::Client {
        self.client.clone()
    }
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse `url`, accepting only http and https.
pub fn parse_url(url: &str) -> Result<Url, FetchError> {
    let parsed = Url::parse(url).map_err(|_| FetchError::InvalidUrl(url.to_string()))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        _ => Err(FetchError::InvalidUrl(url.to_string())),
    }
}

/// Media type of a `Content-Type` header value, without parameters.
pub fn media_type(header: &str) -> String {
    header
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

fn network_error(url: &str, err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout(url.to_string())
    } else {
        FetchError::Network {
            url: url.to_string(),
            reason: err.to_string(),
        }
    }
}

#[async_trait]
impl HttpCapability for HttpClient {
    async fn request(&self, url: &str) -> Result<HttpResponse, FetchError> {
        let parsed = parse_url(url)?;
        info!(url, "HTTP request");

        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(|e| network_error(url, e))?;

        let status_code = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(media_type)
            .unwrap_or_default();
        let body = response.text().await.map_err(|e| network_error(url, e))?;

        info!(
            url,
            status_code,
            content_type = %content_type,
            length = body.chars().count(),
            "HTTP request completed"
        );

        Ok(HttpResponse {
            status_code,
            content_type,
            body,
        })
    }
}

#[async_trait]
impl BrowseCapability for HttpClient {
    async fn fetch(&self, url: &str) -> String {
        let response = match self.request(url).await {
            Ok(response) => response,
            Err(e) => {
                warn!(url, error = %e, "Browse failed");
                return String::new();
            }
        };

        if !response.is_success() {
            warn!(url, status = response.status_code, "Browse got non-success status");
            return String::new();
        }

        let text = if response.content_type.contains("html") || response.content_type.is_empty() {
            html::extract_text(&response.body)
        } else {
            response.body.trim().to_string()
        };
        debug!(url, chars = text.chars().count(), "Extracted page text");
        text
    }
}
