//! Error types for the webmind domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all webmind operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Candidate fetch errors ---
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Network error: {0}")]
    Network(String),
}

/// Why a candidate source produced no usable content.
///
/// These never abort context assembly; the assembler turns them into
/// exclusions and keeps going with the remaining candidates.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchError {
    #[error("Network error fetching {url}: {reason}")]
    Network { url: String, reason: String },

    #[error("{url} answered with status {status_code}")]
    Status { url: String, status_code: u16 },

    #[error("No content returned from {0}")]
    Empty(String),

    #[error("Timed out fetching {0}")]
    Timeout(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}
