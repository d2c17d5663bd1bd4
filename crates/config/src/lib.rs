//! Configuration loading, validation, and management for webmind.
//!
//! Loads configuration from `~/.webmind/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.webmind/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key for the LLM provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Base URL of the OpenAI-compatible endpoint
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Model used for chat turns
    #[serde(default = "default_model")]
    pub model: String,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Log filter used when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Record store and recall settings
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Context assembly settings
    #[serde(default)]
    pub context: ContextConfig,
}

fn default_api_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_model() -> String {
    "gpt-3.5-turbo".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_log_level() -> String {
    "info".into()
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("log_level", &self.log_level)
            .field("memory", &self.memory)
            .field("context", &self.context)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Capacity of each bounded collection (conversation turns, tool records)
    #[serde(default = "default_max_history")]
    pub max_history: usize,

    /// Tool outputs longer than this are stored clipped; 0 keeps them whole
    #[serde(default = "default_max_tool_output_chars")]
    pub max_tool_output_chars: usize,

    /// How many indexed tool records are recalled into each context
    #[serde(default = "default_recall_k")]
    pub recall_k: usize,

    /// How many recent conversation turns are rendered into each context
    #[serde(default = "default_history_entries")]
    pub history_entries: usize,
}

fn default_max_history() -> usize {
    10
}
fn default_max_tool_output_chars() -> usize {
    4000
}
fn default_recall_k() -> usize {
    3
}
fn default_history_entries() -> usize {
    10
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_history: default_max_history(),
            max_tool_output_chars: default_max_tool_output_chars(),
            recall_k: default_recall_k(),
            history_entries: default_history_entries(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Global budget for the assembled context, in chars
    #[serde(default = "default_budget_chars")]
    pub budget_chars: usize,

    /// Ceiling applied to each candidate body before concatenation, in chars
    #[serde(default = "default_per_item_chars")]
    pub per_item_chars: usize,

    /// Upper bound on waiting for candidate fetches
    #[serde(default = "default_assembly_timeout_secs")]
    pub assembly_timeout_secs: u64,

    /// Search hits browsed per research query
    #[serde(default = "default_max_sources")]
    pub max_sources: usize,
}

fn default_budget_chars() -> usize {
    4000
}
fn default_per_item_chars() -> usize {
    1000
}
fn default_assembly_timeout_secs() -> u64 {
    30
}
fn default_max_sources() -> usize {
    3
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            budget_chars: default_budget_chars(),
            per_item_chars: default_per_item_chars(),
            assembly_timeout_secs: default_assembly_timeout_secs(),
            max_sources: default_max_sources(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default location, then apply environment
    /// overrides.
    ///
    /// Environment variables:
    /// - `OPENAI_API_KEY` / `WEBMIND_API_KEY`
    /// - `WEBMIND_MODEL`
    /// - `WEBMIND_MAX_HISTORY`
    /// - `WEBMIND_BUDGET_CHARS`
    /// - `LOG_LEVEL`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from an environment lookup.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        // Generic key wins over the provider-specific one
        if let Some(key) = lookup("WEBMIND_API_KEY").or_else(|| lookup("OPENAI_API_KEY")) {
            if !key.is_empty() {
                self.api_key = Some(key);
            }
        }

        if let Some(model) = lookup("WEBMIND_MODEL") {
            self.model = model;
        }

        if let Some(level) = lookup("LOG_LEVEL") {
            self.log_level = level.to_lowercase();
        }

        if let Some(value) = lookup("WEBMIND_MAX_HISTORY") {
            match value.parse() {
                Ok(n) => self.memory.max_history = n,
                Err(_) => tracing::warn!(%value, "Ignoring non-numeric WEBMIND_MAX_HISTORY"),
            }
        }

        if let Some(value) = lookup("WEBMIND_BUDGET_CHARS") {
            match value.parse() {
                Ok(n) => self.context.budget_chars = n,
                Err(_) => tracing::warn!(%value, "Ignoring non-numeric WEBMIND_BUDGET_CHARS"),
            }
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".webmind")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.temperature < 0.0 || self.temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.memory.max_history == 0 {
            return Err(ConfigError::ValidationError(
                "memory.max_history must be at least 1".into(),
            ));
        }

        if self.context.budget_chars == 0 {
            return Err(ConfigError::ValidationError(
                "context.budget_chars must be at least 1".into(),
            ));
        }

        if self.context.per_item_chars == 0 {
            return Err(ConfigError::ValidationError(
                "context.per_item_chars must be at least 1".into(),
            ));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Render this configuration as TOML, with the API key removed.
    pub fn to_toml_redacted(&self) -> String {
        let redacted = Self {
            api_key: None,
            ..self.clone()
        };
        toml::to_string_pretty(&redacted).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: default_api_url(),
            model: default_model(),
            temperature: default_temperature(),
            log_level: default_log_level(),
            memory: MemoryConfig::default(),
            context: ContextConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
