//! # webmind Core
//!
//! Domain types, traits, and error definitions for the webmind agent memory
//! engine. This crate performs no I/O — it defines the domain model that all
//! other crates implement against.
//!
//! - [`record`]: conversation turns and tool executions
//! - [`capability`]: search / browse / http collaborators
//! - [`provider`]: the LLM call the assembled context is handed to

pub mod capability;
pub mod error;
pub mod provider;
pub mod record;

// Re-export key types at crate root for ergonomics
pub use capability::{BrowseCapability, HttpCapability, HttpResponse, SearchCapability, SearchHit};
pub use error::{Error, FetchError, ProviderError, Result};
pub use provider::{PromptMessage, PromptRole, Provider, ProviderRequest, ProviderResponse, Usage};
pub use record::{ConversationRecord, RecordId, Role, ToolPayload, ToolRecord};
