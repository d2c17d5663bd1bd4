//! Record domain types.
//!
//! Conversation turns and tool executions are the two kinds of record the
//! agent remembers. Records are immutable once created: the store hands out
//! `Arc`s and never mutates them in place.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a record, assigned by the store at append time.
///
/// Ids increase monotonically across *both* record kinds, so comparing two
/// ids gives their global append order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecordId(pub u64);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A tool request or result: either free text or a structured map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ToolPayload {
    Text(String),
    Structured(serde_json::Map<String, serde_json::Value>),
}

impl ToolPayload {
    /// Length of the rendered payload in chars.
    pub fn char_len(&self) -> usize {
        match self {
            Self::Text(text) => text.chars().count(),
            Self::Structured(_) => self.to_string().chars().count(),
        }
    }

    /// Clip a text payload to at most `max_chars` chars of content plus a
    /// marker. Structured payloads are kept whole.
    pub fn clipped(self, max_chars: usize) -> Self {
        match self {
            Self::Text(text) if text.chars().count() > max_chars => {
                let mut clipped: String = text.chars().take(max_chars).collect();
                clipped.push_str(TRUNCATION_MARKER);
                Self::Text(clipped)
            }
            other => other,
        }
    }
}

/// Appended to text payloads clipped at store time.
pub const TRUNCATION_MARKER: &str = " [truncated]";

impl fmt::Display for ToolPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Structured(map) => {
                let json = serde_json::to_string(map).map_err(|_| fmt::Error)?;
                f.write_str(&json)
            }
        }
    }
}

impl From<String> for ToolPayload {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for ToolPayload {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<serde_json::Map<String, serde_json::Value>> for ToolPayload {
    fn from(map: serde_json::Map<String, serde_json::Value>) -> Self {
        Self::Structured(map)
    }
}

/// One tool execution (search, browse, http, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolRecord {
    pub id: RecordId,

    /// Which tool produced this record (e.g. "search", "browser", "http").
    pub kind: String,

    /// The request the tool was given.
    pub input: ToolPayload,

    /// The result payload, possibly clipped by the store.
    pub output: ToolPayload,

    pub timestamp: DateTime<Utc>,
}

impl ToolRecord {
    /// Rendering used under a conversation turn.
    pub fn render(&self) -> String {
        format!(
            "[Tool Output - {}]\nInput: {}\nOutput: {}",
            self.kind, self.input, self.output
        )
    }

    /// Single-line flattening fed to the relevance index.
    pub fn flatten(&self) -> String {
        format!("{}: {} -> {}", self.kind, self.input, self.output)
    }
}

/// The role of a conversation participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user
    User,
    /// The AI assistant
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One conversation turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationRecord {
    pub id: RecordId,

    pub role: Role,

    pub content: String,

    pub timestamp: DateTime<Utc>,

    /// Tool records created since the previous turn. Non-owning: an id whose
    /// record has been evicted is simply skipped when rendering.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub related_tools: Vec<RecordId>,
}

impl ConversationRecord {
    /// `"{role}: {content}"`, without related tools.
    pub fn render_line(&self) -> String {
        format!("{}: {}", self.role, self.content)
    }
}
