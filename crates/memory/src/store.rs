//! Record store — the canonical, bounded history of one agent session.
//!
//! Two independent FIFO collections (conversation turns and tool records),
//! each capped at `max_history`. Eviction is oldest-first by append order,
//! never by access time.

use chrono::Utc;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::debug;
use webmind_core::record::{ConversationRecord, RecordId, Role, ToolPayload, ToolRecord};

use crate::index::{CorpusEntry, CorpusTag};

/// A conversation turn with the related tool records that are still stored.
#[derive(Debug, Clone)]
pub struct RecentTurn {
    pub turn: Arc<ConversationRecord>,
    pub tools: Vec<Arc<ToolRecord>>,
}

/// Bounded store for conversation turns and tool records.
#[derive(Debug)]
pub struct RecordStore {
    max_history: usize,
    max_tool_output_chars: Option<usize>,
    conversations: VecDeque<Arc<ConversationRecord>>,
    tools: VecDeque<Arc<ToolRecord>>,
    /// Tool ids appended since the last conversation turn. Only ids still in
    /// `tools` are kept, so this never exceeds `max_history`.
    pending_tools: Vec<RecordId>,
    next_id: u64,
}

impl RecordStore {
    /// Create a store holding at most `max_history` records of each kind.
    ///
    /// # Panics
    ///
    /// Panics if `max_history` is zero.
    pub fn new(max_history: usize) -> Self {
        assert!(max_history >= 1, "max_history must be at least 1");
        Self {
            max_history,
            max_tool_output_chars: None,
            conversations: VecDeque::with_capacity(max_history),
            tools: VecDeque::with_capacity(max_history),
            pending_tools: Vec::new(),
            next_id: 0,
        }
    }

    /// Store text outputs longer than `max_chars` clipped. Zero disables.
    pub fn with_output_limit(mut self, max_chars: usize) -> Self {
        self.max_tool_output_chars = (max_chars > 0).then_some(max_chars);
        self
    }

    pub fn max_history(&self) -> usize {
        self.max_history
    }

    fn next_id(&mut self) -> RecordId {
        let id = RecordId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Append a tool record, evicting the oldest one if over capacity.
    pub fn append_tool(
        &mut self,
        kind: impl Into<String>,
        input: impl Into<ToolPayload>,
        output: impl Into<ToolPayload>,
    ) -> Arc<ToolRecord> {
        let output = output.into();
        let output = match self.max_tool_output_chars {
            Some(limit) => output.clipped(limit),
            None => output,
        };

        let record = Arc::new(ToolRecord {
            id: self.next_id(),
            kind: kind.into(),
            input: input.into(),
            output,
            timestamp: Utc::now(),
        });

        self.tools.push_back(Arc::clone(&record));
        self.pending_tools.push(record.id);
        while self.tools.len() > self.max_history {
            if let Some(evicted) = self.tools.pop_front() {
                self.pending_tools.retain(|id| *id != evicted.id);
                debug!(id = %evicted.id, kind = %evicted.kind, "Evicted tool record");
            }
        }

        record
    }

    /// Append a conversation turn, evicting the oldest one if over capacity.
    pub fn append_conversation(
        &mut self,
        role: Role,
        content: impl Into<String>,
        related_tools: Vec<RecordId>,
    ) -> Arc<ConversationRecord> {
        let record = Arc::new(ConversationRecord {
            id: self.next_id(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
            related_tools,
        });

        self.conversations.push_back(Arc::clone(&record));
        while self.conversations.len() > self.max_history {
            if let Some(evicted) = self.conversations.pop_front() {
                debug!(id = %evicted.id, role = %evicted.role, "Evicted conversation turn");
            }
        }

        record
    }

    /// Drain the ids of tool records appended since the last call.
    pub fn take_pending_tools(&mut self) -> Vec<RecordId> {
        std::mem::take(&mut self.pending_tools)
    }

    /// Look up a tool record that is still retained.
    pub fn tool(&self, id: RecordId) -> Option<&Arc<ToolRecord>> {
        // Ids are appended in increasing order, so the deque stays sorted.
        self.tools
            .binary_search_by_key(&id, |record| record.id)
            .ok()
            .and_then(|pos| self.tools.get(pos))
    }

    pub fn conversations(&self) -> impl Iterator<Item = &Arc<ConversationRecord>> {
        self.conversations.iter()
    }

    pub fn tools(&self) -> impl Iterator<Item = &Arc<ToolRecord>> {
        self.tools.iter()
    }

    pub fn conversation_count(&self) -> usize {
        self.conversations.len()
    }

    pub fn tool_count(&self) -> usize {
        self.tools.len()
    }

    /// Render a turn followed by its still-retained tool records.
    pub fn render_turn(&self, turn: &ConversationRecord) -> String {
        let mut out = turn.render_line();
        for record in turn.related_tools.iter().filter_map(|id| self.tool(*id)) {
            out.push('\n');
            out.push_str(&record.render());
        }
        out
    }

    fn recent(
        &self,
        max_entries: Option<usize>,
    ) -> impl Iterator<Item = &Arc<ConversationRecord>> {
        let len = self.conversations.len();
        let take = max_entries.unwrap_or(len).min(len);
        self.conversations.iter().skip(len - take)
    }

    /// The most recent `max_entries` turns (all if `None`), oldest first.
    pub fn recent_conversation(&self, max_entries: Option<usize>) -> Vec<String> {
        self.recent(max_entries)
            .map(|turn| self.render_turn(turn))
            .collect()
    }

    /// Like [`recent_conversation`](Self::recent_conversation), but unrendered:
    /// each turn with its still-retained tool records.
    pub fn recent_turns(&self, max_entries: Option<usize>) -> Vec<RecentTurn> {
        self.recent(max_entries)
            .map(|turn| RecentTurn {
                turn: Arc::clone(turn),
                tools: turn
                    .related_tools
                    .iter()
                    .filter_map(|id| self.tool(*id).cloned())
                    .collect(),
            })
            .collect()
    }

    /// Project the current contents into index corpus entries, in global
    /// append order.
    pub fn corpus(&self) -> Vec<CorpusEntry> {
        let mut entries: Vec<(RecordId, CorpusEntry)> = self
            .conversations
            .iter()
            .map(|turn| {
                (
                    turn.id,
                    CorpusEntry::new(turn.content.clone(), CorpusTag::Conversation)
                        .with_record(turn.id),
                )
            })
            .chain(self.tools.iter().map(|record| {
                (
                    record.id,
                    CorpusEntry::new(record.flatten(), CorpusTag::Tool).with_record(record.id),
                )
            }))
            .collect();
        entries.sort_by_key(|(id, _)| *id);
        entries.into_iter().map(|(_, entry)| entry).collect()
    }

    /// Empty both collections. Ids keep increasing afterwards.
    pub fn clear(&mut self) {
        self.conversations.clear();
        self.tools.clear();
        self.pending_tools.clear();
    }
}
