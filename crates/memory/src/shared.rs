//! Session memory — the store and its index behind one coarse lock.
//!
//! Every mutation appends to the store and rebuilds the index while holding
//! the same lock, so a concurrent query never observes a store/index pair
//! that disagree. Clones share the same state.

use std::sync::Arc;
use tokio::sync::Mutex;
use webmind_core::record::{ConversationRecord, RecordId, Role, ToolPayload, ToolRecord};

use crate::index::{CorpusTag, RelevanceIndex};
use crate::store::{RecentTurn, RecordStore};

/// A tool record waiting to be appended.
#[derive(Debug, Clone)]
pub struct NewToolRecord {
    pub kind: String,
    pub input: ToolPayload,
    pub output: ToolPayload,
}

impl NewToolRecord {
    pub fn new(
        kind: impl Into<String>,
        input: impl Into<ToolPayload>,
        output: impl Into<ToolPayload>,
    ) -> Self {
        Self {
            kind: kind.into(),
            input: input.into(),
            output: output.into(),
        }
    }
}

/// Counts for inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryStats {
    pub conversations: usize,
    pub tools: usize,
    pub indexed: usize,
    pub max_history: usize,
}

#[derive(Debug)]
struct MemoryState {
    store: RecordStore,
    index: RelevanceIndex,
}

impl MemoryState {
    fn reindex(&mut self) {
        self.index.reindex(self.store.corpus());
    }
}

/// Caller-owned memory for one agent session.
#[derive(Debug, Clone)]
pub struct SessionMemory {
    inner: Arc<Mutex<MemoryState>>,
}

impl SessionMemory {
    /// Wrap a store. The index is built from its current contents.
    pub fn new(store: RecordStore) -> Self {
        let mut state = MemoryState {
            store,
            index: RelevanceIndex::new(),
        };
        state.reindex();
        Self {
            inner: Arc::new(Mutex::new(state)),
        }
    }

    /// A store of `max_history` records per kind, no output clipping.
    pub fn with_capacity(max_history: usize) -> Self {
        Self::new(RecordStore::new(max_history))
    }

    pub async fn append_tool(
        &self,
        kind: impl Into<String>,
        input: impl Into<ToolPayload>,
        output: impl Into<ToolPayload>,
    ) -> Arc<ToolRecord> {
        let mut state = self.inner.lock().await;
        let record = state.store.append_tool(kind, input, output);
        state.reindex();
        record
    }

    /// Append several tool records with a single index rebuild.
    pub async fn append_tools(&self, batch: Vec<NewToolRecord>) -> Vec<Arc<ToolRecord>> {
        if batch.is_empty() {
            return Vec::new();
        }
        let mut state = self.inner.lock().await;
        let records = batch
            .into_iter()
            .map(|new| state.store.append_tool(new.kind, new.input, new.output))
            .collect();
        state.reindex();
        records
    }

    pub async fn append_conversation(
        &self,
        role: Role,
        content: impl Into<String>,
        related_tools: Vec<RecordId>,
    ) -> Arc<ConversationRecord> {
        let mut state = self.inner.lock().await;
        let record = state.store.append_conversation(role, content, related_tools);
        state.reindex();
        record
    }

    /// Append a turn carrying every tool record created since the previous
    /// turn.
    pub async fn record_turn(
        &self,
        role: Role,
        content: impl Into<String>,
    ) -> Arc<ConversationRecord> {
        let mut state = self.inner.lock().await;
        let related = state.store.take_pending_tools();
        let record = state.store.append_conversation(role, content, related);
        state.reindex();
        record
    }

    pub async fn recent_conversation(&self, max_entries: Option<usize>) -> Vec<String> {
        self.inner.lock().await.store.recent_conversation(max_entries)
    }

    pub async fn recent_turns(&self, max_entries: Option<usize>) -> Vec<RecentTurn> {
        self.inner.lock().await.store.recent_turns(max_entries)
    }

    /// Top `k` indexed texts of any kind.
    pub async fn relevant_context(&self, query: &str, k: usize) -> Vec<String> {
        let state = self.inner.lock().await;
        state
            .index
            .query(query, k, None)
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    /// Top `k` tool records for `query`.
    pub async fn relevant_tool_outputs(&self, query: &str, k: usize) -> Vec<Arc<ToolRecord>> {
        let state = self.inner.lock().await;
        state
            .index
            .rank(query, k, Some(CorpusTag::Tool))
            .into_iter()
            .filter_map(|hit| hit.entry.record)
            .filter_map(|id| state.store.tool(id).cloned())
            .collect()
    }

    /// Every indexed text, in corpus order.
    pub async fn documents(&self) -> Vec<String> {
        let state = self.inner.lock().await;
        state.index.entries().iter().map(|e| e.text.clone()).collect()
    }

    /// Tag and source record of every indexed text, in corpus order.
    pub async fn metadata(&self) -> Vec<(CorpusTag, Option<RecordId>)> {
        let state = self.inner.lock().await;
        state.index.entries().iter().map(|e| (e.tag, e.record)).collect()
    }

    pub async fn tool_records(&self) -> Vec<Arc<ToolRecord>> {
        self.inner.lock().await.store.tools().cloned().collect()
    }

    pub async fn conversation_records(&self) -> Vec<Arc<ConversationRecord>> {
        self.inner.lock().await.store.conversations().cloned().collect()
    }

    pub async fn stats(&self) -> MemoryStats {
        let state = self.inner.lock().await;
        MemoryStats {
            conversations: state.store.conversation_count(),
            tools: state.store.tool_count(),
            indexed: state.index.len(),
            max_history: state.store.max_history(),
        }
    }

    /// Empty both collections and reset the index.
    pub async fn clear(&self) {
        let mut state = self.inner.lock().await;
        state.store.clear();
        state.index.clear();
        tracing::info!("Session memory cleared");
    }
}
