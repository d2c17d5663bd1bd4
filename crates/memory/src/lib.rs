//! Session memory for webmind.
//!
//! - [`store`]: bounded FIFO history of conversation turns and tool records
//! - [`index`]: term-frequency vector space rebuilt from the store
//! - [`shared`]: the store and index behind one lock, as the rest of the
//!   system uses them

pub mod index;
pub mod shared;
pub mod stopwords;
pub mod store;

pub use index::{CorpusEntry, CorpusTag, IndexHit, RelevanceIndex, cosine_similarity, tokenize};
pub use shared::{MemoryStats, NewToolRecord, SessionMemory};
pub use store::{RecentTurn, RecordStore};
