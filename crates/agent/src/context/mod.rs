//! Context assembly pipeline.
//!
//! | Module | Role |
//! |--------|------|
//! | [`scorer`] | Lexical relevance of fetched content to a query |
//! | [`truncate`] | Word-safe 70/30 head/tail cut under a char budget |
//! | [`token`] | 4-chars-per-token estimate for reporting |
//! | [`assembler`] | Concurrent fetch, rank, render, truncate, persist |

pub mod assembler;
pub mod scorer;
pub mod token;
pub mod truncate;

pub use assembler::{
    AssembledContext, AssemblyPolicy, Candidate, CandidateContent, ContextAssembler, Exclusion,
    RankedSource,
};
pub use truncate::{ELLIPSIS, truncate};
