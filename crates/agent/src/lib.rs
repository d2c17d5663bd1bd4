//! Context retrieval and turn orchestration for webmind.
//!
//! For every query the agent:
//!
//! 1. **Gathers** candidate content (fresh pages from collaborators)
//! 2. **Scores and ranks** it against the query
//! 3. **Recalls** relevant past tool output and recent conversation
//! 4. **Bounds** the result to a character budget
//! 5. **Remembers** what it fetched for later turns
//!
//! [`AgentSession`] drives this for the CLI; [`ContextAssembler`] is usable
//! on its own with any [`SessionMemory`](webmind_memory::SessionMemory).

pub mod context;
pub mod session;

pub use context::{
    AssembledContext, AssemblyPolicy, Candidate, CandidateContent, ContextAssembler, Exclusion,
    RankedSource,
};
pub use session::{AgentSession, Collaborators, DEFAULT_SYSTEM_PROMPT, TurnOutcome};
