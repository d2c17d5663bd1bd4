//! LLM provider implementations for webmind.
//!
//! All providers implement the `webmind_core::Provider` trait.

pub mod openai_compat;

pub use openai_compat::OpenAiCompatProvider;
