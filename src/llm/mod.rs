//! LLM provider abstraction layer
//!
//! The classifier oracle is any provider that turns a prompt into text.
//! Gemini, OpenAI and Anthropic backends are supplied.

pub mod provider;
pub mod providers;

pub use provider::*;
pub use providers::*;
