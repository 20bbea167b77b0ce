//! LLM provider implementations
//!
//! This module contains concrete implementations of the LlmProvider trait
//! for different LLM services.

pub mod anthropic;
pub mod gemini;
pub mod openai;

pub use anthropic::*;
pub use gemini::*;
pub use openai::*;
