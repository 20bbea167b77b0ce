//! Testing utilities and mock implementations
//!
//! Lets routing and dispatch run without a live LLM provider.

pub mod mocks;

pub use mocks::*;
