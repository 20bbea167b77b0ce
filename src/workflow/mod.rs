//! Per-query workflow: state record and controller

pub mod orchestrator;
pub mod state;

pub use orchestrator::{Orchestrator, FALLBACK_RESPONSE};
pub use state::{NextAction, WorkflowState};
