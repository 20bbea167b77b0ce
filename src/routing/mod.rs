//! Query Routing
//!
//! Selects one worker for a query using a single classifier call:
//!
//! - `prompt` builds the catalog prompt with the `AGENT_NAME:` / `REASON:` contract
//! - `parser` extracts the first `AGENT_NAME:` value from the raw reply
//! - `router` validates the choice against the registry and advances the workflow

pub mod parser;
pub mod prompt;
pub mod router;

pub use parser::ClassifierReply;
pub use prompt::build_routing_prompt;
pub use router::{
    QueryRouter, RoutingDecision, UnroutableReason, CLARIFICATION_MESSAGE, EMPTY_QUERY_MESSAGE,
};
