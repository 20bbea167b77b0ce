//! Parsing of the two-line classifier reply
//!
//! Only the first `AGENT_NAME:` line counts. Leading whitespace before the
//! prefix is tolerated; the value is trimmed.

use crate::routing::prompt::{AGENT_NAME_PREFIX, REASON_PREFIX};

/// Structured view of the oracle's reply
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassifierReply {
    pub agent_id: Option<String>,
    pub reason: Option<String>,
}

impl ClassifierReply {
    pub fn parse(text: &str) -> Self {
        Self {
            agent_id: first_value(text, AGENT_NAME_PREFIX),
            reason: first_value(text, REASON_PREFIX),
        }
    }
}

fn first_value(text: &str, prefix: &str) -> Option<String> {
    text.lines()
        .find_map(|line| line.trim_start().strip_prefix(prefix))
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
