//! Worker HTTP contract
//!
//! `POST <endpoint>` with `{"query": ...}` answers
//! `{"result": ..., "confidence": ..., "metadata": {...}}`.
//! `GET <origin>/capabilities` answers `{"capabilities": [...]}`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Body sent to a worker's query endpoint
#[derive(Debug, Clone, Serialize)]
pub struct WorkerRequest<'a> {
    pub query: &'a str,
}

/// Body returned by a worker's query endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerReply {
    pub result: String,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub metadata: Option<Map<String, Value>>,
}

impl WorkerReply {
    /// Human-readable annotation lines for the metadata map
    pub fn metadata_lines(&self) -> Vec<String> {
        self.metadata
            .iter()
            .flat_map(|map| map.iter())
            .map(|(key, value)| format!("- {key}: {}", display_value(value)))
            .collect()
    }
}

/// Body returned by a worker's capability-discovery endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilityReport {
    pub capabilities: Vec<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
}

impl CapabilityReport {
    /// Declared capabilities missing from `configured`
    pub fn undeclared_in<'a>(&'a self, configured: &[String]) -> Vec<&'a str> {
        self.capabilities
            .iter()
            .filter(|c| !configured.iter().any(|k| k.eq_ignore_ascii_case(c)))
            .map(String::as_str)
            .collect()
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(display_value)
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}
