//! Error types for the query orchestrator
//!
//! Routing and dispatch failures never surface here: they are folded into a
//! terminal textual response by the workflow. The variants below are the
//! faults that escape the workflow and reach the caller as an error status.

use thiserror::Error;

/// Main error type for orchestrator operations
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("Classifier oracle failed: {message}")]
    Classifier { message: String },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Query processing timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("Internal error: {message}")]
    InternalError { message: String },

    #[error("Configuration error: {0}")]
    ConfigError(#[from] crate::config::ConfigError),

    #[error("LLM provider error: {0}")]
    LlmError(#[from] crate::llm::LlmError),
}

impl OrchestratorError {
    /// Create classifier (oracle) error
    pub fn classifier<S: Into<String>>(message: S) -> Self {
        Self::Classifier {
            message: message.into(),
        }
    }

    /// Create invalid input error
    pub fn invalid_input<S: Into<String>>(message: S) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create internal error
    pub fn internal_error<S: Into<String>>(message: S) -> Self {
        Self::InternalError {
            message: message.into(),
        }
    }

    /// True when the oracle could not be consulted at all
    pub fn is_oracle_failure(&self) -> bool {
        matches!(self, Self::Classifier { .. } | Self::LlmError(_))
    }

    /// Caller-safe description of this error
    pub fn public_message(&self) -> String {
        sanitize_error_message(&self.to_string())
    }
}

/// Sanitize error messages before they leave the process
pub fn sanitize_error_message(message: &str) -> String {
    let mut sanitized = message.to_string();

    if let Ok(secrets) = regex::Regex::new(r"(?i)(password|token|key|secret)[=:]\s*\S+") {
        sanitized = secrets.replace_all(&sanitized, "${1}=***").to_string();
    }

    // Oracle URLs sometimes carry the key as a query parameter
    if let Ok(query_keys) = regex::Regex::new(r"(?i)([?&](?:key|api_key)=)[^&\s]+") {
        sanitized = query_keys.replace_all(&sanitized, "${1}***").to_string();
    }

    if sanitized.len() > 500 {
        let truncate_suffix = "...[truncated]";
        let mut cut = 500 - truncate_suffix.len();
        while !sanitized.is_char_boundary(cut) {
            cut -= 1;
        }
        sanitized = format!("{}{}", &sanitized[..cut], truncate_suffix);
    }

    sanitized
}

/// Result type for orchestrator operations
pub type OrchestratorResult<T> = Result<T, OrchestratorError>;
