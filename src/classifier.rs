//! Classifier adapter over the text-completion oracle
//!
//! One prompt in, raw text out. No retries: any failure, including hitting
//! the upper time bound, is returned to the router as an oracle fault.

use crate::error::{OrchestratorError, OrchestratorResult};
use crate::llm::provider::{CompletionRequest, LlmProvider, Message};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Seam between the router and whatever produces classification text
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, prompt: &str) -> OrchestratorResult<String>;
}

/// Classifier backed by an LLM provider
pub struct LlmClassifier {
    provider: Arc<dyn LlmProvider>,
    model: String,
    /// Low by default so the same query keeps routing the same way
    temperature: f32,
    max_tokens: Option<u32>,
    timeout: Duration,
}

impl LlmClassifier {
    pub fn new(provider: Arc<dyn LlmProvider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: 0.1,
            max_tokens: Some(256),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn build_request(&self, prompt: &str) -> CompletionRequest {
        CompletionRequest {
            messages: vec![Message::user(prompt)],
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            temperature: Some(self.temperature),
            stop_sequences: None,
            metadata: Default::default(),
        }
    }
}

#[async_trait]
impl Classifier for LlmClassifier {
    async fn classify(&self, prompt: &str) -> OrchestratorResult<String> {
        let request = self.build_request(prompt);

        let response = tokio::time::timeout(self.timeout, self.provider.complete(request))
            .await
            .map_err(|_| {
                warn!(
                    provider = self.provider.name(),
                    timeout_secs = self.timeout.as_secs(),
                    "Classifier oracle timed out"
                );
                OrchestratorError::classifier(format!(
                    "{} did not answer within {:?}",
                    self.provider.name(),
                    self.timeout
                ))
            })?
            .map_err(|e| OrchestratorError::classifier(e.to_string()))?;

        debug!(
            provider = self.provider.name(),
            model = %response.model,
            total_tokens = response.usage.total_tokens,
            "Classifier oracle replied"
        );

        response
            .content
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| {
                OrchestratorError::classifier(format!(
                    "{} returned an empty completion",
                    self.provider.name()
                ))
            })
    }
}
