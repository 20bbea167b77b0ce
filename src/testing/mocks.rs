//! Mock implementations for testing
//!
//! Provides a scripted LLM provider, a keyword classifier, and a small
//! two-agent registry so routing and dispatch can be exercised without a
//! real model or real workers.

use crate::classifier::Classifier;
use crate::error::{OrchestratorError, OrchestratorResult};
use crate::llm::provider::{
    CompletionRequest, CompletionResponse, FinishReason, LlmError, LlmProvider, TokenUsage,
};
use crate::registry::{AgentDescriptor, AgentRegistry};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use url::Url;

/// Mock LLM provider for testing
///
/// Replies cycle through `responses`; every request is recorded.
#[derive(Debug, Default)]
pub struct MockLlmProvider {
    pub responses: Vec<String>,
    pub current_response: Arc<Mutex<usize>>,
    pub requests: Arc<Mutex<Vec<CompletionRequest>>>,
    pub should_fail: bool,
    pub delay: Option<Duration>,
}

impl MockLlmProvider {
    pub fn new(responses: Vec<String>) -> Self {
        Self {
            responses,
            ..Default::default()
        }
    }

    pub fn with_failure() -> Self {
        Self {
            should_fail: true,
            ..Default::default()
        }
    }

    pub fn single_response(response: impl Into<String>) -> Self {
        Self::new(vec![response.into()])
    }

    /// Sleep before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub async fn call_count(&self) -> usize {
        self.requests.lock().await.len()
    }

    pub async fn recorded_requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().await.clone()
    }
}

#[async_trait]
impl LlmProvider for MockLlmProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        self.requests.lock().await.push(request);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.should_fail {
            return Err(LlmError::RequestFailed("Mock LLM failure".to_string()));
        }

        let mut current = self.current_response.lock().await;
        let content = if self.responses.is_empty() {
            "Mock response".to_string()
        } else {
            self.responses[*current % self.responses.len()].clone()
        };
        *current += 1;

        Ok(CompletionResponse {
            content: Some(content),
            model: "mock-model".to_string(),
            usage: TokenUsage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            },
            finish_reason: FinishReason::Stop,
            metadata: HashMap::new(),
        })
    }

    async fn health_check(&self) -> Result<(), LlmError> {
        if self.should_fail {
            Err(LlmError::RequestFailed(
                "Mock health check failure".to_string(),
            ))
        } else {
            Ok(())
        }
    }
}

/// Classifier that picks an agent by keyword found in the query line
///
/// Rules are checked in order; the first keyword contained in the
/// `User query:` line wins. No match yields a reply without an agent line.
#[derive(Debug, Default)]
pub struct KeywordClassifier {
    rules: Vec<(String, String)>,
    fail: bool,
    calls: Arc<Mutex<usize>>,
}

impl KeywordClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, keyword: impl Into<String>, agent_id: impl Into<String>) -> Self {
        self.rules
            .push((keyword.into().to_lowercase(), agent_id.into()));
        self
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub async fn call_count(&self) -> usize {
        *self.calls.lock().await
    }
}

#[async_trait]
impl Classifier for KeywordClassifier {
    async fn classify(&self, prompt: &str) -> OrchestratorResult<String> {
        *self.calls.lock().await += 1;

        if self.fail {
            return Err(OrchestratorError::classifier("Mock classifier failure"));
        }

        let query = prompt
            .lines()
            .find_map(|line| line.strip_prefix("User query:"))
            .unwrap_or_default()
            .to_lowercase();

        let reply = self
            .rules
            .iter()
            .find(|(keyword, _)| query.contains(keyword.as_str()))
            .map(|(keyword, agent_id)| {
                format!("AGENT_NAME: {agent_id}\nREASON: query mentions {keyword}")
            })
            .unwrap_or_else(|| "I am not sure which agent fits.".to_string());

        Ok(reply)
    }
}

/// Research and writing agents pointing at the given query endpoints
pub fn registry_with_endpoints(research_endpoint: &str, writer_endpoint: &str) -> AgentRegistry {
    let agents = vec![
        AgentDescriptor::new(
            "research_agent",
            "Research Agent",
            "Finds and verifies information",
            Url::parse(research_endpoint).expect("valid research endpoint"),
            vec![
                "research".to_string(),
                "fact_checking".to_string(),
                "information_retrieval".to_string(),
            ],
        ),
        AgentDescriptor::new(
            "content_writer",
            "Content Writing Agent",
            "Creates, edits and summarizes written content",
            Url::parse(writer_endpoint).expect("valid writer endpoint"),
            vec![
                "content_creation".to_string(),
                "editing".to_string(),
                "style_adaptation".to_string(),
                "summarization".to_string(),
            ],
        ),
    ];

    AgentRegistry::new(agents).expect("unique test agent ids")
}

/// Two-agent registry on localhost
pub fn test_registry() -> AgentRegistry {
    registry_with_endpoints(
        "http://localhost:8001/query",
        "http://localhost:8002/query",
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::provider::Message;

    fn request() -> CompletionRequest {
        CompletionRequest {
            messages: vec![Message::user("hello")],
            model: "mock-model".to_string(),
            max_tokens: None,
            temperature: None,
            stop_sequences: None,
            metadata: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn test_mock_llm_provider_cycles_responses() {
        let provider = MockLlmProvider::new(vec!["one".to_string(), "two".to_string()]);

        let first = provider.complete(request()).await.unwrap();
        let second = provider.complete(request()).await.unwrap();
        let third = provider.complete(request()).await.unwrap();

        assert_eq!(first.content.as_deref(), Some("one"));
        assert_eq!(second.content.as_deref(), Some("two"));
        assert_eq!(third.content.as_deref(), Some("one"));
        assert_eq!(provider.call_count().await, 3);
    }

    #[tokio::test]
    async fn test_mock_llm_provider_failure() {
        let provider = MockLlmProvider::with_failure();
        assert!(provider.complete(request()).await.is_err());
        assert!(provider.health_check().await.is_err());
        assert_eq!(provider.call_count().await, 1);
    }

    #[tokio::test]
    async fn test_keyword_classifier_matches_query_line_only() {
        let classifier = KeywordClassifier::new().route("grammar", "content_writer");

        let reply = classifier
            .classify("Agents:\n- grammar bots\n\nUser query: what is rust?")
            .await
            .unwrap();
        assert!(!reply.contains("AGENT_NAME:"));

        let reply = classifier
            .classify("User query: fix the Grammar please")
            .await
            .unwrap();
        assert!(reply.starts_with("AGENT_NAME: content_writer"));
        assert_eq!(classifier.call_count().await, 2);
    }

    #[test]
    fn test_registry_order() {
        let registry = test_registry();
        assert_eq!(registry.agent_ids(), vec!["research_agent", "content_writer"]);
    }
}
