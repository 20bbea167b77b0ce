//! HTTP dispatch to the selected worker
//!
//! Every worker outcome, good or bad, becomes a terminal textual response.
//! The dispatcher never retries.

use crate::dispatch::worker::{CapabilityReport, WorkerReply, WorkerRequest};
use crate::error::{OrchestratorError, OrchestratorResult};
use crate::observability::metrics::metrics;
use crate::registry::{AgentDescriptor, AgentRegistry};
use crate::workflow::state::{NextAction, WorkflowState};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn, Instrument};

/// Used when the PROCESS state names no registry agent
pub const NO_VALID_AGENT_MESSAGE: &str = "No valid agent was selected for this query.";

/// Normalized HTTP outcome of one dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DispatchOutcome {
    Success,
    AgentError,
    TransportError,
}

/// Result of one worker call, consumed by the PROCESS step
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchResult {
    pub outcome: DispatchOutcome,
    pub status: Option<u16>,
    pub payload: Option<WorkerReply>,
    pub raw_error: Option<String>,
}

impl DispatchResult {
    fn success(status: u16, payload: WorkerReply) -> Self {
        Self {
            outcome: DispatchOutcome::Success,
            status: Some(status),
            payload: Some(payload),
            raw_error: None,
        }
    }

    fn agent_error(status: u16, raw_error: String) -> Self {
        Self {
            outcome: DispatchOutcome::AgentError,
            status: Some(status),
            payload: None,
            raw_error: Some(raw_error),
        }
    }

    fn transport_error(raw_error: String) -> Self {
        Self {
            outcome: DispatchOutcome::TransportError,
            status: None,
            payload: None,
            raw_error: Some(raw_error),
        }
    }

    /// Caller-facing text naming the agent
    pub fn render(&self, agent: &AgentDescriptor) -> String {
        let raw_error = self.raw_error.as_deref().unwrap_or("unknown error");

        match (self.outcome, &self.payload) {
            (DispatchOutcome::Success, Some(reply)) => {
                let mut text = format!("Response from {}:\n\n{}", agent.name, reply.result);
                if let Some(confidence) = reply.confidence {
                    text.push_str(&format!("\n\nConfidence: {confidence}"));
                }
                let metadata = reply.metadata_lines();
                if !metadata.is_empty() {
                    text.push_str("\n\nAdditional Information:\n");
                    text.push_str(&metadata.join("\n"));
                }
                text
            }
            (DispatchOutcome::TransportError, _) => {
                format!("Failed to communicate with {}: {raw_error}", agent.name)
            }
            _ => format!("Error from {}: {raw_error}", agent.name),
        }
    }
}

/// Capability discovery failures
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("worker unreachable: {0}")]
    Transport(String),
    #[error("worker answered {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed capability report: {0}")]
    Malformed(String),
}

/// Forwards queries to worker endpoints
#[derive(Debug, Clone)]
pub struct Dispatcher {
    client: reqwest::Client,
    timeout: Duration,
}

impl Dispatcher {
    pub fn new(timeout: Duration) -> OrchestratorResult<Self> {
        let client = reqwest::Client::builder().build().map_err(|e| {
            OrchestratorError::internal_error(format!("failed to build HTTP client: {e}"))
        })?;

        Ok(Self { client, timeout })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// POST the query to one agent and normalize the outcome
    pub async fn send(&self, agent: &AgentDescriptor, query: &str) -> DispatchResult {
        debug!(
            agent_id = %agent.id,
            endpoint = %agent.endpoint,
            timeout_ms = self.timeout.as_millis() as u64,
            "Dispatching query to agent"
        );

        let response = match self
            .client
            .post(agent.endpoint.clone())
            .json(&WorkerRequest { query })
            .timeout(self.timeout)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return DispatchResult::transport_error(self.describe_transport_error(&e)),
        };

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            let raw = match response.text().await {
                Ok(body) if !body.trim().is_empty() => body,
                Ok(_) => format!("HTTP {status}"),
                Err(e) => {
                    debug!(error = %e, "Failed to read error body");
                    format!("HTTP {status}")
                }
            };
            return DispatchResult::agent_error(status.as_u16(), raw);
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return DispatchResult::transport_error(self.describe_transport_error(&e)),
        };

        match serde_json::from_str::<WorkerReply>(&body) {
            Ok(reply) => DispatchResult::success(status.as_u16(), reply),
            Err(e) => DispatchResult::agent_error(
                status.as_u16(),
                format!("malformed response ({e})"),
            ),
        }
    }

    /// PROCESS step: always returns an END state
    pub async fn dispatch(
        &self,
        state: WorkflowState,
        registry: &AgentRegistry,
    ) -> OrchestratorResult<WorkflowState> {
        if state.next_action() != NextAction::Process {
            return Err(OrchestratorError::internal_error(format!(
                "dispatcher invoked in {} state",
                state.next_action()
            )));
        }

        let Some(agent) = state.current_agent().and_then(|id| registry.get(id)) else {
            warn!(
                agent_id = state.current_agent().unwrap_or("<none>"),
                "PROCESS state names no registry agent"
            );
            return Ok(state.finish(NO_VALID_AGENT_MESSAGE));
        };

        let result = self
            .send(agent, state.query())
            .instrument(crate::dispatch_span!(agent_id = %agent.id))
            .await;
        metrics().record_dispatch(result.outcome);

        match result.outcome {
            DispatchOutcome::Success => info!(agent_id = %agent.id, "Agent answered"),
            outcome => warn!(
                agent_id = %agent.id,
                outcome = ?outcome,
                status = result.status,
                error = result.raw_error.as_deref().unwrap_or(""),
                "Agent dispatch failed"
            ),
        }

        let response = result.render(agent);
        Ok(state.finish(response))
    }

    /// GET the agent's capability-discovery endpoint
    pub async fn fetch_capabilities(
        &self,
        agent: &AgentDescriptor,
    ) -> Result<CapabilityReport, DiscoveryError> {
        let response = self
            .client
            .get(agent.capabilities_url())
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| DiscoveryError::Transport(self.describe_transport_error(&e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| DiscoveryError::Transport(self.describe_transport_error(&e)))?;

        if !status.is_success() {
            return Err(DiscoveryError::Status {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|e| DiscoveryError::Malformed(e.to_string()))
    }

    fn describe_transport_error(&self, error: &reqwest::Error) -> String {
        if error.is_timeout() {
            format!("request timed out after {:?}", self.timeout)
        } else if error.is_connect() {
            format!("connection failed ({error})")
        } else {
            error.to_string()
        }
    }
}
