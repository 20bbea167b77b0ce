//! Query router
//!
//! Builds the classification prompt, asks the classifier once, and either
//! selects a registry agent or ends the workflow with a clarification
//! request. Classifier failures are not caught here.

use crate::classifier::Classifier;
use crate::error::{OrchestratorError, OrchestratorResult};
use crate::observability::metrics::metrics;
use crate::registry::AgentRegistry;
use crate::routing::parser::ClassifierReply;
use crate::routing::prompt::build_routing_prompt;
use crate::workflow::state::{NextAction, WorkflowState};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Returned when the classifier gives no usable agent
pub const CLARIFICATION_MESSAGE: &str = "I couldn't determine which agent would be best suited for your query. Could you please provide more specific information?";

/// Returned for blank queries without consulting the classifier
pub const EMPTY_QUERY_MESSAGE: &str = "No query provided.";

/// Outcome of a single classification attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoutingDecision {
    Selected {
        agent_id: String,
        reason: Option<String>,
    },
    Unroutable(UnroutableReason),
}

/// Why no agent could be selected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnroutableReason {
    EmptyQuery,
    NoSelection,
    UnknownAgent(String),
}

impl RoutingDecision {
    /// Validate a parsed reply against the registry
    pub fn from_reply(reply: ClassifierReply, registry: &AgentRegistry) -> Self {
        match reply.agent_id {
            None => RoutingDecision::Unroutable(UnroutableReason::NoSelection),
            Some(agent_id) if registry.contains(&agent_id) => RoutingDecision::Selected {
                agent_id,
                reason: reply.reason,
            },
            Some(agent_id) => RoutingDecision::Unroutable(UnroutableReason::UnknownAgent(agent_id)),
        }
    }

    pub fn selected_agent(&self) -> Option<&str> {
        match self {
            RoutingDecision::Selected { agent_id, .. } => Some(agent_id),
            RoutingDecision::Unroutable(_) => None,
        }
    }
}

/// Router over an injected classifier
pub struct QueryRouter {
    classifier: Arc<dyn Classifier>,
}

impl QueryRouter {
    pub fn new(classifier: Arc<dyn Classifier>) -> Self {
        Self { classifier }
    }

    /// Classify a query and validate the answer
    pub async fn decide(
        &self,
        query: &str,
        registry: &AgentRegistry,
    ) -> OrchestratorResult<RoutingDecision> {
        if query.trim().is_empty() {
            return Ok(RoutingDecision::Unroutable(UnroutableReason::EmptyQuery));
        }

        let prompt = build_routing_prompt(registry, query);
        debug!(prompt_len = prompt.len(), "Built routing prompt");

        let raw_reply = self.classifier.classify(&prompt).await?;
        let reply = ClassifierReply::parse(&raw_reply);

        if let Some(reason) = &reply.reason {
            debug!(reason = %reason, "Classifier reasoning");
        }

        Ok(RoutingDecision::from_reply(reply, registry))
    }

    /// ROUTE step: returns a PROCESS or END state
    pub async fn route(
        &self,
        state: WorkflowState,
        registry: &AgentRegistry,
    ) -> OrchestratorResult<WorkflowState> {
        if state.next_action() != NextAction::Route {
            return Err(OrchestratorError::internal_error(format!(
                "router invoked in {} state",
                state.next_action()
            )));
        }

        match self.decide(state.query(), registry).await? {
            RoutingDecision::Selected { agent_id, reason } => {
                info!(
                    agent_id = %agent_id,
                    reason = reason.as_deref().unwrap_or(""),
                    "Query routed"
                );
                metrics().record_routed();
                Ok(state.select_agent(agent_id))
            }
            RoutingDecision::Unroutable(UnroutableReason::EmptyQuery) => {
                metrics().record_unroutable();
                Ok(state.finish(EMPTY_QUERY_MESSAGE))
            }
            RoutingDecision::Unroutable(reason) => {
                warn!(reason = ?reason, "Query could not be routed");
                metrics().record_unroutable();
                Ok(state.finish(CLARIFICATION_MESSAGE))
            }
        }
    }
}
