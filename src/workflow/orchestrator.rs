//! Workflow controller
//!
//! Drives one query through ROUTE -> (PROCESS ->) END. Each step consumes
//! the previous state and the controller checks the edge it took against
//! `NextAction::can_advance_to` before accepting the new state.

use crate::classifier::{Classifier, LlmClassifier};
use crate::config::OrchestratorConfig;
use crate::dispatch::Dispatcher;
use crate::error::{OrchestratorError, OrchestratorResult};
use crate::llm::provider::LlmProvider;
use crate::observability::metrics::metrics;
use crate::registry::AgentRegistry;
use crate::routing::QueryRouter;
use crate::workflow::state::{NextAction, WorkflowState};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, Instrument};
use uuid::Uuid;

/// Returned if a query reaches END without a response
pub const FALLBACK_RESPONSE: &str = "No response was generated for this query.";

/// Routes queries to workers and relays their answers
pub struct Orchestrator {
    registry: Arc<AgentRegistry>,
    router: QueryRouter,
    dispatcher: Dispatcher,
}

impl Orchestrator {
    pub fn new(
        registry: Arc<AgentRegistry>,
        classifier: Arc<dyn Classifier>,
        dispatch_timeout: Duration,
    ) -> OrchestratorResult<Self> {
        Ok(Self {
            registry,
            router: QueryRouter::new(classifier),
            dispatcher: Dispatcher::new(dispatch_timeout)?,
        })
    }

    /// Wire registry, classifier and dispatcher from configuration
    pub fn from_config(
        config: &OrchestratorConfig,
        provider: Arc<dyn LlmProvider>,
    ) -> OrchestratorResult<Self> {
        let registry = AgentRegistry::from_entries(&config.agents)?;

        let mut classifier =
            LlmClassifier::new(provider, config.llm.model.clone()).with_timeout(config.llm.timeout());
        if let Some(temperature) = config.llm.temperature {
            classifier = classifier.with_temperature(temperature);
        }
        if let Some(max_tokens) = config.llm.max_tokens {
            classifier = classifier.with_max_tokens(Some(max_tokens));
        }

        Self::new(
            Arc::new(registry),
            Arc::new(classifier),
            config.dispatch.timeout(),
        )
    }

    pub fn registry(&self) -> &AgentRegistry {
        &self.registry
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Perform exactly one transition
    pub async fn step(&self, state: WorkflowState) -> OrchestratorResult<WorkflowState> {
        let from = state.next_action();

        let next = match from {
            NextAction::Route => self.router.route(state, &self.registry).await?,
            NextAction::Process => self.dispatcher.dispatch(state, &self.registry).await?,
            NextAction::End => {
                return Err(OrchestratorError::internal_error(
                    "workflow already reached END",
                ))
            }
        };

        if !from.can_advance_to(next.next_action()) {
            return Err(OrchestratorError::internal_error(format!(
                "illegal transition {from} -> {}",
                next.next_action()
            )));
        }

        debug!(from = %from, to = %next.next_action(), "Workflow transition");
        Ok(next)
    }

    /// Run a query to completion and return the caller-facing text
    ///
    /// Only classifier oracle failures (and internal faults) are errors;
    /// every routing or worker outcome comes back as `Ok` text.
    pub async fn run(&self, query: &str) -> OrchestratorResult<String> {
        let query_id = Uuid::new_v4();
        let span = crate::query_span!(query_id = %query_id);

        self.run_inner(query).instrument(span).await
    }

    async fn run_inner(&self, query: &str) -> OrchestratorResult<String> {
        // Dropped with the future if the caller's deadline cancels the query
        let timer = metrics().start_query();
        info!(query_len = query.len(), "Query received");

        let mut state = WorkflowState::new(query);
        while !state.is_terminal() {
            state = match self.step(state).await {
                Ok(next) => next,
                Err(e) => {
                    if e.is_oracle_failure() {
                        metrics().record_classifier_failure();
                    }
                    timer.fail();
                    error!(error = %e, "Query failed");
                    return Err(e);
                }
            };
        }

        let elapsed = timer.elapsed();
        timer.complete();
        info!(
            agent_id = state.current_agent().unwrap_or("<none>"),
            elapsed_ms = elapsed.as_millis() as u64,
            "Query completed"
        );

        Ok(state
            .into_response()
            .unwrap_or_else(|| FALLBACK_RESPONSE.to_string()))
    }
}
