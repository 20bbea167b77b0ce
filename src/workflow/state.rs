//! Per-query workflow state
//!
//! A fresh `WorkflowState` is created for each query and threaded by value
//! through the steps. Each step consumes the old state and returns the next
//! one; nothing mutates a state another step can still observe.

use serde::Serialize;
use std::fmt;

/// What the controller should do next
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NextAction {
    Route,
    Process,
    End,
}

impl NextAction {
    /// Allowed edges: Route -> Process, Route -> End, Process -> End
    pub fn can_advance_to(self, next: NextAction) -> bool {
        matches!(
            (self, next),
            (NextAction::Route, NextAction::Process)
                | (NextAction::Route, NextAction::End)
                | (NextAction::Process, NextAction::End)
        )
    }

    pub fn is_terminal(self) -> bool {
        self == NextAction::End
    }
}

impl fmt::Display for NextAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            NextAction::Route => "ROUTE",
            NextAction::Process => "PROCESS",
            NextAction::End => "END",
        };
        f.write_str(label)
    }
}

/// State record carried between workflow steps
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkflowState {
    query: String,
    current_agent: Option<String>,
    next_action: NextAction,
    response: Option<String>,
}

impl WorkflowState {
    /// Initial state for a query
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            current_agent: None,
            next_action: NextAction::Route,
            response: None,
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn current_agent(&self) -> Option<&str> {
        self.current_agent.as_deref()
    }

    pub fn next_action(&self) -> NextAction {
        self.next_action
    }

    pub fn response(&self) -> Option<&str> {
        self.response.as_deref()
    }

    pub fn is_terminal(&self) -> bool {
        self.next_action.is_terminal()
    }

    /// Route -> Process with the chosen agent
    pub fn select_agent(self, agent_id: impl Into<String>) -> Self {
        debug_assert!(self.next_action.can_advance_to(NextAction::Process));
        Self {
            current_agent: Some(agent_id.into()),
            next_action: NextAction::Process,
            ..self
        }
    }

    /// Any non-terminal state -> End with a final response
    pub fn finish(self, response: impl Into<String>) -> Self {
        debug_assert!(self.next_action.can_advance_to(NextAction::End));
        Self {
            next_action: NextAction::End,
            response: Some(response.into()),
            ..self
        }
    }

    pub fn into_response(self) -> Option<String> {
        self.response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state_starts_at_route() {
        let state = WorkflowState::new("hello");
        assert_eq!(state.query(), "hello");
        assert_eq!(state.next_action(), NextAction::Route);
        assert!(state.current_agent().is_none());
        assert!(state.response().is_none());
        assert!(!state.is_terminal());
    }

    #[test]
    fn test_select_then_finish() {
        let state = WorkflowState::new("q").select_agent("research_agent");
        assert_eq!(state.next_action(), NextAction::Process);
        assert_eq!(state.current_agent(), Some("research_agent"));

        let state = state.finish("done");
        assert!(state.is_terminal());
        assert_eq!(state.current_agent(), Some("research_agent"));
        assert_eq!(state.into_response().as_deref(), Some("done"));
    }

    #[test]
    fn test_route_can_finish_directly() {
        let state = WorkflowState::new("q").finish("be more specific");
        assert!(state.is_terminal());
        assert!(state.current_agent().is_none());
    }

    #[test]
    fn test_transition_table() {
        use NextAction::*;

        assert!(Route.can_advance_to(Process));
        assert!(Route.can_advance_to(End));
        assert!(Process.can_advance_to(End));

        assert!(!Process.can_advance_to(Route));
        assert!(!End.can_advance_to(Route));
        assert!(!End.can_advance_to(Process));
        assert!(!End.can_advance_to(End));
        assert!(!Route.can_advance_to(Route));
        assert!(!Process.can_advance_to(Process));
    }

    #[test]
    fn test_next_action_display_and_serialization() {
        assert_eq!(NextAction::Process.to_string(), "PROCESS");
        assert_eq!(
            serde_json::to_string(&NextAction::End).unwrap(),
            "\"END\""
        );
    }
}
