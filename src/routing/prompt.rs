//! Classification prompt construction

use crate::registry::{AgentDescriptor, AgentRegistry};

/// Prefix of the line carrying the selected agent id
pub const AGENT_NAME_PREFIX: &str = "AGENT_NAME:";
/// Prefix of the line carrying the free-text justification
pub const REASON_PREFIX: &str = "REASON:";

/// One catalog line: `- id: name - description (Capabilities: a, b)`
pub fn format_agent_line(agent: &AgentDescriptor) -> String {
    let capabilities = if agent.capabilities.is_empty() {
        "none".to_string()
    } else {
        agent.capabilities.join(", ")
    };

    format!(
        "- {}: {} - {} (Capabilities: {})",
        agent.id, agent.name, agent.description, capabilities
    )
}

/// Format every registry entry, in load order
pub fn format_agent_catalog(registry: &AgentRegistry) -> String {
    registry
        .iter()
        .map(format_agent_line)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Build the full prompt sent to the classifier oracle
pub fn build_routing_prompt(registry: &AgentRegistry, query: &str) -> String {
    format!(
        r#"You are an orchestrator agent that routes queries to specialized agents.

Available agents:
{catalog}

User query: {query}

Analyze the query and determine which agent is best suited to handle it.
Select exactly one agent from the list above and answer with its id exactly as written before the colon.

Output format:
{AGENT_NAME_PREFIX} <selected agent id>
{REASON_PREFIX} <brief explanation for selection>
"#,
        catalog = format_agent_catalog(registry),
        query = query,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::mocks::test_registry;

    #[test]
    fn test_agent_line_format() {
        let registry = test_registry();
        let line = format_agent_line(registry.get("content_writer").unwrap());

        assert_eq!(
            line,
            "- content_writer: Content Writing Agent - Creates, edits and summarizes written content (Capabilities: content_creation, editing, style_adaptation, summarization)"
        );
    }

    #[test]
    fn test_prompt_enumerates_every_agent_and_query() {
        let registry = test_registry();
        let prompt = build_routing_prompt(&registry, "Please fix the grammar in this paragraph");

        for agent in registry.iter() {
            assert!(prompt.contains(&format!("- {}: {}", agent.id, agent.name)));
        }
        assert!(prompt.contains("User query: Please fix the grammar in this paragraph"));
        assert!(prompt.contains("AGENT_NAME: <selected agent id>"));
        assert!(prompt.contains("REASON: <brief explanation for selection>"));
    }

    #[test]
    fn test_catalog_preserves_registry_order() {
        let registry = test_registry();
        let catalog = format_agent_catalog(&registry);

        let research = catalog.find("research_agent").unwrap();
        let writer = catalog.find("content_writer").unwrap();
        assert!(research < writer);
    }
}
