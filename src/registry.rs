//! Static agent registry
//!
//! Loaded once at startup from configuration and never mutated afterwards.
//! Concurrent queries share it through an `Arc` and read it without locks.

use crate::config::{AgentEntry, ConfigError};
use serde::Serialize;
use std::collections::HashMap;
use url::Url;

/// Dispatch metadata for one worker service
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AgentDescriptor {
    pub id: String,
    pub name: String,
    pub description: String,
    pub endpoint: Url,
    pub capabilities: Vec<String>,
}

impl AgentDescriptor {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        endpoint: Url,
        capabilities: Vec<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            endpoint,
            capabilities,
        }
    }

    /// Check if agent declares a given capability (case-insensitive)
    pub fn can_handle(&self, capability: &str) -> bool {
        self.capabilities
            .iter()
            .any(|c| c.eq_ignore_ascii_case(capability))
    }

    /// Capability-discovery URL on the same origin as the query endpoint
    pub fn capabilities_url(&self) -> Url {
        let mut url = self.endpoint.clone();
        url.set_path("/capabilities");
        url.set_query(None);
        url.set_fragment(None);
        url
    }
}

impl TryFrom<&AgentEntry> for AgentDescriptor {
    type Error = ConfigError;

    fn try_from(entry: &AgentEntry) -> Result<Self, Self::Error> {
        let endpoint = Url::parse(&entry.endpoint).map_err(|e| ConfigError::InvalidEndpoint {
            agent_id: entry.id.clone(),
            reason: e.to_string(),
        })?;

        Ok(Self::new(
            entry.id.clone(),
            entry.name.clone(),
            entry.description.clone(),
            endpoint,
            entry.capabilities.clone(),
        ))
    }
}

/// Read-only table of known workers, enumerated in load order
#[derive(Debug, Clone, Default)]
pub struct AgentRegistry {
    agents: Vec<AgentDescriptor>,
    index: HashMap<String, usize>,
}

impl AgentRegistry {
    /// Build a registry from descriptors; later duplicates are rejected
    pub fn new(agents: Vec<AgentDescriptor>) -> Result<Self, ConfigError> {
        let mut index = HashMap::with_capacity(agents.len());
        for (position, agent) in agents.iter().enumerate() {
            if index.insert(agent.id.clone(), position).is_some() {
                return Err(ConfigError::DuplicateAgentId(agent.id.clone()));
            }
        }

        Ok(Self { agents, index })
    }

    /// Build a registry from configuration entries
    pub fn from_entries(entries: &[AgentEntry]) -> Result<Self, ConfigError> {
        let agents = entries
            .iter()
            .map(AgentDescriptor::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(agents)
    }

    pub fn get(&self, agent_id: &str) -> Option<&AgentDescriptor> {
        self.index.get(agent_id).map(|&position| &self.agents[position])
    }

    pub fn contains(&self, agent_id: &str) -> bool {
        self.index.contains_key(agent_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &AgentDescriptor> {
        self.agents.iter()
    }

    pub fn agent_ids(&self) -> Vec<&str> {
        self.agents.iter().map(|a| a.id.as_str()).collect()
    }

    /// Agents declaring a capability, in load order
    pub fn find_by_capability(&self, capability: &str) -> Vec<&AgentDescriptor> {
        self.agents
            .iter()
            .filter(|agent| agent.can_handle(capability))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OrchestratorConfig;

    fn descriptor(id: &str, endpoint: &str, capabilities: &[&str]) -> AgentDescriptor {
        AgentDescriptor::new(
            id,
            format!("{id} name"),
            format!("{id} description"),
            Url::parse(endpoint).unwrap(),
            capabilities.iter().map(|c| c.to_string()).collect(),
        )
    }

    #[test]
    fn test_registry_from_config() {
        let config = OrchestratorConfig::test_config();
        let registry = AgentRegistry::from_entries(&config.agents).unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.agent_ids(), vec!["research_agent", "content_writer"]);
        assert!(registry.contains("content_writer"));
        assert!(!registry.contains("unknown"));
        assert_eq!(
            registry.get("research_agent").unwrap().endpoint.as_str(),
            "http://localhost:8001/query"
        );
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let result = AgentRegistry::new(vec![
            descriptor("a", "http://localhost:1/query", &[]),
            descriptor("a", "http://localhost:2/query", &[]),
        ]);
        assert!(matches!(result, Err(ConfigError::DuplicateAgentId(_))));
    }

    #[test]
    fn test_find_by_capability_case_insensitive() {
        let registry = AgentRegistry::new(vec![
            descriptor("writer", "http://localhost:1/query", &["editing"]),
            descriptor("researcher", "http://localhost:2/query", &["fact_checking"]),
        ])
        .unwrap();

        let found = registry.find_by_capability("EDITING");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "writer");
        assert!(registry.find_by_capability("translation").is_empty());
    }

    #[test]
    fn test_capabilities_url_replaces_path() {
        let agent = descriptor("a", "http://localhost:8001/query?x=1#frag", &[]);
        assert_eq!(
            agent.capabilities_url().as_str(),
            "http://localhost:8001/capabilities"
        );
    }

    #[test]
    fn test_empty_registry() {
        let registry = AgentRegistry::default();
        assert!(registry.is_empty());
        assert!(registry.get("anything").is_none());
    }
}
