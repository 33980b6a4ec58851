//! Agent registry: named agent handles, capability tags, capacity limits.

use std::str::FromStr;
use std::sync::Arc;

use quorum_common::{Agent, AgentCapability, QuorumError, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

/// The agent types the coordinator knows how to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentType {
    Research,
    Email,
    Assistant,
}

impl AgentType {
    /// Fixed type-to-capability table. Tags are recorded verbatim at
    /// registration and drive capability-based auto-assignment.
    pub fn capabilities(&self) -> &'static [AgentCapability] {
        match self {
            AgentType::Research => &[
                AgentCapability::Research,
                AgentCapability::Search,
                AgentCapability::Analysis,
                AgentCapability::Reporting,
            ],
            AgentType::Email => &[
                AgentCapability::Email,
                AgentCapability::Communication,
                AgentCapability::Drafting,
                AgentCapability::Sending,
            ],
            AgentType::Assistant => &[
                AgentCapability::General,
                AgentCapability::Assistance,
                AgentCapability::Conversation,
            ],
        }
    }
}

impl FromStr for AgentType {
    type Err = QuorumError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "research" => Ok(AgentType::Research),
            "email" => Ok(AgentType::Email),
            "assistant" => Ok(AgentType::Assistant),
            other => Err(QuorumError::UnsupportedAgentType(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Active,
    Inactive,
}

/// A registered agent: the handle plus its registry bookkeeping.
pub struct RegisteredAgent {
    pub name: String,
    pub agent_type: AgentType,
    pub capabilities: Vec<AgentCapability>,
    pub status: AgentStatus,
    pub handle: Arc<dyn Agent>,
}

/// Roster snapshot handed to the router. Carries only what routing needs.
#[derive(Debug, Clone)]
pub struct AgentProfile {
    pub name: String,
    pub capabilities: Vec<AgentCapability>,
}

/// Per-agent entry in a status report.
#[derive(Debug, Clone, Serialize)]
pub struct AgentStatusEntry {
    pub name: String,
    pub agent_type: AgentType,
    pub capabilities: Vec<AgentCapability>,
    pub status: AgentStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegistryStatus {
    pub total: usize,
    pub active: usize,
    pub agents: Vec<AgentStatusEntry>,
}

/// Holds agents in registration order. Agents are never removed during a
/// session; only their status flips.
pub struct AgentRegistry {
    agents: Vec<RegisteredAgent>,
    max_agents: usize,
}

impl AgentRegistry {
    pub fn new(max_agents: usize) -> Self {
        Self {
            agents: Vec::new(),
            max_agents,
        }
    }

    /// Register a new agent. Capacity is checked before the duplicate scan.
    pub fn register(
        &mut self,
        agent_type: AgentType,
        name: impl Into<String>,
        handle: Arc<dyn Agent>,
    ) -> Result<()> {
        let name = name.into();

        if self.agents.len() >= self.max_agents {
            return Err(QuorumError::CapacityExceeded {
                limit: self.max_agents,
            });
        }
        if self.agents.iter().any(|a| a.name == name) {
            return Err(QuorumError::DuplicateAgentName(name));
        }

        info!(agent = %name, agent_type = ?agent_type, "Registering agent");

        self.agents.push(RegisteredAgent {
            name,
            agent_type,
            capabilities: agent_type.capabilities().to_vec(),
            status: AgentStatus::Active,
            handle,
        });
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&RegisteredAgent> {
        self.agents.iter().find(|a| a.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// First-match scan in registration order among active agents.
    pub fn find_by_capability(&self, tag: AgentCapability) -> Option<&RegisteredAgent> {
        self.agents
            .iter()
            .find(|a| a.status == AgentStatus::Active && a.capabilities.contains(&tag))
    }

    /// First active agent of any kind, in registration order.
    pub fn first_active(&self) -> Option<&RegisteredAgent> {
        self.agents.iter().find(|a| a.status == AgentStatus::Active)
    }

    pub fn set_active(&mut self, name: &str, active: bool) -> Result<()> {
        let agent = self
            .agents
            .iter_mut()
            .find(|a| a.name == name)
            .ok_or_else(|| QuorumError::UnknownAgent(name.to_string()))?;
        agent.status = if active {
            AgentStatus::Active
        } else {
            AgentStatus::Inactive
        };
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn profiles(&self) -> Vec<AgentProfile> {
        self.agents
            .iter()
            .filter(|a| a.status == AgentStatus::Active)
            .map(|a| AgentProfile {
                name: a.name.clone(),
                capabilities: a.capabilities.clone(),
            })
            .collect()
    }

    pub fn status(&self) -> RegistryStatus {
        RegistryStatus {
            total: self.agents.len(),
            active: self
                .agents
                .iter()
                .filter(|a| a.status == AgentStatus::Active)
                .count(),
            agents: self
                .agents
                .iter()
                .map(|a| AgentStatusEntry {
                    name: a.name.clone(),
                    agent_type: a.agent_type,
                    capabilities: a.capabilities.clone(),
                    status: a.status,
                })
                .collect(),
        }
    }

    pub fn clear(&mut self) {
        self.agents.clear();
    }
}
