//! The core agent abstraction.
//!
//! An agent is anything that can turn an incoming message into a reply.
//! Concrete role agents (research, email, assistant) live in `quorum-agents`
//! and compose their own collaborators (search client, mail transport)
//! behind this trait; the coordinator only ever sees `dyn Agent`.

use crate::{AgentMessage, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Capability tags an agent can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentCapability {
    Research,
    Search,
    Analysis,
    Reporting,
    Email,
    Communication,
    Drafting,
    Sending,
    General,
    Assistance,
    Conversation,
}

/// A polymorphic text-in/text-out executor.
#[async_trait]
pub trait Agent: Send + Sync {
    /// The agent's unique name within the registry.
    fn name(&self) -> &str;

    /// The agent's role, e.g. "research", "email", "assistant".
    fn role(&self) -> &'static str;

    /// Handle a single message and produce a reply.
    async fn handle(&self, message: &AgentMessage) -> Result<AgentMessage>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capability_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&AgentCapability::Research).unwrap(),
            "\"research\""
        );
        assert_eq!(
            serde_json::to_string(&AgentCapability::Conversation).unwrap(),
            "\"conversation\""
        );
    }
}
