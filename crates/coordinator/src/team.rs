//! Teams and round-robin multi-agent sessions.

use std::str::FromStr;
use std::sync::Arc;

use quorum_common::{Agent, AgentMessage, QuorumError, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TeamMode {
    RoundRobin,
    /// Declared for parity with the caller surface. Dispatching a swarm
    /// team fails with an execution error; its coordination semantics are
    /// delegated to an external framework and not implemented here.
    Swarm,
}

impl FromStr for TeamMode {
    type Err = QuorumError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "round_robin" => Ok(TeamMode::RoundRobin),
            "swarm" => Ok(TeamMode::Swarm),
            other => Err(QuorumError::UnsupportedTeamMode(other.to_string())),
        }
    }
}

/// A named ordered group of agents. Membership is immutable after creation.
#[derive(Debug, Clone)]
pub struct Team {
    pub name: String,
    pub mode: TeamMode,
    pub members: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TeamStatusEntry {
    pub name: String,
    pub mode: TeamMode,
    pub members: Vec<String>,
}

/// Run a round-robin session: agents take turns in order, each seeing the
/// objective plus the transcript so far, until `max_turns` turns have run.
/// Returns the aggregate transcript. An agent error aborts the session.
pub async fn run_round_robin(
    objective: &str,
    agents: &[Arc<dyn Agent>],
    max_turns: usize,
) -> Result<String> {
    if agents.is_empty() {
        return Err(QuorumError::NoValidParticipants);
    }

    let mut transcript = String::new();

    for turn in 0..max_turns {
        let agent = &agents[turn % agents.len()];

        let prompt = if transcript.is_empty() {
            objective.to_string()
        } else {
            format!("{objective}\n\n当前讨论记录:\n{transcript}\n\n请继续。")
        };

        debug!(turn, agent = %agent.name(), "Round-robin turn");
        let reply = agent.handle(&AgentMessage::user(prompt)).await?;

        transcript.push_str(&format!("【{}】{}\n", agent.name(), reply.content));
    }

    Ok(transcript)
}
