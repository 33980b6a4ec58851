//! The coordinator facade: composition root for registry, router, store,
//! executor, teams, and metrics.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use quorum_agents::{
    AssistantAgent, EmailAgent, EmailTransport, GmailTransport, ResearchAgent, SearchClient,
    SearxngClient,
};
use quorum_common::{
    Agent, AgentMessage, ExecutorKind, QuorumError, Result, Task, TaskPriority, TaskResult,
    TaskStatus, TaskType,
};
use quorum_llm::{ChatModel, build_chat_model};
use serde::Serialize;
use serde_json::{Map, Value};
use std::str::FromStr;
use tracing::{info, warn};

use crate::config::CoordinatorConfig;
use crate::metrics::CoordinationMetrics;
use crate::registry::{AgentRegistry, AgentType, RegistryStatus};
use crate::router::Router;
use crate::store::{TaskStatusReport, TaskStore};
use crate::team::{Team, TeamMode, TeamStatusEntry, run_round_robin};

/// Parameters for `add_task`. Everything beyond id and description is
/// optional; unset type/priority are filled in by routing.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub id: String,
    pub description: String,
    pub task_type: Option<TaskType>,
    pub priority: Option<TaskPriority>,
    pub agent: Option<String>,
    pub team: Option<String>,
    pub metadata: Map<String, Value>,
    pub use_smart_routing: bool,
}

impl NewTask {
    pub fn new(id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            task_type: None,
            priority: None,
            agent: None,
            team: None,
            metadata: Map::new(),
            use_smart_routing: true,
        }
    }

    pub fn task_type(mut self, task_type: TaskType) -> Self {
        self.task_type = Some(task_type);
        self
    }

    pub fn priority(mut self, priority: TaskPriority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn agent(mut self, agent: impl Into<String>) -> Self {
        self.agent = Some(agent.into());
        self
    }

    pub fn team(mut self, team: impl Into<String>) -> Self {
        self.team = Some(team.into());
        self
    }

    pub fn metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn smart_routing(mut self, enabled: bool) -> Self {
        self.use_smart_routing = enabled;
        self
    }
}

/// Record of one ad-hoc coordination session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionResult {
    pub description: String,
    pub participants: Vec<String>,
    pub result: String,
    pub timestamp: DateTime<Utc>,
    pub rounds: usize,
}

pub struct Coordinator {
    config: CoordinatorConfig,
    model: Arc<dyn ChatModel>,
    router: Router,
    registry: AgentRegistry,
    teams: Vec<Team>,
    store: TaskStore,
    metrics: CoordinationMetrics,
    search: Option<Arc<dyn SearchClient>>,
    mail: Option<Arc<dyn EmailTransport>>,
}

impl Coordinator {
    /// Build a coordinator, constructing the chat model from configuration.
    /// A broken model or collaborator configuration is fatal here rather
    /// than silently degraded.
    pub fn new(config: CoordinatorConfig) -> Result<Self> {
        let model = build_chat_model(&config.resolved_model())?;
        Self::assemble(config, model)
    }

    /// Build a coordinator around an externally supplied model.
    pub fn with_model(config: CoordinatorConfig, model: Arc<dyn ChatModel>) -> Result<Self> {
        Self::assemble(config, model)
    }

    fn assemble(config: CoordinatorConfig, model: Arc<dyn ChatModel>) -> Result<Self> {
        info!(name = %config.name, "Initializing coordinator");

        let timeout = Duration::from_millis(config.model.timeout_ms);

        let search: Option<Arc<dyn SearchClient>> = match config.search {
            Some(ref search_config) => Some(Arc::new(SearxngClient::new(
                search_config.base_url.clone(),
                search_config.api_key.clone(),
                timeout,
            )?)),
            None => None,
        };

        let mail: Option<Arc<dyn EmailTransport>> = match config.mail {
            Some(ref mail_config) => Some(Arc::new(GmailTransport::new(
                mail_config.access_token.clone(),
                timeout,
            )?)),
            None => None,
        };

        Ok(Self {
            router: Router::new(Some(model.clone()), timeout),
            registry: AgentRegistry::new(config.max_agents),
            teams: Vec::new(),
            store: TaskStore::new(),
            metrics: CoordinationMetrics::default(),
            search,
            mail,
            model,
            config,
        })
    }

    /// Replace the search backend used by agents created afterwards.
    pub fn set_search_client(&mut self, search: Arc<dyn SearchClient>) {
        self.search = Some(search);
    }

    /// Replace the mail transport used by agents created afterwards.
    pub fn set_mail_transport(&mut self, mail: Arc<dyn EmailTransport>) {
        self.mail = Some(mail);
    }

    /// Register a new agent of the given type under `name`.
    pub fn create_agent(&mut self, agent_type: &str, name: &str) -> Result<()> {
        let agent_type = AgentType::from_str(agent_type)?;

        let handle: Arc<dyn Agent> = match agent_type {
            AgentType::Research => {
                let mut agent = ResearchAgent::new(name, self.model.clone());
                if let Some(ref search) = self.search {
                    agent.set_search(search.clone());
                }
                Arc::new(agent)
            }
            AgentType::Email => {
                let mut agent = EmailAgent::new(name, self.model.clone());
                if let Some(ref mail) = self.mail {
                    agent.set_transport(mail.clone());
                }
                Arc::new(agent)
            }
            AgentType::Assistant => Arc::new(AssistantAgent::new(name, self.model.clone())),
        };

        self.registry.register(agent_type, name, handle)?;
        self.metrics.agents_created += 1;
        Ok(())
    }

    /// Create a named team. Members must already be registered; membership
    /// is immutable afterwards.
    pub fn create_team(&mut self, name: &str, mode: &str, members: &[String]) -> Result<()> {
        if self.teams.iter().any(|t| t.name == name) {
            return Err(QuorumError::DuplicateTeamName(name.to_string()));
        }
        let mode = TeamMode::from_str(mode)?;

        for member in members {
            if !self.registry.contains(member) {
                return Err(QuorumError::UnknownAgent(member.clone()));
            }
        }

        info!(team = %name, ?mode, members = members.len(), "Creating team");
        self.teams.push(Team {
            name: name.to_string(),
            mode,
            members: members.to_vec(),
        });
        Ok(())
    }

    fn team(&self, name: &str) -> Option<&Team> {
        self.teams.iter().find(|t| t.name == name)
    }

    /// Add a task. Unassigned tasks are routed (generative path gated by
    /// configuration and the per-task flag, keyword fallback otherwise) and
    /// then auto-assigned by capability tag.
    pub async fn add_task(&mut self, new_task: NewTask) -> Result<String> {
        if self.store.contains(&new_task.id) {
            return Err(QuorumError::DuplicateTaskId(new_task.id));
        }

        let mut task = Task::new(&new_task.id, &new_task.description)
            .with_metadata(new_task.metadata.clone());
        if let Some(task_type) = new_task.task_type {
            task.task_type = task_type;
        }
        if let Some(priority) = new_task.priority {
            task.priority = priority;
        }
        task.assigned_agent = new_task.agent.clone();
        task.assigned_team = new_task.team.clone();

        if task.assigned_agent.is_none() && task.assigned_team.is_none() {
            let use_generative = new_task.use_smart_routing && self.config.smart_routing;
            let roster = self.registry.profiles();
            let outcome = self
                .router
                .route(&new_task.description, &roster, use_generative)
                .await;

            if new_task.task_type.is_none() {
                task.task_type = outcome.task_type;
            }
            if new_task.priority.is_none() {
                task.priority = outcome.priority;
            }
            task.routing_decision = outcome.decision;
            task.assigned_agent = outcome.executor;

            if task.assigned_agent.is_none() {
                task.assigned_agent = self.auto_assign(task.task_type);
            }
        }

        info!(
            task_id = %task.id,
            task_type = ?task.task_type,
            priority = ?task.priority,
            agent = ?task.assigned_agent,
            team = ?task.assigned_team,
            "Task added"
        );

        let id = task.id.clone();
        self.store.insert(task)?;
        self.metrics.tasks_created += 1;
        Ok(id)
    }

    /// Capability-tag scan, falling back to the first active agent of any
    /// kind. None means execution will later fail with "no executor".
    fn auto_assign(&self, task_type: TaskType) -> Option<String> {
        self.registry
            .find_by_capability(task_type.required_capability())
            .or_else(|| self.registry.first_active())
            .map(|a| a.name.clone())
    }

    /// Pop and run the next queued task. Returns the terminal task record,
    /// or `None` when the queue is empty. Dispatch failures become failed
    /// tasks, never errors; the drain loop stays alive.
    pub async fn execute_next_task(&mut self) -> Option<Task> {
        let id = self.store.pop_next()?;

        let (description, assigned_agent, assigned_team) = {
            let task = self.store.get_mut(&id)?;
            task.set_status(TaskStatus::InProgress);
            (
                task.description.clone(),
                task.assigned_agent.clone(),
                task.assigned_team.clone(),
            )
        };

        let dispatch = self
            .dispatch(&description, assigned_agent.as_deref(), assigned_team.as_deref())
            .await;

        let task = self.store.get_mut(&id)?;
        match dispatch {
            Ok(result) => {
                task.result = Some(result);
                task.error = None;
                task.set_status(TaskStatus::Completed);
                self.metrics.tasks_completed += 1;
                info!(task_id = %id, "Task completed");
            }
            Err(e) => {
                task.result = None;
                task.error = Some(e.to_string());
                task.set_status(TaskStatus::Failed);
                self.metrics.tasks_failed += 1;
                warn!(task_id = %id, error = %e, "Task failed");
            }
        }

        let snapshot = self.store.get(&id)?.clone();
        self.store.record_history(snapshot.clone());
        Some(snapshot)
    }

    /// Teams take precedence over agents when both are assigned.
    async fn dispatch(
        &self,
        description: &str,
        agent: Option<&str>,
        team: Option<&str>,
    ) -> Result<TaskResult> {
        if let Some(team_name) = team {
            let team = self.team(team_name).ok_or_else(|| {
                QuorumError::Execution(format!("Team '{team_name}' does not exist"))
            })?;
            if team.mode == TeamMode::Swarm {
                return Err(QuorumError::Execution(format!(
                    "Team '{team_name}' uses swarm mode, which is not supported for dispatch"
                )));
            }

            let mut handles = Vec::with_capacity(team.members.len());
            for member in &team.members {
                let registered = self.registry.get(member).ok_or_else(|| {
                    QuorumError::Execution(format!("Team member '{member}' is not registered"))
                })?;
                handles.push(registered.handle.clone());
            }

            let transcript =
                run_round_robin(description, &handles, self.config.max_team_turns).await?;
            return Ok(TaskResult {
                executor: team_name.to_string(),
                kind: ExecutorKind::Team,
                output: transcript,
            });
        }

        if let Some(agent_name) = agent {
            let registered = self.registry.get(agent_name).ok_or_else(|| {
                QuorumError::Execution(format!("Agent '{agent_name}' is not registered"))
            })?;
            let handle = registered.handle.clone();

            let reply = handle.handle(&AgentMessage::user(description)).await?;
            return Ok(TaskResult {
                executor: agent_name.to_string(),
                kind: ExecutorKind::Agent,
                output: reply.content,
            });
        }

        Err(QuorumError::Execution("No executor assigned".to_string()))
    }

    /// Sequential drain of the whole queue, one terminal record per task,
    /// yielding to the scheduler between iterations.
    pub async fn execute_all_tasks(&mut self) -> Vec<Task> {
        let mut executed = Vec::new();
        while let Some(task) = self.execute_next_task().await {
            executed.push(task);
            tokio::task::yield_now().await;
        }
        executed
    }

    /// Cancel a still-pending task, removing it from the queue.
    pub fn cancel_task(&mut self, id: &str) -> Result<Task> {
        let task = self
            .store
            .get(id)
            .ok_or_else(|| QuorumError::Execution(format!("Unknown task '{id}'")))?;

        if task.status != TaskStatus::Pending {
            return Err(QuorumError::Execution(format!(
                "Task '{id}' is not pending and cannot be cancelled"
            )));
        }

        self.store.dequeue(id);
        let task = self.store.get_mut(id).ok_or_else(|| {
            QuorumError::Execution(format!("Unknown task '{id}'"))
        })?;
        task.set_status(TaskStatus::Cancelled);
        let snapshot = task.clone();
        self.store.record_history(snapshot.clone());
        info!(task_id = %id, "Task cancelled");
        Ok(snapshot)
    }

    /// Run an ad-hoc round-robin session across named agents and teams.
    /// The session counter reflects attempts, so it is incremented before
    /// participant resolution.
    pub async fn coordinate_session(
        &mut self,
        description: &str,
        participant_names: &[String],
        max_rounds: usize,
    ) -> Result<SessionResult> {
        self.metrics.coordination_sessions += 1;

        let mut participants = Vec::new();
        let mut handles: Vec<Arc<dyn Agent>> = Vec::new();

        for name in participant_names {
            if let Some(registered) = self.registry.get(name) {
                participants.push(registered.name.clone());
                handles.push(registered.handle.clone());
            } else if let Some(team) = self.team(name) {
                for member in team.members.clone() {
                    if let Some(registered) = self.registry.get(&member) {
                        participants.push(registered.name.clone());
                        handles.push(registered.handle.clone());
                    }
                }
            } else {
                warn!(participant = %name, "Unknown session participant, skipping");
            }
        }

        if handles.is_empty() {
            return Err(QuorumError::NoValidParticipants);
        }

        info!(
            participants = participants.len(),
            max_rounds, "Starting coordination session"
        );

        let result = run_round_robin(description, &handles, max_rounds).await?;

        Ok(SessionResult {
            description: description.to_string(),
            participants,
            result,
            timestamp: Utc::now(),
            rounds: max_rounds,
        })
    }

    pub fn get_agent_status(&self) -> RegistryStatus {
        self.registry.status()
    }

    pub fn get_team_status(&self) -> Vec<TeamStatusEntry> {
        self.teams
            .iter()
            .map(|t| TeamStatusEntry {
                name: t.name.clone(),
                mode: t.mode,
                members: t.members.clone(),
            })
            .collect()
    }

    pub fn get_task_status(&self) -> TaskStatusReport {
        self.store.status_report()
    }

    pub fn get_coordination_metrics(&self) -> CoordinationMetrics {
        self.metrics
    }

    pub fn get_task(&self, id: &str) -> Option<&Task> {
        self.store.get(id)
    }

    pub fn history(&self) -> &[Task] {
        self.store.history()
    }

    /// Opt-in JSON dump of the execution history.
    pub fn export_history(&self, path: impl AsRef<std::path::Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self.store.history())?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Tear down process-lifetime state: agents, teams, and live tasks.
    /// History is retained for a final export.
    pub fn shutdown(&mut self) {
        info!(name = %self.config.name, "Shutting down coordinator");
        self.registry.clear();
        self.teams.clear();
        self.store.clear_live();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_task_builder_defaults() {
        let new_task = NewTask::new("t1", "描述");
        assert!(new_task.task_type.is_none());
        assert!(new_task.priority.is_none());
        assert!(new_task.agent.is_none());
        assert!(new_task.team.is_none());
        assert!(new_task.use_smart_routing);
    }

    #[test]
    fn new_task_builder_overrides() {
        let new_task = NewTask::new("t1", "x")
            .task_type(TaskType::Email)
            .priority(TaskPriority::Urgent)
            .agent("mailer")
            .smart_routing(false);
        assert_eq!(new_task.task_type, Some(TaskType::Email));
        assert_eq!(new_task.priority, Some(TaskPriority::Urgent));
        assert_eq!(new_task.agent.as_deref(), Some("mailer"));
        assert!(!new_task.use_smart_routing);
    }
}
