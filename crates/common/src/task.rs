//! Task model for the coordination engine.

use crate::AgentCapability;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Category of work a task represents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskType {
    Research,
    Email,
    Analysis,
    Coordination,
    #[default]
    General,
}

impl TaskType {
    /// Capability tag an agent must carry to be auto-assigned this type.
    pub fn required_capability(&self) -> AgentCapability {
        match self {
            TaskType::Research => AgentCapability::Research,
            TaskType::Email => AgentCapability::Email,
            TaskType::Analysis => AgentCapability::Analysis,
            TaskType::Coordination | TaskType::General => AgentCapability::General,
        }
    }
}

/// Priority level for tasks. Higher value is served first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low = 1,
    #[default]
    Medium = 2,
    High = 3,
    Urgent = 4,
}

/// Current status of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
    Cancelled,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled
        )
    }
}

/// Which kind of executor produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutorKind {
    Agent,
    Team,
}

/// The output of a successfully dispatched task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResult {
    pub executor: String,
    pub kind: ExecutorKind,
    pub output: String,
}

/// The router's structured decision for a task.
///
/// Recorded on the task only when the generative routing path produced it;
/// heuristic fallback and explicit assignment leave it unset. Retained for
/// observability and never re-consulted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingDecision {
    pub task_type: TaskType,
    pub executor: Option<String>,
    pub priority: TaskPriority,
    pub reasoning: String,
    pub response_style: String,
}

/// A unit of work tracked by the coordinator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Caller-supplied unique id
    pub id: String,

    /// Free-text instruction
    pub description: String,

    #[serde(rename = "type")]
    pub task_type: TaskType,

    pub priority: TaskPriority,

    pub status: TaskStatus,

    /// Assigned agent name (if any). When both an agent and a team are
    /// assigned, the team takes precedence at dispatch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_agent: Option<String>,

    /// Assigned team name (if any)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_team: Option<String>,

    /// Opaque caller-supplied key-value bag, never interpreted by the core
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,

    /// Populated on `Completed`; mutually exclusive with `error`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<TaskResult>,

    /// Populated on `Failed`; mutually exclusive with `result`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Present only when the generative routing path assigned this task
    #[serde(skip_serializing_if = "Option::is_none")]
    pub routing_decision: Option<RoutingDecision>,

    pub created_at: DateTime<Utc>,

    /// Refreshed on every status transition
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn new(id: impl Into<String>, description: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            description: description.into(),
            task_type: TaskType::General,
            priority: TaskPriority::Medium,
            status: TaskStatus::Pending,
            assigned_agent: None,
            assigned_team: None,
            metadata: Map::new(),
            result: None,
            error: None,
            routing_decision: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_type(mut self, task_type: TaskType) -> Self {
        self.task_type = task_type;
        self
    }

    pub fn with_priority(mut self, priority: TaskPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_agent(mut self, agent: impl Into<String>) -> Self {
        self.assigned_agent = Some(agent.into());
        self
    }

    pub fn with_team(mut self, team: impl Into<String>) -> Self {
        self.assigned_team = Some(team.into());
        self
    }

    pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = metadata;
        self
    }

    /// Transition to a new status, refreshing `updated_at`.
    pub fn set_status(&mut self, status: TaskStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }

    /// True once exactly one of result/error may be populated.
    pub fn terminal_fields_consistent(&self) -> bool {
        match self.status {
            TaskStatus::Completed => self.result.is_some() && self.error.is_none(),
            TaskStatus::Failed => self.result.is_none() && self.error.is_some(),
            TaskStatus::Cancelled => self.result.is_none() && self.error.is_none(),
            _ => self.result.is_none() && self.error.is_none(),
        }
    }
}
