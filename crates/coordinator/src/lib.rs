//! The task-routing and coordination engine.
//!
//! A caller registers agents, optionally groups them into teams, and
//! submits tasks. Unassigned tasks are routed (generative decision with a
//! keyword fallback), queued by priority, and drained one at a time by the
//! executor; results, failures, and metrics are tracked throughout.

pub mod config;
pub mod coordinator;
pub mod metrics;
pub mod registry;
pub mod router;
pub mod store;
pub mod team;

pub use config::{CoordinatorConfig, MailConfig, SearchConfig};
pub use coordinator::{Coordinator, NewTask, SessionResult};
pub use metrics::CoordinationMetrics;
pub use registry::{AgentProfile, AgentRegistry, AgentStatus, AgentType, RegistryStatus};
pub use router::{Router, RoutingOutcome};
pub use store::{TaskStatusReport, TaskStore};
pub use team::{Team, TeamMode, TeamStatusEntry, run_round_robin};
