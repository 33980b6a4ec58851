//! Common types and traits shared across Quorum crates.
//!
//! This crate provides the foundational abstractions that the coordinator
//! and the role agents use to communicate.

pub mod error;
pub mod message;
pub mod task;
pub mod traits;

pub use error::{QuorumError, Result};
pub use message::{AgentMessage, MessageRole};
pub use task::{
    ExecutorKind, RoutingDecision, Task, TaskPriority, TaskResult, TaskStatus, TaskType,
};
pub use traits::{Agent, AgentCapability};
