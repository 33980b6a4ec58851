//! Error types for Quorum.
//!
//! Two classes of failure flow through this enum. Caller-input errors
//! (duplicate names/ids, capacity, unknown types, bad configuration) are
//! returned synchronously from the facade. Runtime failures during dispatch
//! (`Execution`, `Model`, `Search`, `Email`) are captured per-task as a
//! failed task record and never abort the drain loop.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum QuorumError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Agent limit reached: {limit} agents already registered")]
    CapacityExceeded { limit: usize },

    #[error("Unsupported agent type: {0}")]
    UnsupportedAgentType(String),

    #[error("Unsupported team mode: {0}")]
    UnsupportedTeamMode(String),

    #[error("Agent name '{0}' already exists")]
    DuplicateAgentName(String),

    #[error("Team name '{0}' already exists")]
    DuplicateTeamName(String),

    #[error("Task id '{0}' already exists")]
    DuplicateTaskId(String),

    #[error("Agent '{0}' does not exist")]
    UnknownAgent(String),

    #[error("No valid participants")]
    NoValidParticipants,

    /// Routing-internal failures. Always recovered by heuristic fallback;
    /// never surfaced to the caller of `add_task`.
    #[error("Routing error: {0}")]
    Routing(String),

    #[error("Execution error: {0}")]
    Execution(String),

    /// Generative-provider failure. `status` carries the provider's HTTP
    /// status when it answered with an error reply; `retry_after_ms`
    /// carries its Retry-After header when one was present.
    #[error("Model error: {message}")]
    Model {
        message: String,
        status: Option<u16>,
        retry_after_ms: Option<u64>,
    },

    #[error("Search error: {0}")]
    Search(String),

    #[error("Email error: {0}")]
    Email(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl QuorumError {
    /// A model failure with no HTTP status attached: transport errors,
    /// malformed reply bodies, timeouts before the provider answered.
    pub fn model(message: impl Into<String>) -> Self {
        QuorumError::Model {
            message: message.into(),
            status: None,
            retry_after_ms: None,
        }
    }
}

pub type Result<T> = std::result::Result<T, QuorumError>;
