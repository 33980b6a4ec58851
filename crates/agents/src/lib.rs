//! Role agents and their collaborators.
//!
//! Each agent implements `quorum_common::Agent` and owns its own
//! collaborators (search client, mail transport), injected at
//! construction or afterwards through setters.

pub mod assistant;
pub mod email;
pub mod mail;
pub mod research;
pub mod search;

pub use assistant::AssistantAgent;
pub use email::{DraftEmail, EmailAgent, EmailIntent, EmailRequest};
pub use mail::{EmailTransport, GmailTransport};
pub use research::ResearchAgent;
pub use search::{SearchClient, SearchResult, SearxngClient};
