//! Coordination counters.

use serde::Serialize;

/// Process-lifetime counters owned by the coordinator facade.
///
/// `coordination_sessions` counts attempted sessions, incremented at call
/// start, so a session that later fails is still counted.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct CoordinationMetrics {
    pub tasks_created: u64,
    pub tasks_completed: u64,
    pub tasks_failed: u64,
    pub agents_created: u64,
    pub coordination_sessions: u64,
}
