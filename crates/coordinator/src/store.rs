//! Task store and pending-task priority queue.
//!
//! The queue holds task ids ordered by descending priority, stable among
//! equals: a new task is inserted before the first strictly-lower-priority
//! entry, which places it after every existing task of equal or higher
//! priority.

use std::collections::HashMap;

use quorum_common::{QuorumError, Result, Task, TaskStatus};
use serde::Serialize;

#[derive(Debug, Clone, Default, Serialize)]
pub struct TaskStatusReport {
    pub total: usize,
    pub queued: usize,
    pub pending: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub failed: usize,
    pub cancelled: usize,
}

#[derive(Default)]
pub struct TaskStore {
    tasks: HashMap<String, Task>,
    queue: Vec<String>,
    history: Vec<Task>,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new task and enqueue it. A duplicate id leaves both the
    /// task map and the queue untouched.
    pub fn insert(&mut self, task: Task) -> Result<()> {
        if self.tasks.contains_key(&task.id) {
            return Err(QuorumError::DuplicateTaskId(task.id));
        }

        let position = self
            .queue
            .iter()
            .position(|id| self.tasks[id].priority < task.priority)
            .unwrap_or(self.queue.len());
        self.queue.insert(position, task.id.clone());
        self.tasks.insert(task.id.clone(), task);
        Ok(())
    }

    /// Remove and return the id at the head of the queue. An empty queue is
    /// a normal terminal condition for a drain loop, not an error.
    pub fn pop_next(&mut self) -> Option<String> {
        if self.queue.is_empty() {
            None
        } else {
            Some(self.queue.remove(0))
        }
    }

    /// Remove a specific id from the queue. Returns whether it was queued.
    pub fn dequeue(&mut self, id: &str) -> bool {
        if let Some(position) = self.queue.iter().position(|queued| queued == id) {
            self.queue.remove(position);
            true
        } else {
            false
        }
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Task> {
        self.tasks.get_mut(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.tasks.contains_key(id)
    }

    /// Append a terminal snapshot to history. The live record stays in the
    /// task map as well; both copies are kept deliberately for audit.
    pub fn record_history(&mut self, task: Task) {
        self.history.push(task);
    }

    pub fn history(&self) -> &[Task] {
        &self.history
    }

    pub fn queued_ids(&self) -> &[String] {
        &self.queue
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn status_report(&self) -> TaskStatusReport {
        let mut report = TaskStatusReport {
            total: self.tasks.len(),
            queued: self.queue.len(),
            ..Default::default()
        };
        for task in self.tasks.values() {
            match task.status {
                TaskStatus::Pending => report.pending += 1,
                TaskStatus::InProgress => report.in_progress += 1,
                TaskStatus::Completed => report.completed += 1,
                TaskStatus::Failed => report.failed += 1,
                TaskStatus::Cancelled => report.cancelled += 1,
            }
        }
        report
    }

    /// Drop live tasks and the queue. History is retained.
    pub fn clear_live(&mut self) {
        self.tasks.clear();
        self.queue.clear();
    }
}
