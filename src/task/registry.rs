//! In-memory task registry
//!
//! The registry is the single source of truth for task state. It is shared
//! between the pipeline stages, the scheduler and the broadcaster through an
//! `Arc<Mutex<..>>`; multi-step operations hold the lock for their whole
//! critical section via [`TaskRegistry::lock`].

use crate::task::entity::{Task, TaskId, TaskSnapshot};
use crate::RelayError;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use url::Url;

/// Shared handle to the task table
#[derive(Debug, Clone, Default)]
pub struct TaskRegistry {
    inner: Arc<Mutex<TaskTable>>,
}

impl TaskRegistry {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks the table for a multi-step critical section
    ///
    /// A poisoned lock is recovered rather than propagated: every mutation
    /// leaves the table consistent before it can panic.
    pub(crate) fn lock(&self) -> MutexGuard<'_, TaskTable> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Gets the snapshot of a single task
    pub fn get(&self, id: &TaskId) -> Result<TaskSnapshot, RelayError> {
        self.lock()
            .get(id)
            .map(Task::snapshot)
            .ok_or_else(|| RelayError::NotFound { id: id.to_string() })
    }

    /// Lists snapshots of all tasks in creation order
    pub fn list(&self) -> Vec<TaskSnapshot> {
        self.lock().snapshots()
    }

    /// Number of tasks ever created
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The task table behind the registry lock
#[derive(Debug, Default)]
pub struct TaskTable {
    tasks: HashMap<TaskId, Task>,
    order: Vec<TaskId>,
}

impl TaskTable {
    /// Inserts a new task and returns it for further setup
    ///
    /// The caller owns starting the task's fetch; admission goes through
    /// `Pipeline::submit`.
    pub(crate) fn create(&mut self, url: Url, scheduled_at: DateTime<Utc>) -> &mut Task {
        let task = Task::new(url, scheduled_at);
        let id = task.id;
        self.order.push(id);
        self.tasks.entry(id).or_insert(task)
    }

    pub fn get(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.get(id)
    }

    pub fn get_mut(&mut self, id: &TaskId) -> Option<&mut Task> {
        self.tasks.get_mut(id)
    }

    /// Iterates over tasks in creation order
    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.order.iter().filter_map(|id| self.tasks.get(id))
    }

    pub fn snapshots(&self) -> Vec<TaskSnapshot> {
        self.iter().map(Task::snapshot).collect()
    }

    /// Counts tasks currently occupying the fetch window
    pub fn count_in_fetch_window(&self) -> usize {
        self.tasks
            .values()
            .filter(|task| task.state.occupies_fetch_window())
            .count()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}
