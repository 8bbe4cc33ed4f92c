// In-memory task store with per-status indexes

use crate::error::{Result, StoreError};
use crate::filter::ListFilter;
use crate::models::{Task, TaskStatus, now};
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, warn};

/// Owns every task plus one ordered id list per status.
///
/// Each task id sits in exactly one status list, the one matching the
/// task's current status. Mutating operations keep that true before they
/// return.
#[derive(Debug, Clone)]
pub struct TaskStore {
    tasks: Vec<Task>,
    next_id: u64,
    index: BTreeMap<TaskStatus, Vec<u64>>,
}

/// Field changes for [`TaskStore::update`]; `None` leaves a field as is
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskUpdate {
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
}

impl TaskUpdate {
    pub fn description(description: impl Into<String>) -> Self {
        Self {
            description: Some(description.into()),
            status: None,
        }
    }

    pub fn status(status: TaskStatus) -> Self {
        Self {
            description: None,
            status: Some(status),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.description.is_none() && self.status.is_none()
    }
}

impl Default for TaskStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskStore {
    /// Empty store, first id is 0
    pub fn new() -> Self {
        Self {
            tasks: Vec::new(),
            next_id: 0,
            index: TaskStatus::ALL.into_iter().map(|status| (status, Vec::new())).collect(),
        }
    }

    /// Rebuild a store from persisted parts.
    ///
    /// `order` supplies the saved per-status id order. Entries are kept only
    /// when the task exists and really holds that status; anything else is
    /// dropped with a warning. Tasks the order does not mention are appended
    /// in creation order. The id counter is raised past the largest id so
    /// ids are never handed out twice.
    pub fn from_parts(tasks: Vec<Task>, next_id: u64, order: &BTreeMap<TaskStatus, Vec<u64>>) -> Result<Self> {
        let mut seen = HashSet::new();
        for task in &tasks {
            if !seen.insert(task.id) {
                return Err(StoreError::CorruptData(format!("duplicate task id {}", task.id)));
            }
        }

        let mut floor = 0;
        for task in &tasks {
            let above = task.id.checked_add(1).ok_or_else(|| {
                StoreError::CorruptData(format!("task id {} leaves no room for an id counter", task.id))
            })?;
            floor = floor.max(above);
        }
        if next_id < floor {
            warn!(stored = next_id, raised_to = floor, "Id counter behind existing tasks, raising it");
        }

        let mut store = Self {
            tasks,
            next_id: next_id.max(floor),
            ..Self::new()
        };

        let mut placed = HashSet::new();
        for status in TaskStatus::ALL {
            let ids = order.get(&status).map(Vec::as_slice).unwrap_or_default();
            for &id in ids {
                let holds_status = store.get(id).is_some_and(|t| t.status == status);
                if holds_status && placed.insert(id) {
                    store.index_mut(status).push(id);
                } else {
                    warn!(id, status = %status, "Dropping stale status index entry");
                }
            }
        }

        let unplaced: Vec<(TaskStatus, u64)> = store
            .tasks
            .iter()
            .filter(|t| !placed.contains(&t.id))
            .map(|t| (t.status, t.id))
            .collect();
        for (status, id) in unplaced {
            store.index_mut(status).push(id);
        }

        store.verify_indexes()?;
        Ok(store)
    }

    /// Id the next created task will receive
    pub fn next_id(&self) -> u64 {
        self.next_id
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    // ========================================================================
    // Commands
    // ========================================================================

    /// Create a task and file it under `status`.
    ///
    /// Fails with [`StoreError::IdsExhausted`] once the counter cannot move
    /// past the id it would hand out.
    pub fn create(&mut self, description: impl Into<String>, status: TaskStatus) -> Result<&Task> {
        let id = self.next_id;
        self.next_id = id.checked_add(1).ok_or(StoreError::IdsExhausted)?;

        let ts = now();
        self.tasks.push(Task {
            id,
            description: description.into(),
            status,
            created_at: ts,
            updated_at: ts,
        });
        self.index_mut(status).push(id);

        debug!(id, status = %status, "Created task");
        Ok(&self.tasks[self.tasks.len() - 1])
    }

    /// Apply `changes` to task `id`.
    ///
    /// A status change moves the id from its old status list to the end of
    /// the new one. `updated_at` is refreshed whenever any field is
    /// supplied; an empty update leaves the task untouched.
    pub fn update(&mut self, id: u64, changes: TaskUpdate) -> Result<&Task> {
        let pos = self.position(id).ok_or(StoreError::NotFound(id))?;

        if changes.is_empty() {
            debug!(id, "Empty update, nothing to change");
            return Ok(&self.tasks[pos]);
        }

        let previous = self.tasks[pos].status;
        if let Some(status) = changes.status.filter(|s| *s != previous) {
            self.index_mut(previous).retain(|&other| other != id);
            self.index_mut(status).push(id);
            debug!(id, from = %previous, to = %status, "Moved task between status indexes");
        }

        let task = &mut self.tasks[pos];
        if let Some(description) = changes.description {
            task.description = description;
        }
        if let Some(status) = changes.status {
            task.status = status;
        }
        task.updated_at = now();

        Ok(&self.tasks[pos])
    }

    /// Remove task `id` from the store and from its status list
    pub fn delete(&mut self, id: u64) -> Result<Task> {
        let pos = self.position(id).ok_or(StoreError::NotFound(id))?;

        let task = self.tasks.remove(pos);
        self.index_mut(task.status).retain(|&other| other != id);

        debug!(id, "Deleted task");
        Ok(task)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn get(&self, id: u64) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// All tasks in creation order
    pub fn list_all(&self) -> &[Task] {
        &self.tasks
    }

    /// Tasks holding `status`, in the order they entered that status
    pub fn list_by_status(&self, status: TaskStatus) -> Vec<&Task> {
        self.status_ids(status).iter().filter_map(|&id| self.get(id)).collect()
    }

    pub fn list(&self, filter: ListFilter) -> Vec<&Task> {
        match filter {
            ListFilter::All => self.tasks.iter().collect(),
            ListFilter::Status(status) => self.list_by_status(status),
        }
    }

    /// Ids filed under `status`, in index order
    pub fn status_ids(&self, status: TaskStatus) -> &[u64] {
        self.index.get(&status).map(Vec::as_slice).unwrap_or_default()
    }

    /// Number of tasks per status; every status is present
    pub fn counts(&self) -> BTreeMap<TaskStatus, usize> {
        TaskStatus::ALL
            .into_iter()
            .map(|status| (status, self.status_ids(status).len()))
            .collect()
    }

    /// Check ids are unique, the counter is ahead of every id, and each
    /// task is filed under exactly its own status.
    pub fn verify_indexes(&self) -> Result<()> {
        let mut ids = HashSet::new();
        for task in &self.tasks {
            if !ids.insert(task.id) {
                return Err(StoreError::CorruptData(format!("duplicate task id {}", task.id)));
            }
            if task.id >= self.next_id {
                return Err(StoreError::CorruptData(format!(
                    "task id {} not below id counter {}",
                    task.id, self.next_id
                )));
            }
        }

        let mut filed = HashSet::new();
        for (status, entries) in &self.index {
            let filter = ListFilter::Status(*status);
            for &id in entries {
                let task = self.get(id).ok_or_else(|| {
                    StoreError::CorruptData(format!("{} index references missing task {}", status, id))
                })?;
                if !filter.matches(task) {
                    return Err(StoreError::CorruptData(format!(
                        "task {} is {} but filed under {}",
                        id, task.status, status
                    )));
                }
                if !filed.insert(id) {
                    return Err(StoreError::CorruptData(format!("task {} filed more than once", id)));
                }
            }
        }

        if filed.len() != ids.len() {
            return Err(StoreError::CorruptData(format!(
                "{} of {} tasks missing from status indexes",
                ids.len() - filed.len(),
                ids.len()
            )));
        }

        Ok(())
    }

    // ========================================================================
    // Helper methods
    // ========================================================================

    fn position(&self, id: u64) -> Option<usize> {
        self.tasks.iter().position(|t| t.id == id)
    }

    fn index_mut(&mut self, status: TaskStatus) -> &mut Vec<u64> {
        self.index.entry(status).or_default()
    }
}
