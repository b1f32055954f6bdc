// Task store: owns the list, persists every mutation, notifies listeners

use chrono::NaiveDate;
use eyre::{Context, Result, eyre};
use serde::Deserialize;
use std::collections::HashSet;
use tracing::{debug, info, warn};

use crate::confirm::{CLEAR_ALL_PROMPT, Confirm};
use crate::error::StoreError;
use crate::filter::{self, Counts, TaskFilter};
use crate::slot::Slot;
use crate::task::{self, Task, TaskId, TaskStatus, due_date_format};

/// Change notification delivered to subscribers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    Loaded { count: usize },
    Added { id: TaskId },
    Deleted { id: TaskId },
    StatusChanged { id: TaskId, status: TaskStatus },
    Cleared { count: usize },
}

/// Result of `TaskStore::clear_all`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearOutcome {
    /// Nothing to clear; no prompt was shown
    Empty,
    /// The confirmation provider said no
    Declined,
    /// The list was emptied; holds the number of tasks removed
    Cleared(usize),
}

type Listener = Box<dyn FnMut(&StoreEvent)>;

/// Record shape accepted from the slot
///
/// `id` is optional so lists written before ids existed still load.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredTask {
    #[serde(default)]
    id: Option<TaskId>,
    description: String,
    #[serde(with = "due_date_format")]
    due_date: NaiveDate,
    status: TaskStatus,
}

/// Ordered task list persisted to a single storage slot
pub struct TaskStore<S: Slot, C: Confirm> {
    tasks: Vec<Task>,
    next_id: u64,
    slot: S,
    confirm: C,
    listeners: Vec<Listener>,
}

impl<S: Slot, C: Confirm> TaskStore<S, C> {
    /// Open a store over `slot`, hydrating it from whatever the slot holds
    pub fn open(slot: S, confirm: C) -> Self {
        let mut store = Self {
            tasks: Vec::new(),
            next_id: 1,
            slot,
            confirm,
            listeners: Vec::new(),
        };
        store.load();
        store
    }

    /// Register a listener called after every load and effective mutation
    pub fn subscribe<F>(&mut self, listener: F)
    where
        F: FnMut(&StoreEvent) + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    /// Replace the in-memory list with the slot contents
    ///
    /// Unreadable or corrupt contents reset the list to empty. A single bad
    /// record invalidates the whole payload.
    pub fn load(&mut self) {
        if let Err(e) = self.read_slot().and_then(|stored| self.hydrate(stored)) {
            warn!(
                key = self.slot.key(),
                error = ?e,
                "Stored task list is unreadable, starting empty"
            );
            self.tasks = Vec::new();
            self.next_id = 1;
        }

        info!(key = self.slot.key(), count = self.tasks.len(), "Loaded task list");
        self.notify(&StoreEvent::Loaded { count: self.tasks.len() });
    }

    /// Serialize the list into the slot
    pub fn save(&mut self) -> Result<(), StoreError> {
        self.write_slot().map_err(StoreError::Persistence)
    }

    fn read_slot(&self) -> Result<Vec<StoredTask>> {
        let Some(raw) = self.slot.read()? else {
            debug!(key = self.slot.key(), "Slot is empty");
            return Ok(Vec::new());
        };

        serde_json::from_str(&raw).context("Failed to parse stored task list")
    }

    fn write_slot(&mut self) -> Result<()> {
        let json = serde_json::to_string(&self.tasks).context("Failed to serialize task list")?;
        self.slot.write(&json)?;
        debug!(key = self.slot.key(), count = self.tasks.len(), "Saved task list");
        Ok(())
    }

    /// Rebuild the list from stored records, keeping ids unique
    ///
    /// Fails without touching the current list if a record is blank or the
    /// stored ids leave no room for the counter.
    fn hydrate(&mut self, stored: Vec<StoredTask>) -> Result<()> {
        let max_stored = stored.iter().filter_map(|s| s.id).map(|id| id.0).max().unwrap_or(0);
        let mut next_id = max_stored
            .checked_add(1)
            .ok_or_else(|| eyre!("Stored task id {} is out of range", max_stored))?;

        let mut seen = HashSet::new();
        let mut tasks = Vec::with_capacity(stored.len());

        for (index, record) in stored.into_iter().enumerate() {
            let description = task::normalize_description(&record.description)
                .with_context(|| format!("Stored task {} has no description", index))?
                .to_string();

            let id = match record.id {
                Some(id) if seen.insert(id) => id,
                previous => {
                    let id = next_task_id(&mut next_id)
                        .ok_or_else(|| eyre!("No id left for stored task {}", index))?;
                    seen.insert(id);
                    debug!(?previous, assigned = %id, "Assigned id to stored task");
                    id
                }
            };

            tasks.push(Task {
                id,
                description,
                due_date: record.due_date,
                status: record.status,
            });
        }

        self.tasks = tasks;
        self.next_id = next_id;
        Ok(())
    }

    /// Persist, then tell listeners; the mutation stands even if the write fails
    fn commit(&mut self, event: StoreEvent) -> Result<(), StoreError> {
        let saved = self.save();
        self.notify(&event);
        saved
    }

    fn notify(&mut self, event: &StoreEvent) {
        for listener in &mut self.listeners {
            listener(event);
        }
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Append a new in-progress task
    pub fn add(&mut self, description: &str, due_date: NaiveDate) -> Result<TaskId, StoreError> {
        let description = task::normalize_description(description)?;

        let id = next_task_id(&mut self.next_id).ok_or(StoreError::IdsExhausted)?;
        self.tasks.push(Task::new(id, description, due_date));
        info!(%id, %due_date, "Added task");

        self.commit(StoreEvent::Added { id })?;
        Ok(id)
    }

    /// Append a new task from raw form input
    ///
    /// The description is checked before the date.
    pub fn add_raw(&mut self, description: &str, due_date: &str) -> Result<TaskId, StoreError> {
        let description = task::normalize_description(description)?;
        let due_date = task::parse_due_date(due_date)?;
        self.add(description, due_date)
    }

    /// Remove the task with `id`; returns false if no such task exists
    pub fn delete(&mut self, id: TaskId) -> Result<bool, StoreError> {
        let Some(pos) = self.position(id) else {
            debug!(%id, "delete: no such task");
            return Ok(false);
        };

        self.tasks.remove(pos);
        info!(%id, "Deleted task");

        self.commit(StoreEvent::Deleted { id })?;
        Ok(true)
    }

    /// Remove the task at `index` in the full list
    pub fn delete_at(&mut self, index: usize) -> Result<bool, StoreError> {
        match self.id_at(index) {
            Some(id) => self.delete(id),
            None => {
                debug!(index, len = self.tasks.len(), "delete_at: index out of range");
                Ok(false)
            }
        }
    }

    /// Mark the task with `id` completed or back in progress
    pub fn toggle_status(&mut self, id: TaskId, completed: bool) -> Result<bool, StoreError> {
        let Some(pos) = self.position(id) else {
            debug!(%id, "toggle_status: no such task");
            return Ok(false);
        };

        let status = TaskStatus::from_completed(completed);
        self.tasks[pos].status = status;
        info!(%id, %status, "Changed task status");

        self.commit(StoreEvent::StatusChanged { id, status })?;
        Ok(true)
    }

    /// Set the status of the task at `index` in the full list
    pub fn toggle_status_at(&mut self, index: usize, completed: bool) -> Result<bool, StoreError> {
        match self.id_at(index) {
            Some(id) => self.toggle_status(id, completed),
            None => {
                debug!(index, len = self.tasks.len(), "toggle_status_at: index out of range");
                Ok(false)
            }
        }
    }

    /// Empty the list once the confirmation provider agrees
    pub fn clear_all(&mut self) -> Result<ClearOutcome, StoreError> {
        if self.tasks.is_empty() {
            return Ok(ClearOutcome::Empty);
        }

        if !self.confirm.confirm(CLEAR_ALL_PROMPT) {
            debug!(count = self.tasks.len(), "clear_all: declined");
            return Ok(ClearOutcome::Declined);
        }

        let count = self.tasks.len();
        self.tasks.clear();
        info!(count, "Cleared all tasks");

        self.commit(StoreEvent::Cleared { count })?;
        Ok(ClearOutcome::Cleared(count))
    }

    // ========================================================================
    // Views
    // ========================================================================

    /// Full list in insertion order
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Id of the task at `index` in the full, unfiltered list
    pub fn id_at(&self, index: usize) -> Option<TaskId> {
        self.tasks.get(index).map(|t| t.id)
    }

    pub fn filtered(&self, filter: TaskFilter, today: NaiveDate) -> Vec<&Task> {
        filter::filtered_tasks(&self.tasks, filter, today)
    }

    pub fn counts(&self) -> Counts {
        filter::counts(&self.tasks)
    }

    fn position(&self, id: TaskId) -> Option<usize> {
        self.tasks.iter().position(|t| t.id == id)
    }
}

/// Hand out `counter` and advance it; `None` once the counter cannot move
fn next_task_id(counter: &mut u64) -> Option<TaskId> {
    let next = counter.checked_add(1)?;
    let id = TaskId(*counter);
    *counter = next;
    Some(id)
}
