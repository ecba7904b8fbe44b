// Headless task list state: pagination, local updates and the last error

use std::collections::HashSet;

use crate::api::TasksApi;
use crate::error::{ClientError, Result};
use crate::models::{NewTask, Task};

/// Loaded tasks plus the cursor of the next page
///
/// Local state only changes after the corresponding API call succeeds.
pub struct TaskBoard {
    api: TasksApi,
    tasks: Vec<Task>,
    next: Option<String>,
    total: u64,
    error: Option<String>,
}

impl TaskBoard {
    pub fn new(api: TasksApi) -> Self {
        Self {
            api,
            tasks: Vec::new(),
            next: None,
            total: 0,
            error: None,
        }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Total reported by the server on the last page fetched
    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn has_more(&self) -> bool {
        self.next.is_some()
    }

    /// Message describing the last failed operation
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Replace the list with the first page
    pub async fn load(&mut self) -> Result<()> {
        self.error = None;

        let result = self.api.get_tasks(None).await;
        let page = result.map_err(|e| self.record("Failed to load tasks.", e))?;

        self.total = page.count;
        self.next = page.next;
        self.tasks = page.results;
        Ok(())
    }

    /// Append the next page; returns `false` when there is nothing to load
    pub async fn load_more(&mut self) -> Result<bool> {
        let Some(cursor) = self.next.clone() else {
            return Ok(false);
        };
        self.error = None;

        let result = self.api.get_tasks(Some(&cursor)).await;
        let page = result.map_err(|e| self.record("Failed to load more tasks.", e))?;

        self.total = page.count;
        self.next = page.next;
        merge_unique(&mut self.tasks, page.results);

        tracing::debug!(loaded = self.tasks.len(), total = self.total, "Loaded next page");
        Ok(true)
    }

    /// Create a task and put it at the top of the list
    pub async fn create(&mut self, task: &NewTask) -> Result<Task> {
        self.error = None;

        let result = self.api.create_task(task).await;
        let saved =
            result.map_err(|e| self.record("Failed to save the task. Please try again.", e))?;

        self.tasks.retain(|t| t.id != saved.id);
        self.tasks.insert(0, saved.clone());
        Ok(saved)
    }

    pub async fn update(&mut self, task: Task) -> Result<()> {
        self.error = None;

        let result = self.api.update_task(&task).await;
        result.map_err(|e| self.record("Failed to update the task.", e))?;

        if let Some(existing) = self.tasks.iter_mut().find(|t| t.id == task.id) {
            *existing = task;
        }
        Ok(())
    }

    pub async fn delete(&mut self, id: u64) -> Result<()> {
        self.error = None;

        let result = self.api.delete_task(id).await;
        result.map_err(|e| self.record("Failed to delete the task.", e))?;

        self.tasks.retain(|t| t.id != id);
        Ok(())
    }

    fn record(&mut self, message: &str, error: ClientError) -> ClientError {
        tracing::error!("{} {}", message, error);
        self.error = Some(format!("{} {}", message, error));
        error
    }
}

/// Append `incoming`, skipping ids already present; first occurrence wins
fn merge_unique(tasks: &mut Vec<Task>, incoming: Vec<Task>) {
    let mut seen: HashSet<u64> = tasks.iter().map(|t| t.id).collect();
    tasks.extend(incoming.into_iter().filter(|t| seen.insert(t.id)));
}
