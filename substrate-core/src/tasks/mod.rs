//! Task/TaskList service: a thin read/write facade over `TaskStore`
//! mirroring externally-maintained task files (spec §3, CLI `tasks
//! hook-sync`). No actor wrapper: task-file sync is driven by an external
//! watcher at the adapter layer, not contended from multiple in-process
//! writers the way Mail is.

use std::sync::Arc;

use substrate_contracts::{CoreError, TaskStore};
use substrate_model::{Task, TaskList, TaskListId, TaskStatus};

#[derive(Clone)]
pub struct TaskService {
    store: Arc<dyn TaskStore>,
}

impl TaskService {
    pub fn new(store: Arc<dyn TaskStore>) -> Self {
        Self { store }
    }

    pub async fn sync_task_list(
        &self,
        list_id: TaskListId,
        file_path: &str,
        file_mtime: i64,
    ) -> Result<TaskList, CoreError> {
        Ok(self.store.upsert_task_list(list_id, file_path, file_mtime).await?)
    }

    pub async fn upsert_task(&self, task: Task) -> Result<Task, CoreError> {
        Ok(self.store.upsert_task(task).await?)
    }

    pub async fn get_task(&self, list_id: &TaskListId, claude_task_id: &str) -> Result<Task, CoreError> {
        self.store
            .get_task(list_id, claude_task_id)
            .await?
            .ok_or(CoreError::NotFound)
    }

    pub async fn list_tasks(&self, list_id: &TaskListId) -> Result<Vec<Task>, CoreError> {
        Ok(self.store.list_tasks(list_id).await?)
    }

    pub async fn list_available_tasks(&self, list_id: &TaskListId) -> Result<Vec<Task>, CoreError> {
        Ok(self.store.list_available_tasks(list_id).await?)
    }

    pub async fn set_task_status(
        &self,
        list_id: &TaskListId,
        claude_task_id: &str,
        status: TaskStatus,
        owner: Option<String>,
    ) -> Result<Task, CoreError> {
        Ok(self.store.set_task_status(list_id, claude_task_id, status, owner).await?)
    }
}
