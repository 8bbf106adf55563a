//! Repository port mirroring externally-maintained task files into queryable
//! rows (spec §3 Task/TaskList, §4.3-adjacent "task board" reads).

use async_trait::async_trait;

use substrate_model::{Task, TaskList, TaskListId, TaskStatus};

use crate::error::StoreError;

#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Upsert a task list's tracked file path and mtime. Called when the
    /// external task file is detected as changed.
    async fn upsert_task_list(
        &self,
        list_id: TaskListId,
        file_path: &str,
        file_mtime: i64,
    ) -> Result<TaskList, StoreError>;

    async fn get_task_list(&self, list_id: &TaskListId) -> Result<Option<TaskList>, StoreError>;

    async fn upsert_task(&self, task: Task) -> Result<Task, StoreError>;

    async fn get_task(
        &self,
        list_id: &TaskListId,
        claude_task_id: &str,
    ) -> Result<Option<Task>, StoreError>;

    async fn list_tasks(&self, list_id: &TaskListId) -> Result<Vec<Task>, StoreError>;

    /// Tasks that are `Pending`, unowned, and have no outstanding blockers.
    async fn list_available_tasks(&self, list_id: &TaskListId) -> Result<Vec<Task>, StoreError>;

    async fn set_task_status(
        &self,
        list_id: &TaskListId,
        claude_task_id: &str,
        status: TaskStatus,
        owner: Option<String>,
    ) -> Result<Task, StoreError>;
}
