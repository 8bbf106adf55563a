use async_trait::async_trait;
use sqlx::{FromRow, SqlitePool};

use substrate_contracts::{StoreError, TaskStore};
use substrate_model::{Task, TaskList, TaskListId, TaskStatus};

use super::map_sqlx_err;

#[derive(FromRow)]
struct TaskListRow {
    list_id: String,
    file_path: String,
    file_mtime: i64,
}

impl From<TaskListRow> for TaskList {
    fn from(row: TaskListRow) -> Self {
        TaskList {
            list_id: TaskListId(row.list_id),
            file_path: row.file_path,
            file_mtime: row.file_mtime,
        }
    }
}

#[derive(FromRow)]
struct TaskRow {
    list_id: String,
    claude_task_id: String,
    description: String,
    status: String,
    owner: Option<String>,
    blocked_by: String,
    blocks: String,
}

impl TryFrom<TaskRow> for Task {
    type Error = StoreError;

    fn try_from(row: TaskRow) -> Result<Self, Self::Error> {
        Ok(Task {
            list_id: TaskListId(row.list_id),
            claude_task_id: row.claude_task_id,
            description: row.description,
            status: TaskStatus::parse(&row.status)
                .ok_or_else(|| StoreError::Io("unrecognized task status in storage".to_string()))?,
            owner: row.owner,
            blocked_by: serde_json::from_str(&row.blocked_by)
                .map_err(|e| StoreError::Io(format!("malformed blocked_by json: {e}")))?,
            blocks: serde_json::from_str(&row.blocks)
                .map_err(|e| StoreError::Io(format!("malformed blocks json: {e}")))?,
        })
    }
}

pub struct SqliteTaskStore {
    pool: SqlitePool,
}

impl SqliteTaskStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TaskStore for SqliteTaskStore {
    async fn upsert_task_list(
        &self,
        list_id: TaskListId,
        file_path: &str,
        file_mtime: i64,
    ) -> Result<TaskList, StoreError> {
        sqlx::query(
            "INSERT INTO task_lists (list_id, file_path, file_mtime) VALUES (?, ?, ?) \
             ON CONFLICT(list_id) DO UPDATE SET file_path = excluded.file_path, \
             file_mtime = excluded.file_mtime",
        )
        .bind(&list_id.0)
        .bind(file_path)
        .bind(file_mtime)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        self.get_task_list(&list_id)
            .await?
            .ok_or(StoreError::NotFound)
    }

    async fn get_task_list(&self, list_id: &TaskListId) -> Result<Option<TaskList>, StoreError> {
        sqlx::query_as::<_, TaskListRow>("SELECT * FROM task_lists WHERE list_id = ?")
            .bind(&list_id.0)
            .fetch_optional(&self.pool)
            .await
            .map(|row| row.map(TaskList::from))
            .map_err(map_sqlx_err)
    }

    async fn upsert_task(&self, task: Task) -> Result<Task, StoreError> {
        let blocked_by = serde_json::to_string(&task.blocked_by)
            .map_err(|e| StoreError::Io(format!("failed to encode blocked_by: {e}")))?;
        let blocks = serde_json::to_string(&task.blocks)
            .map_err(|e| StoreError::Io(format!("failed to encode blocks: {e}")))?;

        sqlx::query(
            "INSERT INTO tasks \
             (list_id, claude_task_id, description, status, owner, blocked_by, blocks) \
             VALUES (?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(list_id, claude_task_id) DO UPDATE SET \
             description = excluded.description, status = excluded.status, \
             owner = excluded.owner, blocked_by = excluded.blocked_by, blocks = excluded.blocks",
        )
        .bind(&task.list_id.0)
        .bind(&task.claude_task_id)
        .bind(task.status.as_str())
        .bind(&task.owner)
        .bind(blocked_by)
        .bind(blocks)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        self.get_task(&task.list_id, &task.claude_task_id)
            .await?
            .ok_or(StoreError::NotFound)
    }

    async fn get_task(
        &self,
        list_id: &TaskListId,
        claude_task_id: &str,
    ) -> Result<Option<Task>, StoreError> {
        let row = sqlx::query_as::<_, TaskRow>(
            "SELECT * FROM tasks WHERE list_id = ? AND claude_task_id = ?",
        )
        .bind(&list_id.0)
        .bind(claude_task_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;
        row.map(Task::try_from).transpose()
    }

    async fn list_tasks(&self, list_id: &TaskListId) -> Result<Vec<Task>, StoreError> {
        let rows = sqlx::query_as::<_, TaskRow>(
            "SELECT * FROM tasks WHERE list_id = ? ORDER BY claude_task_id",
        )
        .bind(&list_id.0)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;
        rows.into_iter().map(Task::try_from).collect()
    }

    async fn list_available_tasks(&self, list_id: &TaskListId) -> Result<Vec<Task>, StoreError> {
        let rows = sqlx::query_as::<_, TaskRow>(
            "SELECT * FROM tasks WHERE list_id = ? AND status = 'pending' AND owner IS NULL",
        )
        .bind(&list_id.0)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;
        let tasks: Result<Vec<Task>, StoreError> = rows.into_iter().map(Task::try_from).collect();
        Ok(tasks?.into_iter().filter(Task::is_available).collect())
    }

    async fn set_task_status(
        &self,
        list_id: &TaskListId,
        claude_task_id: &str,
        status: TaskStatus,
        owner: Option<String>,
    ) -> Result<Task, StoreError> {
        let result = sqlx::query(
            "UPDATE tasks SET status = ?, owner = ? WHERE list_id = ? AND claude_task_id = ?",
        )
        .bind(status.as_str())
        .bind(&owner)
        .bind(&list_id.0)
        .bind(claude_task_id)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        self.get_task(list_id, claude_task_id)
            .await?
            .ok_or(StoreError::NotFound)
    }
}
