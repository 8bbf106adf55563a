//! Task / TaskList — mirror of externally-maintained task files.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::ids::TaskListId;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
    Deleted,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Deleted => "deleted",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Some(match value {
            "pending" => TaskStatus::Pending,
            "in_progress" => TaskStatus::InProgress,
            "completed" => TaskStatus::Completed,
            "deleted" => TaskStatus::Deleted,
            _ => return None,
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TaskList {
    pub list_id: TaskListId,
    pub file_path: String,
    pub file_mtime: i64,
}

/// Mirrors one entry of an externally-maintained task file. `blocked_by` and
/// `blocks` are opaque id arrays (external task identifiers, not
/// foreign keys into this store).
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Task {
    pub list_id: TaskListId,
    pub claude_task_id: String,
    pub description: String,
    pub status: TaskStatus,
    pub owner: Option<String>,
    pub blocked_by: Vec<String>,
    pub blocks: Vec<String>,
}

impl Task {
    /// A task is available when it is pending, unowned, and has no
    /// outstanding blockers.
    pub fn is_available(&self) -> bool {
        self.status == TaskStatus::Pending && self.owner.is_none() && self.blocked_by.is_empty()
    }
}
