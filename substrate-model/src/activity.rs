//! Activity — append-only event log.

#[cfg(feature = "chrono")]
use chrono::{DateTime, Utc};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::ids::AgentId;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ActivityType {
    Commit,
    Message,
    SessionStart,
    SessionComplete,
    Decision,
    Error,
    Blocker,
    Heartbeat,
    TaskComplete,
}

impl ActivityType {
    pub fn as_str(self) -> &'static str {
        match self {
            ActivityType::Commit => "commit",
            ActivityType::Message => "message",
            ActivityType::SessionStart => "session_start",
            ActivityType::SessionComplete => "session_complete",
            ActivityType::Decision => "decision",
            ActivityType::Error => "error",
            ActivityType::Blocker => "blocker",
            ActivityType::Heartbeat => "heartbeat",
            ActivityType::TaskComplete => "task_complete",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Some(match value {
            "commit" => ActivityType::Commit,
            "message" => ActivityType::Message,
            "session_start" => ActivityType::SessionStart,
            "session_complete" => ActivityType::SessionComplete,
            "decision" => ActivityType::Decision,
            "error" => ActivityType::Error,
            "blocker" => ActivityType::Blocker,
            "heartbeat" => ActivityType::Heartbeat,
            "task_complete" => ActivityType::TaskComplete,
            _ => return None,
        })
    }
}

/// One row in the append-only activity log. Retention is bounded by a
/// periodic delete-older-than sweep run by the store's housekeeping task.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Activity {
    pub id: i64,
    pub agent_id: AgentId,
    pub activity_type: ActivityType,
    pub description: String,
    pub metadata: Option<Vec<u8>>,
    #[cfg(feature = "chrono")]
    pub created_at: DateTime<Utc>,
    #[cfg(not(feature = "chrono"))]
    pub created_at: i64,
}
