//! PendingOperation — row of the offline write-behind queue.
//!
//! Physically a separate store (`substrate-core::offline` opens its own
//! `SqlitePool`) so the queue survives even when the main store is
//! unreachable (spec §4.7 / §6 "Persisted layout").

#[cfg(feature = "chrono")]
use chrono::{DateTime, Utc};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::ids::PendingOperationId;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum OperationType {
    Send,
    Publish,
    Heartbeat,
    StatusUpdate,
}

impl OperationType {
    pub fn as_str(self) -> &'static str {
        match self {
            OperationType::Send => "send",
            OperationType::Publish => "publish",
            OperationType::Heartbeat => "heartbeat",
            OperationType::StatusUpdate => "status_update",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Some(match value {
            "send" => OperationType::Send,
            "publish" => OperationType::Publish,
            "heartbeat" => OperationType::Heartbeat,
            "status_update" => OperationType::StatusUpdate,
            _ => return None,
        })
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum QueueStatus {
    Pending,
    Delivering,
    Delivered,
    Expired,
    Failed,
}

impl QueueStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            QueueStatus::Pending => "pending",
            QueueStatus::Delivering => "delivering",
            QueueStatus::Delivered => "delivered",
            QueueStatus::Expired => "expired",
            QueueStatus::Failed => "failed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Some(match value {
            "pending" => QueueStatus::Pending,
            "delivering" => QueueStatus::Delivering,
            "delivered" => QueueStatus::Delivered,
            "expired" => QueueStatus::Expired,
            "failed" => QueueStatus::Failed,
            _ => return None,
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PendingOperation {
    pub id: PendingOperationId,
    pub idempotency_key: String,
    pub operation_type: OperationType,
    pub payload: Vec<u8>,
    pub agent_name: String,
    pub session_id: Option<String>,
    #[cfg(feature = "chrono")]
    pub created_at: DateTime<Utc>,
    #[cfg(not(feature = "chrono"))]
    pub created_at: i64,
    #[cfg(feature = "chrono")]
    pub expires_at: DateTime<Utc>,
    #[cfg(not(feature = "chrono"))]
    pub expires_at: i64,
    pub attempts: i64,
    pub last_error: Option<String>,
    pub status: QueueStatus,
}
