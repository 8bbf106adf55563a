//! Message and per-recipient lifecycle state.

#[cfg(feature = "chrono")]
use chrono::{DateTime, Utc};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::ids::{AgentId, MessageId, ThreadId, TopicId};

/// Delivery priority. Ordering matters: `Urgent` sorts ahead of `Normal`
/// ahead of `Low` wherever priority-aware ordering is needed (e.g. the
/// urgent-unread count in `GetAgentStatus`).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Priority {
    Low,
    Normal,
    Urgent,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Urgent => "urgent",
            Priority::Normal => "normal",
            Priority::Low => "low",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "urgent" => Some(Priority::Urgent),
            "normal" => Some(Priority::Normal),
            "low" => Some(Priority::Low),
            _ => None,
        }
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Normal
    }
}

/// Immutable once written. `(topic_id, log_offset)` is unique; `log_offset`
/// starts at 1 per topic and increases by exactly 1 per insert.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Message {
    pub id: MessageId,
    pub thread_id: ThreadId,
    pub topic_id: TopicId,
    pub log_offset: i64,
    pub sender_id: AgentId,
    pub subject: String,
    pub body: String,
    pub priority: Priority,
    #[cfg(feature = "chrono")]
    pub deadline: Option<DateTime<Utc>>,
    #[cfg(not(feature = "chrono"))]
    pub deadline: Option<i64>,
    /// Opaque attachment payload; the core never inspects its contents.
    pub attachments: Option<Vec<u8>>,
    #[cfg(feature = "chrono")]
    pub created_at: DateTime<Utc>,
    #[cfg(not(feature = "chrono"))]
    pub created_at: i64,
    pub idempotency_key: Option<String>,
    pub deleted_by_sender: bool,
}

/// Per-(message, agent) lifecycle state. Six values, matching the Thread FSM
/// in the specification §4.5.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum RecipientState {
    Unread,
    Read,
    Starred,
    Snoozed,
    Archived,
    Trash,
}

impl RecipientState {
    pub fn as_str(self) -> &'static str {
        match self {
            RecipientState::Unread => "unread",
            RecipientState::Read => "read",
            RecipientState::Starred => "starred",
            RecipientState::Snoozed => "snoozed",
            RecipientState::Archived => "archived",
            RecipientState::Trash => "trash",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "unread" => Some(RecipientState::Unread),
            "read" => Some(RecipientState::Read),
            "starred" => Some(RecipientState::Starred),
            "snoozed" => Some(RecipientState::Snoozed),
            "archived" => Some(RecipientState::Archived),
            "trash" => Some(RecipientState::Trash),
            _ => None,
        }
    }
}

/// Row tracking one recipient's view of one message. Primary key is
/// `(message_id, agent_id)`. `snoozed_until` is `Some` iff `state` is
/// `Snoozed`.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MessageRecipient {
    pub message_id: MessageId,
    pub agent_id: AgentId,
    pub state: RecipientState,
    #[cfg(feature = "chrono")]
    pub snoozed_until: Option<DateTime<Utc>>,
    #[cfg(not(feature = "chrono"))]
    pub snoozed_until: Option<i64>,
    #[cfg(feature = "chrono")]
    pub read_at: Option<DateTime<Utc>>,
    #[cfg(not(feature = "chrono"))]
    pub read_at: Option<i64>,
    #[cfg(feature = "chrono")]
    pub acked_at: Option<DateTime<Utc>>,
    #[cfg(not(feature = "chrono"))]
    pub acked_at: Option<i64>,
}

impl MessageRecipient {
    pub fn new(message_id: MessageId, agent_id: AgentId) -> Self {
        Self {
            message_id,
            agent_id,
            state: RecipientState::Unread,
            snoozed_until: None,
            read_at: None,
            acked_at: None,
        }
    }
}

/// Selector applied to `FetchInbox`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum InboxFilter {
    /// Everything except archived and trashed.
    Inbox,
    Unread,
    Starred,
    Snoozed,
    Archived,
    Trash,
    /// Keyed on `sender_id` rather than recipient state.
    Sent,
    All,
}
