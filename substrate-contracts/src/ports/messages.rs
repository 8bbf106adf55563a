//! Repository port for message send, inbox read, and lifecycle mutation —
//! the hot path of the whole crate.

use std::collections::HashMap;

use async_trait::async_trait;
#[cfg(feature = "chrono")]
use chrono::{DateTime, Utc};

use substrate_model::{
    AgentId, InboxFilter, Message, MessageId, MessageRecipient, Priority, RecipientState, ThreadId,
    TopicId,
};

use crate::error::StoreError;

/// A not-yet-persisted message. `log_offset`, `id`, and `created_at` are
/// assigned by the store inside `insert_message`'s transaction.
#[derive(Clone, Debug)]
pub struct NewMessage {
    pub thread_id: ThreadId,
    pub topic_id: TopicId,
    pub sender_id: AgentId,
    pub subject: String,
    pub body: String,
    pub priority: Priority,
    #[cfg(feature = "chrono")]
    pub deadline: Option<DateTime<Utc>>,
    #[cfg(not(feature = "chrono"))]
    pub deadline: Option<i64>,
    pub attachments: Option<Vec<u8>>,
    pub idempotency_key: Option<String>,
}

/// Result of a successful `insert_message` call. `was_new` is `false` when
/// `draft.idempotency_key` matched an already-stored message — callers must
/// not treat a replay as a fresh send (no activity append, no
/// notification fan-out).
#[derive(Clone, Debug)]
pub struct InsertedMessage {
    pub message: Message,
    pub recipients: Vec<MessageRecipient>,
    pub was_new: bool,
}

/// Per-agent counters backing `GetAgentStatus` (spec §4.3).
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct AgentStatus {
    pub unread_count: i64,
    pub urgent_unread_count: i64,
    pub snoozed_count: i64,
}

/// Repository port for the message log and per-recipient state.
///
/// `insert_message` is the one operation that must be transactionally
/// atomic end to end: offset assignment, row insert, and recipient fan-out
/// happen inside a single database transaction so that `(topic_id,
/// log_offset)` is never skipped or duplicated under concurrent senders
/// (spec §4.1 invariant, §8 property 1).
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Atomically assign the next `log_offset` for `draft.topic_id`, insert
    /// the message, and create one `MessageRecipient` row per entry in
    /// `recipients`. If `draft.idempotency_key` is `Some` and already
    /// recorded, returns the previously-inserted message instead of
    /// inserting a duplicate (spec §4.1 "Idempotent send").
    async fn insert_message(
        &self,
        draft: NewMessage,
        recipients: &[AgentId],
    ) -> Result<InsertedMessage, StoreError>;

    async fn find_by_idempotency_key(
        &self,
        key: &str,
    ) -> Result<Option<MessageId>, StoreError>;

    async fn get_message(&self, id: MessageId) -> Result<Option<Message>, StoreError>;

    async fn get_recipient(
        &self,
        message_id: MessageId,
        agent_id: AgentId,
    ) -> Result<Option<MessageRecipient>, StoreError>;

    /// List every message in `thread_id`, ordered by `(topic_id, log_offset)`.
    async fn get_thread(&self, thread_id: &ThreadId) -> Result<Vec<Message>, StoreError>;

    /// Fetch up to `limit` `(message, recipient state)` pairs for `agent_id`
    /// matching `filter`, newest first. `filter == Sent` joins on
    /// `sender_id` instead of the recipient table.
    async fn fetch_inbox(
        &self,
        agent_id: AgentId,
        filter: InboxFilter,
        limit: i64,
    ) -> Result<Vec<(Message, Option<MessageRecipient>)>, StoreError>;

    /// Apply a recipient-local state transition. Callers are expected to
    /// have already validated the transition against the Thread FSM;
    /// this just persists the result.
    async fn set_recipient_state(
        &self,
        message_id: MessageId,
        agent_id: AgentId,
        new_state: RecipientState,
        #[cfg(feature = "chrono")] snoozed_until: Option<DateTime<Utc>>,
        #[cfg(not(feature = "chrono"))] snoozed_until: Option<i64>,
    ) -> Result<MessageRecipient, StoreError>;

    /// Record that `agent_id` has processed `message_id` (spec §4.3
    /// `AckMessage`). Distinct from `Read`: acking is for work-queue style
    /// consumption and does not move `state`.
    async fn ack_message(
        &self,
        message_id: MessageId,
        agent_id: AgentId,
    ) -> Result<MessageRecipient, StoreError>;

    /// Fetch messages newer than `since[topic_id]` across every topic
    /// `agent_id` is subscribed to (including its direct inbox), and the
    /// advanced offsets to persist as the new `ConsumerOffset` rows.
    async fn poll_changes(
        &self,
        agent_id: AgentId,
        since: &HashMap<TopicId, i64>,
    ) -> Result<(Vec<Message>, HashMap<TopicId, i64>), StoreError>;

    async fn agent_status(&self, agent_id: AgentId) -> Result<AgentStatus, StoreError>;

    /// Transition every `Snoozed` recipient row whose `snoozed_until` has
    /// passed back to `Unread`, returning the rows that moved (spec §4.3
    /// "Snooze wake sweep").
    #[cfg(feature = "chrono")]
    async fn sweep_snoozed(&self, now: DateTime<Utc>) -> Result<Vec<MessageRecipient>, StoreError>;

    /// Delete messages whose topic retention window has elapsed, relying on
    /// the `MessageRecipient` foreign-key cascade to clean up dependents.
    #[cfg(feature = "chrono")]
    async fn sweep_expired_messages(&self, now: DateTime<Utc>) -> Result<u64, StoreError>;

    /// Full-text search over `(subject, body)` via the `message_fts` shadow
    /// table, newest match first.
    async fn search_messages(&self, query: &str, limit: i64) -> Result<Vec<Message>, StoreError>;
}
