//! Wire shape of a queued operation's payload. Stored as JSON bytes in
//! `PendingOperation::payload`; decoded by the drainer before replay against
//! the Mail service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use substrate_model::{AgentId, Priority, ThreadId};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QueuedSend {
    pub thread_id: ThreadId,
    pub sender_id: AgentId,
    pub topic_name: Option<String>,
    pub recipients: Vec<AgentId>,
    pub subject: String,
    pub body: String,
    pub priority: Priority,
    pub deadline: Option<DateTime<Utc>>,
    pub idempotency_key: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QueuedPublish {
    pub thread_id: ThreadId,
    pub sender_id: AgentId,
    pub topic_name: String,
    pub subject: String,
    pub body: String,
    pub priority: Priority,
    pub deadline: Option<DateTime<Utc>>,
    pub idempotency_key: String,
}
