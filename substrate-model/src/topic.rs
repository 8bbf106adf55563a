//! Topic — named fan-out channel — and Subscription.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::ids::{AgentId, SubscriptionId, TopicId};

/// Default retention window applied to a newly-created topic when none is
/// supplied: seven days, expressed in seconds.
pub const DEFAULT_RETENTION_SECONDS: i64 = 7 * 24 * 60 * 60;

/// Kind of fan-out a topic performs.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum TopicType {
    /// Per-recipient inbox, auto-created as `agent/<name>/inbox`.
    Direct,
    /// Fans out to every `Subscription` row for the topic.
    Broadcast,
    /// Ordered work queue; consumed via `PollChanges` log-offset semantics
    /// the same as broadcast, but subscribers are expected to race for
    /// delivery rather than all observe every message.
    Queue,
}

impl TopicType {
    pub fn as_str(self) -> &'static str {
        match self {
            TopicType::Direct => "direct",
            TopicType::Broadcast => "broadcast",
            TopicType::Queue => "queue",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "direct" => Some(TopicType::Direct),
            "broadcast" => Some(TopicType::Broadcast),
            "queue" => Some(TopicType::Queue),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Topic {
    pub id: TopicId,
    pub name: String,
    pub topic_type: TopicType,
    pub retention_seconds: i64,
}

impl Topic {
    /// Canonical name of the auto-created direct inbox topic for `agent`.
    pub fn direct_inbox_name(agent_name: &str) -> String {
        format!("agent/{agent_name}/inbox")
    }
}

/// A (agent, topic) pairing. Uniqueness is enforced by the store; the set of
/// subscriptions for a topic is the recipient set for `broadcast` delivery.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Subscription {
    pub id: SubscriptionId,
    pub agent_id: AgentId,
    pub topic_id: TopicId,
}
