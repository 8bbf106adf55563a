//! ConsumerOffset — per-(agent, topic) last-consumed log offset.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::ids::{AgentId, TopicId};

/// Tracks how far an agent has consumed a topic's log. Monotonically
/// non-decreasing; advanced by `PollChanges`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ConsumerOffset {
    pub agent_id: AgentId,
    pub topic_id: TopicId,
    pub last_offset: i64,
}
