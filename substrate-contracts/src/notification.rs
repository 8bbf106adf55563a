//! Notification fan-out contract (spec §4.4 / §4.8).
//!
//! `NotificationSink` decouples the Mail/Review services, which only know
//! "publish this event", from the concrete per-subscriber hub that owns
//! bounded channels and the slow-consumer drop policy. Generalized from the
//! teacher's `InProcJobEventBus` publish side.

use async_trait::async_trait;

use substrate_model::{AgentId, Message, MessageId, Priority, ReviewId, ReviewState, TopicId};

/// An event a subscribed agent may care about. Carries just enough to let a
/// subscriber decide whether to re-fetch (message id, topic, offset), never
/// the full row, keeping the channel payload small and the hub backend-agnostic.
///
/// `NewMessage` is published once per resolved recipient (spec §4.3
/// "Notifications emitted": `NewMessage(recipientId, messageId, priority)`),
/// not once per message — a broadcast to three subscribers produces three
/// `NewMessage` notifications.
#[derive(Clone, Debug, PartialEq)]
pub enum Notification {
    NewMessage {
        topic_id: TopicId,
        message_id: MessageId,
        log_offset: i64,
        recipient_id: AgentId,
        priority: Priority,
    },
    MessageStateChanged {
        message_id: MessageId,
        agent_id: AgentId,
    },
    ReviewStateChanged {
        review_id: ReviewId,
        state: ReviewState,
    },
    AgentStatusChanged {
        agent_id: AgentId,
    },
}

impl Notification {
    /// The full row this notification refers to, if the caller already has
    /// one to hand (used by the hub to avoid a redundant store round trip
    /// when the publisher already holds the freshly-inserted row).
    pub fn new_message(message: &Message, recipient_id: AgentId) -> Self {
        Notification::NewMessage {
            topic_id: message.topic_id,
            message_id: message.id,
            log_offset: message.log_offset,
            recipient_id,
            priority: message.priority,
        }
    }
}

/// Narrows which notifications a subscriber receives. `AgentInbox` is the
/// common case: everything addressed to one agent's direct topic plus every
/// topic it is subscribed to.
#[derive(Clone, Debug, PartialEq)]
pub enum NotificationFilter {
    AgentInbox(AgentId),
    Topic(TopicId),
    Review(ReviewId),
}

/// Publish side of the notification hub. The Mail service, review
/// orchestrator, and offline-queue drainer each hold a
/// `Arc<dyn NotificationSink>` and never reach into the hub's subscriber
/// table directly.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn publish(&self, notification: Notification);
}
