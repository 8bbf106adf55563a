//! Notification hub (spec §4.4). Grounded on
//! `ferrex-core::orchestration::runtime::event_bus::InProcJobEventBus`'s
//! single-actor fan-out, generalized from a shared `tokio::sync::broadcast`
//! ring buffer to one bounded `mpsc` channel per subscriber — a broadcast
//! channel would lag *every* subscriber behind the slowest one, where spec
//! §4.4 requires per-subscriber drop accounting instead.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use substrate_contracts::{Notification, NotificationFilter, NotificationSink};

use crate::runtime::{spawn_actor, Actor, ActorHandle, DEFAULT_MAILBOX_CAPACITY};

pub const SUBSCRIBER_CHANNEL_CAPACITY: usize = 64;
const MAX_CONSECUTIVE_DROPS: u32 = 3;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct SubscriberId(u64);

impl SubscriberId {
    pub fn get(self) -> u64 {
        self.0
    }
}

struct Subscriber {
    filter: NotificationFilter,
    tx: mpsc::Sender<Notification>,
    consecutive_drops: u32,
}

pub enum HubRequest {
    Subscribe { filter: NotificationFilter },
    Unsubscribe { id: SubscriberId },
    Publish { notification: Notification },
}

pub enum HubResponse {
    Subscribed {
        id: SubscriberId,
        rx: mpsc::Receiver<Notification>,
    },
    Unsubscribed,
    Published,
}

struct NotificationHub {
    subscribers: HashMap<SubscriberId, Subscriber>,
    next_id: u64,
    dropped_total: Arc<AtomicU64>,
    channel_capacity: usize,
    max_consecutive_drops: u32,
}

fn matches(filter: &NotificationFilter, notification: &Notification) -> bool {
    match (filter, notification) {
        (NotificationFilter::AgentInbox(agent), Notification::NewMessage { recipient_id, .. }) => {
            agent == recipient_id
        }
        (NotificationFilter::AgentInbox(agent), Notification::MessageStateChanged { agent_id, .. }) => {
            agent == agent_id
        }
        (NotificationFilter::AgentInbox(agent), Notification::AgentStatusChanged { agent_id }) => {
            agent == agent_id
        }
        (NotificationFilter::Topic(topic), Notification::NewMessage { topic_id, .. }) => topic == topic_id,
        (NotificationFilter::Review(review), Notification::ReviewStateChanged { review_id, .. }) => {
            review == review_id
        }
        _ => false,
    }
}

#[async_trait]
impl Actor for NotificationHub {
    type Req = HubRequest;
    type Resp = HubResponse;

    async fn handle(&mut self, req: HubRequest) -> HubResponse {
        match req {
            HubRequest::Subscribe { filter } => {
                let id = SubscriberId(self.next_id);
                self.next_id += 1;
                let (tx, rx) = mpsc::channel(self.channel_capacity);
                self.subscribers.insert(
                    id,
                    Subscriber {
                        filter,
                        tx,
                        consecutive_drops: 0,
                    },
                );
                debug!(subscriber = id.0, "subscribed to notification hub");
                HubResponse::Subscribed { id, rx }
            }
            HubRequest::Unsubscribe { id } => {
                self.subscribers.remove(&id);
                debug!(subscriber = id.0, "unsubscribed from notification hub");
                HubResponse::Unsubscribed
            }
            HubRequest::Publish { notification } => {
                let mut to_drop = Vec::new();
                for (id, subscriber) in self.subscribers.iter_mut() {
                    if !matches(&subscriber.filter, &notification) {
                        continue;
                    }
                    match subscriber.tx.try_send(notification.clone()) {
                        Ok(()) => subscriber.consecutive_drops = 0,
                        Err(_) => {
                            subscriber.consecutive_drops += 1;
                            self.dropped_total.fetch_add(1, Ordering::Relaxed);
                            if subscriber.consecutive_drops >= self.max_consecutive_drops {
                                warn!(
                                    subscriber = id.0,
                                    "unsubscribing after consecutive channel-full drops"
                                );
                                to_drop.push(*id);
                            }
                        }
                    }
                }
                for id in to_drop {
                    self.subscribers.remove(&id);
                }
                HubResponse::Published
            }
        }
    }

    async fn on_shutdown(&mut self) {
        info!(
            remaining_subscribers = self.subscribers.len(),
            "notification hub mailbox closed"
        );
    }
}

/// Cloneable client for the hub. Wraps the generic `ActorHandle` in a
/// narrower API so callers never see `HubRequest`/`HubResponse` directly.
#[derive(Clone)]
pub struct NotificationHubHandle {
    actor: ActorHandle<HubRequest, HubResponse>,
}

impl NotificationHubHandle {
    pub fn spawn() -> (Self, tokio::task::JoinHandle<()>) {
        Self::spawn_with_capacity(SUBSCRIBER_CHANNEL_CAPACITY, MAX_CONSECUTIVE_DROPS)
    }

    pub fn spawn_with_capacity(
        channel_capacity: usize,
        max_consecutive_drops: u32,
    ) -> (Self, tokio::task::JoinHandle<()>) {
        let hub = NotificationHub {
            subscribers: HashMap::new(),
            next_id: 0,
            dropped_total: Arc::new(AtomicU64::new(0)),
            channel_capacity,
            max_consecutive_drops,
        };
        let (actor, join) = spawn_actor(hub, DEFAULT_MAILBOX_CAPACITY);
        (Self { actor }, join)
    }

    pub async fn subscribe(
        &self,
        filter: NotificationFilter,
    ) -> Result<(SubscriberId, mpsc::Receiver<Notification>), substrate_contracts::CoreError> {
        match self.actor.ask(HubRequest::Subscribe { filter }).await? {
            HubResponse::Subscribed { id, rx } => Ok((id, rx)),
            _ => unreachable!("Subscribe always yields Subscribed"),
        }
    }

    pub async fn unsubscribe(&self, id: SubscriberId) -> Result<(), substrate_contracts::CoreError> {
        self.actor.ask(HubRequest::Unsubscribe { id }).await?;
        Ok(())
    }
}

#[async_trait]
impl NotificationSink for NotificationHubHandle {
    async fn publish(&self, notification: Notification) {
        // `Tell`, never `Ask`: the Mail/Review services must not block on
        // the hub (spec §5 "Mail service must not Ask Notification hub").
        if self.actor.tell(HubRequest::Publish { notification }).is_err() {
            warn!("notification hub unavailable, dropping publish");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use substrate_model::{AgentId, MessageId, Priority, TopicId};

    #[tokio::test]
    async fn subscriber_receives_matching_notification_fifo() {
        let (hub, _join) = NotificationHubHandle::spawn();
        let agent = AgentId(1);
        let (_id, mut rx) = hub.subscribe(NotificationFilter::AgentInbox(agent)).await.unwrap();

        for offset in 1..=3 {
            hub.publish(Notification::NewMessage {
                topic_id: TopicId(1),
                message_id: MessageId(offset),
                log_offset: offset,
                recipient_id: agent,
                priority: Priority::Normal,
            })
            .await;
        }

        for offset in 1..=3 {
            match rx.recv().await.unwrap() {
                Notification::NewMessage { message_id, .. } => assert_eq!(message_id, MessageId(offset)),
                other => panic!("unexpected notification: {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn non_matching_filter_is_not_delivered() {
        let (hub, _join) = NotificationHubHandle::spawn();
        let (_id, mut rx) = hub
            .subscribe(NotificationFilter::AgentInbox(AgentId(1)))
            .await
            .unwrap();

        hub.publish(Notification::NewMessage {
            topic_id: TopicId(1),
            message_id: MessageId(1),
            log_offset: 1,
            recipient_id: AgentId(2),
            priority: Priority::Normal,
        })
        .await;

        assert!(rx.try_recv().is_err());
    }
}
