//! Mail service actor (spec §4.3) — the single mutable path into message
//! storage. Grounded on the teacher's `JobQueue` actor shape, generalized
//! via `runtime::Actor`.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::warn;

use substrate_contracts::{
    ActivityStore, AgentStatus, AgentStore, CoreError, InsertedMessage, MessageStore, NewMessage,
    Notification, NotificationSink, TopicStore,
};
use substrate_model::{
    ActivityType, AgentId, InboxFilter, Message, MessageId, MessageRecipient, Priority,
    RecipientState, ThreadId, TopicId, TopicType,
};

use crate::runtime::{spawn_actor, Actor, ActorHandle, DEFAULT_MAILBOX_CAPACITY};
use crate::thread_fsm;

pub struct SendMailInput {
    pub thread_id: ThreadId,
    pub sender_id: AgentId,
    pub topic_name: Option<String>,
    pub recipients: Vec<AgentId>,
    pub subject: String,
    pub body: String,
    pub priority: Priority,
    pub deadline: Option<DateTime<Utc>>,
    pub attachments: Option<Vec<u8>>,
    pub idempotency_key: Option<String>,
}

pub struct PublishInput {
    pub thread_id: ThreadId,
    pub sender_id: AgentId,
    pub topic_name: String,
    pub subject: String,
    pub body: String,
    pub priority: Priority,
    pub deadline: Option<DateTime<Utc>>,
    pub attachments: Option<Vec<u8>>,
    pub idempotency_key: Option<String>,
}

pub enum MailRequest {
    SendMail(SendMailInput),
    Publish(PublishInput),
    FetchInbox {
        agent_id: AgentId,
        filter: InboxFilter,
        limit: i64,
    },
    ReadMessage {
        agent_id: AgentId,
        message_id: MessageId,
    },
    UpdateMessageState {
        agent_id: AgentId,
        message_id: MessageId,
        new_state: RecipientState,
        snoozed_until: Option<DateTime<Utc>>,
    },
    AckMessage {
        agent_id: AgentId,
        message_id: MessageId,
    },
    PollChanges {
        agent_id: AgentId,
        since: HashMap<TopicId, i64>,
    },
    GetAgentStatus {
        agent_id: AgentId,
    },
    SearchMessages {
        query: String,
        limit: i64,
    },
    SweepSnoozed,
    SweepExpired,
}

pub enum MailResponse {
    Sent(Message),
    Inbox(Vec<(Message, Option<MessageRecipient>)>),
    MessageWithRecipient(Message, MessageRecipient),
    Recipient(MessageRecipient),
    Polled(Vec<Message>, HashMap<TopicId, i64>),
    Status(AgentStatus),
    Messages(Vec<Message>),
    Swept(u64),
    Error(CoreError),
}

pub struct MailService {
    messages: Arc<dyn MessageStore>,
    topics: Arc<dyn TopicStore>,
    agents: Arc<dyn AgentStore>,
    activity: Arc<dyn ActivityStore>,
    notifier: Arc<dyn NotificationSink>,
}

impl MailService {
    /// Resolves the explicit recipient list if one was given (`SendMail`),
    /// otherwise every subscriber of the topic minus the sender
    /// (`Publish` broadcast fan-out) — spec §8 S4: "bob, carol receives a
    /// notification; alice is sender and skipped".
    async fn resolve_recipients(
        &self,
        topic_id: TopicId,
        sender_id: AgentId,
        explicit: &[AgentId],
    ) -> Result<Vec<AgentId>, CoreError> {
        if !explicit.is_empty() {
            return Ok(explicit.to_vec());
        }
        let subscribers = self.topics.list_subscribers(topic_id).await?;
        Ok(subscribers.into_iter().filter(|&id| id != sender_id).collect())
    }

    async fn do_send(
        &self,
        thread_id: ThreadId,
        sender_id: AgentId,
        topic_id: TopicId,
        subject: String,
        body: String,
        priority: Priority,
        deadline: Option<DateTime<Utc>>,
        attachments: Option<Vec<u8>>,
        idempotency_key: Option<String>,
        explicit_recipients: Vec<AgentId>,
    ) -> MailResponse {
        let recipients = match self.resolve_recipients(topic_id, sender_id, &explicit_recipients).await {
            Ok(recipients) => recipients,
            Err(err) => return MailResponse::Error(err),
        };

        let draft = NewMessage {
            thread_id,
            topic_id,
            sender_id,
            subject,
            body,
            priority,
            deadline,
            attachments,
            idempotency_key,
        };

        let InsertedMessage { message, recipients, was_new } =
            match self.messages.insert_message(draft, &recipients).await {
                Ok(inserted) => inserted,
                Err(err) => return MailResponse::Error(err.into()),
            };

        // A replay (idempotency_key matched an existing row) returns the
        // original message id without mutating any further state: no new
        // activity row, no repeated notification fan-out.
        if was_new {
            if let Err(err) = self
                .activity
                .append(sender_id, ActivityType::Message, &format!("sent message {}", message.id), None)
                .await
            {
                warn!(error = %err, "failed to append activity row for sent message");
            }

            for recipient in &recipients {
                self.notifier
                    .publish(Notification::new_message(&message, recipient.agent_id))
                    .await;
            }
        }

        MailResponse::Sent(message)
    }

    async fn read_message(&self, agent_id: AgentId, message_id: MessageId) -> MailResponse {
        let message = match self.messages.get_message(message_id).await {
            Ok(Some(message)) => message,
            Ok(None) => return MailResponse::Error(CoreError::NotFound),
            Err(err) => return MailResponse::Error(err.into()),
        };
        let recipient = match self.messages.get_recipient(message_id, agent_id).await {
            Ok(Some(recipient)) => recipient,
            Ok(None) => return MailResponse::Error(CoreError::NotFound),
            Err(err) => return MailResponse::Error(err.into()),
        };

        if recipient.state != RecipientState::Unread {
            return MailResponse::MessageWithRecipient(message, recipient);
        }

        let now = Utc::now();
        let outcome = match thread_fsm::transition(recipient.state, RecipientState::Read, None, now) {
            Ok(outcome) => outcome,
            Err(err) => return MailResponse::Error(err),
        };

        let updated = match self
            .messages
            .set_recipient_state(message_id, agent_id, outcome.new_state, outcome.snoozed_until)
            .await
        {
            Ok(updated) => updated,
            Err(err) => return MailResponse::Error(err.into()),
        };

        self.notifier
            .publish(Notification::MessageStateChanged { message_id, agent_id })
            .await;

        MailResponse::MessageWithRecipient(message, updated)
    }

    async fn update_state(
        &self,
        agent_id: AgentId,
        message_id: MessageId,
        new_state: RecipientState,
        snoozed_until: Option<DateTime<Utc>>,
    ) -> MailResponse {
        let recipient = match self.messages.get_recipient(message_id, agent_id).await {
            Ok(Some(recipient)) => recipient,
            Ok(None) => return MailResponse::Error(CoreError::NotFound),
            Err(err) => return MailResponse::Error(err.into()),
        };

        let now = Utc::now();
        let outcome = match thread_fsm::transition(recipient.state, new_state, snoozed_until, now) {
            Ok(outcome) => outcome,
            Err(err) => return MailResponse::Error(err),
        };

        let updated = match self
            .messages
            .set_recipient_state(message_id, agent_id, outcome.new_state, outcome.snoozed_until)
            .await
        {
            Ok(updated) => updated,
            Err(err) => return MailResponse::Error(err.into()),
        };

        self.notifier
            .publish(Notification::MessageStateChanged { message_id, agent_id })
            .await;

        MailResponse::Recipient(updated)
    }

    async fn sweep_snoozed(&self) -> MailResponse {
        let woken = match self.messages.sweep_snoozed(Utc::now()).await {
            Ok(rows) => rows,
            Err(err) => return MailResponse::Error(err.into()),
        };
        for row in &woken {
            self.notifier
                .publish(Notification::MessageStateChanged {
                    message_id: row.message_id,
                    agent_id: row.agent_id,
                })
                .await;
        }
        MailResponse::Swept(woken.len() as u64)
    }
}

#[async_trait]
impl Actor for MailService {
    type Req = MailRequest;
    type Resp = MailResponse;

    async fn handle(&mut self, req: MailRequest) -> MailResponse {
        match req {
            MailRequest::SendMail(input) => {
                let topic_id = if let Some(name) = input.topic_name {
                    match self
                        .topics
                        .get_or_create_topic(&name, TopicType::Direct, None)
                        .await
                    {
                        Ok(topic) => topic.id,
                        Err(err) => return MailResponse::Error(err.into()),
                    }
                } else if let Some(&only_recipient) = input.recipients.first().filter(|_| input.recipients.len() == 1) {
                    let agent = match self.agents.get_agent(only_recipient).await {
                        Ok(Some(agent)) => agent,
                        Ok(None) => return MailResponse::Error(CoreError::NotFound),
                        Err(err) => return MailResponse::Error(err.into()),
                    };
                    match self.topics.ensure_direct_inbox(agent.id, &agent.name).await {
                        Ok(topic_id) => topic_id,
                        Err(err) => return MailResponse::Error(err.into()),
                    }
                } else {
                    return MailResponse::Error(CoreError::Validation(
                        "SendMail requires an explicit topic for multi-recipient sends".to_string(),
                    ));
                };

                self.do_send(
                    input.thread_id,
                    input.sender_id,
                    topic_id,
                    input.subject,
                    input.body,
                    input.priority,
                    input.deadline,
                    input.attachments,
                    input.idempotency_key,
                    input.recipients,
                )
                .await
            }

            MailRequest::Publish(input) => {
                let topic = match self
                    .topics
                    .get_or_create_topic(&input.topic_name, TopicType::Broadcast, None)
                    .await
                {
                    Ok(topic) => topic,
                    Err(err) => return MailResponse::Error(err.into()),
                };

                self.do_send(
                    input.thread_id,
                    input.sender_id,
                    topic.id,
                    input.subject,
                    input.body,
                    input.priority,
                    input.deadline,
                    input.attachments,
                    input.idempotency_key,
                    Vec::new(),
                )
                .await
            }

            MailRequest::FetchInbox { agent_id, filter, limit } => {
                match self.messages.fetch_inbox(agent_id, filter, limit).await {
                    Ok(rows) => MailResponse::Inbox(rows),
                    Err(err) => MailResponse::Error(err.into()),
                }
            }

            MailRequest::ReadMessage { agent_id, message_id } => self.read_message(agent_id, message_id).await,

            MailRequest::UpdateMessageState {
                agent_id,
                message_id,
                new_state,
                snoozed_until,
            } => self.update_state(agent_id, message_id, new_state, snoozed_until).await,

            MailRequest::AckMessage { agent_id, message_id } => {
                match self.messages.ack_message(message_id, agent_id).await {
                    Ok(recipient) => MailResponse::Recipient(recipient),
                    Err(err) => MailResponse::Error(err.into()),
                }
            }

            MailRequest::PollChanges { agent_id, since } => match self.messages.poll_changes(agent_id, &since).await {
                Ok((messages, advanced)) => MailResponse::Polled(messages, advanced),
                Err(err) => MailResponse::Error(err.into()),
            },

            MailRequest::GetAgentStatus { agent_id } => match self.messages.agent_status(agent_id).await {
                Ok(status) => MailResponse::Status(status),
                Err(err) => MailResponse::Error(err.into()),
            },

            MailRequest::SearchMessages { query, limit } => match self.messages.search_messages(&query, limit).await {
                Ok(messages) => MailResponse::Messages(messages),
                Err(err) => MailResponse::Error(err.into()),
            },

            MailRequest::SweepSnoozed => self.sweep_snoozed().await,

            MailRequest::SweepExpired => match self.messages.sweep_expired_messages(Utc::now()).await {
                Ok(count) => MailResponse::Swept(count),
                Err(err) => MailResponse::Error(err.into()),
            },
        }
    }
}

#[derive(Clone)]
pub struct MailServiceHandle {
    actor: ActorHandle<MailRequest, MailResponse>,
}

impl MailServiceHandle {
    pub fn spawn(
        messages: Arc<dyn MessageStore>,
        topics: Arc<dyn TopicStore>,
        agents: Arc<dyn AgentStore>,
        activity: Arc<dyn ActivityStore>,
        notifier: Arc<dyn NotificationSink>,
    ) -> (Self, tokio::task::JoinHandle<()>) {
        let service = MailService {
            messages,
            topics,
            agents,
            activity,
            notifier,
        };
        let (actor, join) = spawn_actor(service, DEFAULT_MAILBOX_CAPACITY);
        (Self { actor }, join)
    }

    pub async fn send_mail(&self, input: SendMailInput) -> Result<Message, CoreError> {
        match self.actor.ask(MailRequest::SendMail(input)).await? {
            MailResponse::Sent(message) => Ok(message),
            MailResponse::Error(err) => Err(err),
            _ => unreachable!("SendMail always yields Sent or Error"),
        }
    }

    pub async fn publish(&self, input: PublishInput) -> Result<Message, CoreError> {
        match self.actor.ask(MailRequest::Publish(input)).await? {
            MailResponse::Sent(message) => Ok(message),
            MailResponse::Error(err) => Err(err),
            _ => unreachable!("Publish always yields Sent or Error"),
        }
    }

    pub async fn fetch_inbox(
        &self,
        agent_id: AgentId,
        filter: InboxFilter,
        limit: i64,
    ) -> Result<Vec<(Message, Option<MessageRecipient>)>, CoreError> {
        match self.actor.ask(MailRequest::FetchInbox { agent_id, filter, limit }).await? {
            MailResponse::Inbox(rows) => Ok(rows),
            MailResponse::Error(err) => Err(err),
            _ => unreachable!("FetchInbox always yields Inbox or Error"),
        }
    }

    pub async fn read_message(
        &self,
        agent_id: AgentId,
        message_id: MessageId,
    ) -> Result<(Message, MessageRecipient), CoreError> {
        match self.actor.ask(MailRequest::ReadMessage { agent_id, message_id }).await? {
            MailResponse::MessageWithRecipient(message, recipient) => Ok((message, recipient)),
            MailResponse::Error(err) => Err(err),
            _ => unreachable!("ReadMessage always yields MessageWithRecipient or Error"),
        }
    }

    pub async fn update_message_state(
        &self,
        agent_id: AgentId,
        message_id: MessageId,
        new_state: RecipientState,
        snoozed_until: Option<DateTime<Utc>>,
    ) -> Result<MessageRecipient, CoreError> {
        match self
            .actor
            .ask(MailRequest::UpdateMessageState {
                agent_id,
                message_id,
                new_state,
                snoozed_until,
            })
            .await?
        {
            MailResponse::Recipient(recipient) => Ok(recipient),
            MailResponse::Error(err) => Err(err),
            _ => unreachable!("UpdateMessageState always yields Recipient or Error"),
        }
    }

    pub async fn ack_message(&self, agent_id: AgentId, message_id: MessageId) -> Result<MessageRecipient, CoreError> {
        match self.actor.ask(MailRequest::AckMessage { agent_id, message_id }).await? {
            MailResponse::Recipient(recipient) => Ok(recipient),
            MailResponse::Error(err) => Err(err),
            _ => unreachable!("AckMessage always yields Recipient or Error"),
        }
    }

    pub async fn poll_changes(
        &self,
        agent_id: AgentId,
        since: HashMap<TopicId, i64>,
    ) -> Result<(Vec<Message>, HashMap<TopicId, i64>), CoreError> {
        match self.actor.ask(MailRequest::PollChanges { agent_id, since }).await? {
            MailResponse::Polled(messages, advanced) => Ok((messages, advanced)),
            MailResponse::Error(err) => Err(err),
            _ => unreachable!("PollChanges always yields Polled or Error"),
        }
    }

    pub async fn agent_status(&self, agent_id: AgentId) -> Result<AgentStatus, CoreError> {
        match self.actor.ask(MailRequest::GetAgentStatus { agent_id }).await? {
            MailResponse::Status(status) => Ok(status),
            MailResponse::Error(err) => Err(err),
            _ => unreachable!("GetAgentStatus always yields Status or Error"),
        }
    }

    pub async fn search_messages(&self, query: String, limit: i64) -> Result<Vec<Message>, CoreError> {
        match self.actor.ask(MailRequest::SearchMessages { query, limit }).await? {
            MailResponse::Messages(messages) => Ok(messages),
            MailResponse::Error(err) => Err(err),
            _ => unreachable!("SearchMessages always yields Messages or Error"),
        }
    }

    pub(crate) async fn sweep_snoozed(&self) -> Result<u64, CoreError> {
        match self.actor.ask(MailRequest::SweepSnoozed).await? {
            MailResponse::Swept(count) => Ok(count),
            MailResponse::Error(err) => Err(err),
            _ => unreachable!("SweepSnoozed always yields Swept or Error"),
        }
    }

    pub(crate) async fn sweep_expired(&self) -> Result<u64, CoreError> {
        match self.actor.ask(MailRequest::SweepExpired).await? {
            MailResponse::Swept(count) => Ok(count),
            MailResponse::Error(err) => Err(err),
            _ => unreachable!("SweepExpired always yields Swept or Error"),
        }
    }
}
