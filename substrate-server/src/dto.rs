//! Wire-shaped request bodies, deserialized from either JSON (REST) or a
//! JSON-RPC `params` object (stdio) and converted into the core's typed
//! inputs. Response bodies reuse `substrate-model`/`substrate-contracts`
//! types directly — they already derive `Serialize` under the `serde`
//! feature, so no separate response DTOs are needed.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use substrate_core::mail::{PublishInput, SendMailInput};
use substrate_contracts::ReviewOrchestratorEvent;
use substrate_model::{
    AgentId, InboxFilter, PlanReviewState, Priority, RecipientState, ReviewDecision, ReviewId,
    ReviewPriority, ReviewType, ThreadId, TopicId,
};

fn default_priority() -> Priority {
    Priority::Normal
}

#[derive(Deserialize)]
pub struct SendMailRequest {
    pub thread_id: Option<String>,
    pub sender_id: AgentId,
    pub topic_name: Option<String>,
    pub recipients: Vec<AgentId>,
    pub subject: String,
    pub body: String,
    #[serde(default = "default_priority")]
    pub priority: Priority,
    pub deadline: Option<DateTime<Utc>>,
    pub idempotency_key: Option<String>,
}

impl From<SendMailRequest> for SendMailInput {
    fn from(req: SendMailRequest) -> Self {
        SendMailInput {
            thread_id: ThreadId(req.thread_id.unwrap_or_else(|| uuid::Uuid::now_v7().to_string())),
            sender_id: req.sender_id,
            topic_name: req.topic_name,
            recipients: req.recipients,
            subject: req.subject,
            body: req.body,
            priority: req.priority,
            deadline: req.deadline,
            attachments: None,
            idempotency_key: req.idempotency_key,
        }
    }
}

#[derive(Deserialize)]
pub struct PublishRequest {
    pub thread_id: Option<String>,
    pub sender_id: AgentId,
    pub topic_name: String,
    pub subject: String,
    pub body: String,
    #[serde(default = "default_priority")]
    pub priority: Priority,
    pub deadline: Option<DateTime<Utc>>,
    pub idempotency_key: Option<String>,
}

impl From<PublishRequest> for PublishInput {
    fn from(req: PublishRequest) -> Self {
        PublishInput {
            thread_id: ThreadId(req.thread_id.unwrap_or_else(|| uuid::Uuid::now_v7().to_string())),
            sender_id: req.sender_id,
            topic_name: req.topic_name,
            subject: req.subject,
            body: req.body,
            priority: req.priority,
            deadline: req.deadline,
            attachments: None,
            idempotency_key: req.idempotency_key,
        }
    }
}

#[derive(Deserialize)]
pub struct InboxQuery {
    pub agent_id: AgentId,
    #[serde(default = "default_inbox_filter")]
    pub filter: InboxFilter,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_inbox_filter() -> InboxFilter {
    InboxFilter::Inbox
}

fn default_limit() -> i64 {
    50
}

#[derive(Deserialize)]
pub struct UpdateStateRequest {
    pub agent_id: AgentId,
    pub new_state: RecipientState,
    pub snoozed_until: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
pub struct AckRequest {
    pub agent_id: AgentId,
}

/// `since` arrives as string-keyed offsets (spec §6: "Schemas require string
/// keys in JSON maps (integer keys must be encoded as strings and converted
/// at the adapter boundary)") and is converted to the `TopicId`-keyed map
/// the Mail service expects.
#[derive(Deserialize)]
pub struct PollRequest {
    pub agent_id: AgentId,
    #[serde(default)]
    pub since: HashMap<String, i64>,
    #[serde(default = "default_poll_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_poll_timeout_ms() -> u64 {
    30_000
}

pub fn since_from_wire(since: HashMap<String, i64>) -> HashMap<TopicId, i64> {
    since
        .into_iter()
        .filter_map(|(k, v)| k.parse::<i64>().ok().map(|id| (TopicId(id), v)))
        .collect()
}

pub fn since_to_wire(since: HashMap<TopicId, i64>) -> HashMap<String, i64> {
    since.into_iter().map(|(k, v)| (k.0.to_string(), v)).collect()
}

#[derive(Deserialize)]
pub struct CreateReviewRequest {
    pub thread_id: String,
    pub requester_id: AgentId,
    pub branch: Option<String>,
    #[serde(default = "default_review_type")]
    pub review_type: ReviewType,
    #[serde(default = "default_review_priority")]
    pub priority: ReviewPriority,
}

fn default_review_type() -> ReviewType {
    ReviewType::Full
}

fn default_review_priority() -> ReviewPriority {
    ReviewPriority::Normal
}

#[derive(Deserialize)]
pub struct CreatePlanReviewRequest {
    pub thread_id: String,
    pub requester_id: AgentId,
    pub plan: String,
}

#[derive(Deserialize)]
pub struct DecidePlanReviewRequest {
    pub decision: PlanReviewState,
}

#[derive(Deserialize)]
pub struct WaitQuery {
    #[serde(default = "default_wait_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_wait_timeout_ms() -> u64 {
    60_000
}

#[derive(Deserialize)]
pub struct TaskSyncRequest {
    pub list_id: String,
    pub file_path: String,
    pub file_mtime: i64,
}

#[derive(Deserialize)]
pub struct SetTaskStatusRequest {
    pub status: substrate_model::TaskStatus,
    pub owner: Option<String>,
}

/// Wire mirror of `ReviewOrchestratorEvent`: the event variants carry
/// `review_id` out-of-band (it's the path parameter), so only the
/// remaining payload is deserialized here.
#[derive(Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReviewEventRequest {
    Requested,
    Claimed,
    LaunchFailed { error: String },
    IterationCompleted { decision: ReviewDecision },
    ReReviewRequested,
    Cancelled,
}

impl ReviewEventRequest {
    pub fn into_event(self, review_id: ReviewId) -> ReviewOrchestratorEvent {
        match self {
            ReviewEventRequest::Requested => ReviewOrchestratorEvent::Requested { review_id },
            ReviewEventRequest::Claimed => ReviewOrchestratorEvent::Claimed { review_id },
            ReviewEventRequest::LaunchFailed { error } => {
                ReviewOrchestratorEvent::LaunchFailed { review_id, error }
            }
            ReviewEventRequest::IterationCompleted { decision } => {
                ReviewOrchestratorEvent::IterationCompleted { review_id, decision }
            }
            ReviewEventRequest::ReReviewRequested => {
                ReviewOrchestratorEvent::ReReviewRequested { review_id }
            }
            ReviewEventRequest::Cancelled => ReviewOrchestratorEvent::Cancelled { review_id },
        }
    }
}
