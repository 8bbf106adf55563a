//! REST proxy over the Mail/Review/Task services (spec §6 "A REST proxy
//! over the same RPC methods, same schemas, JSON encoding"). Grounded on
//! the teacher's `routes::create_api_router` + `create_app` shape in
//! `ferrex-server/src/main.rs`.

use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Json};
use axum::routing::{get, post};
use axum::Router;
use futures::StreamExt;
use serde_json::{json, Value};

use substrate_contracts::{Notification, NotificationFilter};
use substrate_core::api::{long_poll, subscribe_stream, wait_for_plan_review_decision, wait_for_review_decision};
use substrate_model::{AgentId, MessageId, ReviewId};

use crate::dto::{
    since_from_wire, since_to_wire, AckRequest, CreatePlanReviewRequest, CreateReviewRequest,
    DecidePlanReviewRequest, InboxQuery, PollRequest, PublishRequest, ReviewEventRequest,
    SendMailRequest, SetTaskStatusRequest, TaskSyncRequest, UpdateStateRequest, WaitQuery,
};
use crate::errors::ApiError;
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/ping", get(ping))
        .route("/health", get(health))
        .route("/v1/mail", post(send_mail))
        .route("/v1/publish", post(publish))
        .route("/v1/inbox", get(fetch_inbox))
        .route("/v1/search", get(search_messages))
        .route("/v1/messages/{id}/read", post(read_message))
        .route("/v1/messages/{id}/state", post(update_message_state))
        .route("/v1/messages/{id}/ack", post(ack_message))
        .route("/v1/poll", post(poll_changes))
        .route("/v1/status/{agent_id}", get(agent_status))
        .route("/v1/notifications/stream", get(notification_stream))
        .route("/v1/reviews", post(create_review))
        .route("/v1/reviews/{id}", get(get_review))
        .route("/v1/reviews/{id}/events", post(apply_review_event))
        .route("/v1/reviews/{id}/wait", get(wait_review))
        .route("/v1/plan-reviews", post(create_plan_review))
        .route("/v1/plan-reviews/{id}", get(get_plan_review))
        .route("/v1/plan-reviews/{id}/decide", post(decide_plan_review))
        .route("/v1/plan-reviews/{id}/wait", get(wait_plan_review))
        .route("/v1/tasks/sync", post(sync_task_list))
        .route("/v1/tasks/{list_id}", get(list_tasks))
        .route("/v1/tasks/{list_id}/{task_id}/status", post(set_task_status))
        .with_state(state)
}

async fn ping() -> &'static str {
    "pong"
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn send_mail(State(state): State<AppState>, Json(req): Json<SendMailRequest>) -> Result<impl IntoResponse, ApiError> {
    let message = state.system.mail.send_mail(req.into()).await?;
    Ok(Json(message))
}

async fn publish(State(state): State<AppState>, Json(req): Json<PublishRequest>) -> Result<impl IntoResponse, ApiError> {
    let message = state.system.mail.publish(req.into()).await?;
    Ok(Json(message))
}

async fn fetch_inbox(State(state): State<AppState>, Query(q): Query<InboxQuery>) -> Result<impl IntoResponse, ApiError> {
    let rows = state.system.mail.fetch_inbox(q.agent_id, q.filter, q.limit).await?;
    Ok(Json(rows))
}

#[derive(serde::Deserialize)]
struct SearchQuery {
    q: String,
    #[serde(default = "default_search_limit")]
    limit: i64,
}

fn default_search_limit() -> i64 {
    20
}

async fn search_messages(State(state): State<AppState>, Query(q): Query<SearchQuery>) -> Result<impl IntoResponse, ApiError> {
    let messages = state.system.mail.search_messages(q.q, q.limit).await?;
    Ok(Json(messages))
}

async fn read_message(
    State(state): State<AppState>,
    Path(id): Path<MessageId>,
    Json(req): Json<AckRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (message, recipient) = state.system.mail.read_message(req.agent_id, id).await?;
    Ok(Json(json!({ "message": message, "recipient": recipient })))
}

async fn update_message_state(
    State(state): State<AppState>,
    Path(id): Path<MessageId>,
    Json(req): Json<UpdateStateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let recipient = state
        .system
        .mail
        .update_message_state(req.agent_id, id, req.new_state, req.snoozed_until)
        .await?;
    Ok(Json(recipient))
}

async fn ack_message(
    State(state): State<AppState>,
    Path(id): Path<MessageId>,
    Json(req): Json<AckRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let recipient = state.system.mail.ack_message(req.agent_id, id).await?;
    Ok(Json(recipient))
}

async fn poll_changes(State(state): State<AppState>, Json(q): Json<PollRequest>) -> Result<impl IntoResponse, ApiError> {
    let since = since_from_wire(q.since);
    let timeout = Duration::from_millis(q.timeout_ms);
    let (messages, advanced) = long_poll(&state.system.mail, &state.system.notifications, q.agent_id, since, timeout).await?;
    Ok(Json(json!({ "messages": messages, "since": since_to_wire(advanced) })))
}

async fn agent_status(State(state): State<AppState>, Path(agent_id): Path<AgentId>) -> Result<impl IntoResponse, ApiError> {
    let status = state.system.mail.agent_status(agent_id).await?;
    Ok(Json(status))
}

pub(crate) fn notification_to_json(n: &Notification) -> Value {
    match n {
        Notification::NewMessage { topic_id, message_id, log_offset, recipient_id, priority } => json!({
            "kind": "new_message",
            "topic_id": topic_id.0,
            "message_id": message_id.0,
            "log_offset": log_offset,
            "recipient_id": recipient_id.0,
            "priority": priority.as_str(),
        }),
        Notification::MessageStateChanged { message_id, agent_id } => json!({
            "kind": "message_state_changed",
            "message_id": message_id.0,
            "agent_id": agent_id.0,
        }),
        Notification::ReviewStateChanged { review_id, state } => json!({
            "kind": "review_state_changed",
            "review_id": review_id.0.to_string(),
            "state": state.as_str(),
        }),
        Notification::AgentStatusChanged { agent_id } => json!({
            "kind": "agent_status_changed",
            "agent_id": agent_id.0,
        }),
    }
}

#[derive(serde::Deserialize)]
struct StreamQuery {
    agent_id: Option<i64>,
    topic_id: Option<i64>,
    review_id: Option<uuid::Uuid>,
}

async fn notification_stream(
    State(state): State<AppState>,
    Query(q): Query<StreamQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = if let Some(agent) = q.agent_id {
        NotificationFilter::AgentInbox(AgentId(agent))
    } else if let Some(topic) = q.topic_id {
        NotificationFilter::Topic(substrate_model::TopicId(topic))
    } else if let Some(review) = q.review_id {
        NotificationFilter::Review(ReviewId(review))
    } else {
        return Err(substrate_contracts::CoreError::Validation(
            "one of agent_id, topic_id, review_id is required".into(),
        )
        .into());
    };

    let stream = subscribe_stream(&state.system.notifications, filter).await?;
    let events = stream.map(|n| {
        Event::default()
            .event("notification")
            .json_data(notification_to_json(&n))
            .map_err(Into::into)
    });
    Ok(Sse::new(events).keep_alive(KeepAlive::new().interval(Duration::from_secs(30)).text("keepalive")))
}

async fn create_review(State(state): State<AppState>, Json(req): Json<CreateReviewRequest>) -> Result<impl IntoResponse, ApiError> {
    let review = state
        .system
        .reviews
        .create_review(
            substrate_model::ThreadId(req.thread_id),
            req.requester_id,
            req.branch,
            req.review_type,
            req.priority,
        )
        .await?;
    Ok(Json(review))
}

async fn get_review(State(state): State<AppState>, Path(id): Path<ReviewId>) -> Result<impl IntoResponse, ApiError> {
    let review = state.system.reviews.get_review(id).await?;
    Ok(Json(review))
}

async fn apply_review_event(
    State(state): State<AppState>,
    Path(id): Path<ReviewId>,
    Json(req): Json<ReviewEventRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let review = state.system.reviews.apply_event(req.into_event(id)).await?;
    Ok(Json(review))
}

async fn wait_review(
    State(state): State<AppState>,
    Path(id): Path<ReviewId>,
    Query(q): Query<WaitQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let review = wait_for_review_decision(&state.system.reviews, id, Duration::from_millis(q.timeout_ms)).await?;
    Ok(Json(review))
}

async fn create_plan_review(
    State(state): State<AppState>,
    Json(req): Json<CreatePlanReviewRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let plan_review = state
        .system
        .reviews
        .create_plan_review(substrate_model::ThreadId(req.thread_id), req.requester_id, req.plan)
        .await?;
    Ok(Json(plan_review))
}

async fn get_plan_review(State(state): State<AppState>, Path(id): Path<ReviewId>) -> Result<impl IntoResponse, ApiError> {
    let plan_review = state.system.reviews.get_plan_review(id).await?;
    Ok(Json(plan_review))
}

async fn decide_plan_review(
    State(state): State<AppState>,
    Path(id): Path<ReviewId>,
    Json(req): Json<DecidePlanReviewRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let plan_review = state.system.reviews.decide_plan_review(id, req.decision).await?;
    Ok(Json(plan_review))
}

async fn wait_plan_review(
    State(state): State<AppState>,
    Path(id): Path<ReviewId>,
    Query(q): Query<WaitQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let plan_review =
        wait_for_plan_review_decision(&state.system.reviews, id, Duration::from_millis(q.timeout_ms)).await?;
    Ok(Json(plan_review))
}

async fn sync_task_list(State(state): State<AppState>, Json(req): Json<TaskSyncRequest>) -> Result<impl IntoResponse, ApiError> {
    let list = state
        .system
        .tasks
        .sync_task_list(substrate_model::TaskListId(req.list_id), &req.file_path, req.file_mtime)
        .await?;
    Ok(Json(list))
}

async fn list_tasks(State(state): State<AppState>, Path(list_id): Path<String>) -> Result<impl IntoResponse, ApiError> {
    let tasks = state.system.tasks.list_tasks(&substrate_model::TaskListId(list_id)).await?;
    Ok(Json(tasks))
}

async fn set_task_status(
    State(state): State<AppState>,
    Path((list_id, task_id)): Path<(String, String)>,
    Json(req): Json<SetTaskStatusRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let task = state
        .system
        .tasks
        .set_task_status(&substrate_model::TaskListId(list_id), &task_id, req.status, req.owner)
        .await?;
    Ok(Json(task))
}
