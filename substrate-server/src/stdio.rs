//! Line-delimited JSON-RPC tool protocol (spec §6 "A stdio line-based tool
//! protocol exposing the same operations as 'tools' addressable by a fixed
//! set of tool names"). Grounded on the teacher's `websocket` command-frame
//! dispatch loop, adapted to stdin/stdout line framing instead of a socket.
//!
//! One JSON object per line in, one JSON object per line out:
//! `{"id": "...", "tool": "send_mail", "params": {...}}` ->
//! `{"id": "...", "result": {...}}` or `{"id": "...", "error": {...}}`.

use std::time::Duration;

use serde::Deserialize;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use substrate_contracts::{CoreError, NotificationFilter};
use substrate_core::api::{long_poll, wait_for_plan_review_decision, wait_for_review_decision};
use substrate_core::System;
use substrate_model::{AgentId, MessageId, ReviewId, ThreadId};

use crate::dto::{
    since_from_wire, since_to_wire, CreatePlanReviewRequest, CreateReviewRequest, InboxQuery,
    PollRequest, PublishRequest, ReviewEventRequest, SendMailRequest, TaskSyncRequest,
};
use crate::errors::RpcError;

#[derive(Deserialize)]
struct Frame {
    id: Value,
    tool: String,
    #[serde(default)]
    params: Value,
}

/// Reads one JSON frame per line from `stdin` until EOF, dispatches it
/// against `system`, and writes one JSON frame per line to `stdout`. Runs
/// for the lifetime of the process when `server.enable_stdio` is set.
pub async fn run(system: System) {
    let stdin = tokio::io::stdin();
    let mut lines = BufReader::new(stdin).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(err) => {
                tracing::error!(error = %err, "stdio read failed");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<Frame>(&line) {
            Ok(frame) => {
                let id = frame.id.clone();
                match dispatch(&system, &frame.tool, frame.params).await {
                    Ok(result) => json!({ "id": id, "result": result }),
                    Err(err) => json!({ "id": id, "error": RpcError::from(err) }),
                }
            }
            Err(err) => json!({ "id": Value::Null, "error": { "code": 400, "kind": "validation", "message": err.to_string() } }),
        };

        let mut out = serde_json::to_vec(&response).unwrap_or_default();
        out.push(b'\n');
        if stdout.write_all(&out).await.is_err() || stdout.flush().await.is_err() {
            break;
        }
    }
}

async fn dispatch(system: &System, tool: &str, params: Value) -> Result<Value, CoreError> {
    fn parse<T: serde::de::DeserializeOwned>(params: Value) -> Result<T, CoreError> {
        serde_json::from_value(params).map_err(|err| CoreError::Validation(err.to_string()))
    }

    match tool {
        "send_mail" => {
            let req: SendMailRequest = parse(params)?;
            let message = system.mail.send_mail(req.into()).await?;
            Ok(serde_json::to_value(message).unwrap())
        }
        "publish" => {
            let req: PublishRequest = parse(params)?;
            let message = system.mail.publish(req.into()).await?;
            Ok(serde_json::to_value(message).unwrap())
        }
        "inbox" => {
            let req: InboxQuery = parse(params)?;
            let rows = system.mail.fetch_inbox(req.agent_id, req.filter, req.limit).await?;
            Ok(serde_json::to_value(rows).unwrap())
        }
        "read" => {
            #[derive(Deserialize)]
            struct Req {
                agent_id: AgentId,
                message_id: MessageId,
            }
            let req: Req = parse(params)?;
            let (message, recipient) = system.mail.read_message(req.agent_id, req.message_id).await?;
            Ok(json!({ "message": message, "recipient": recipient }))
        }
        "star" | "snooze" | "archive" | "unarchive" | "trash" => {
            #[derive(Deserialize)]
            struct Req {
                agent_id: AgentId,
                message_id: MessageId,
                new_state: substrate_model::RecipientState,
                snoozed_until: Option<chrono::DateTime<chrono::Utc>>,
            }
            let req: Req = parse(params)?;
            let recipient = system
                .mail
                .update_message_state(req.agent_id, req.message_id, req.new_state, req.snoozed_until)
                .await?;
            Ok(serde_json::to_value(recipient).unwrap())
        }
        "ack" => {
            #[derive(Deserialize)]
            struct Req {
                agent_id: AgentId,
                message_id: MessageId,
            }
            let req: Req = parse(params)?;
            let recipient = system.mail.ack_message(req.agent_id, req.message_id).await?;
            Ok(serde_json::to_value(recipient).unwrap())
        }
        "poll" => {
            let req: PollRequest = parse(params)?;
            let since = since_from_wire(req.since);
            let timeout = Duration::from_millis(req.timeout_ms);
            let (messages, advanced) = long_poll(&system.mail, &system.notifications, req.agent_id, since, timeout).await?;
            Ok(json!({ "messages": messages, "since": since_to_wire(advanced) }))
        }
        "status" => {
            #[derive(Deserialize)]
            struct Req {
                agent_id: AgentId,
            }
            let req: Req = parse(params)?;
            let status = system.mail.agent_status(req.agent_id).await?;
            Ok(serde_json::to_value(status).unwrap())
        }
        "search" => {
            #[derive(Deserialize)]
            struct Req {
                q: String,
                #[serde(default = "default_search_limit")]
                limit: i64,
            }
            let req: Req = parse(params)?;
            let messages = system.mail.search_messages(req.q, req.limit).await?;
            Ok(serde_json::to_value(messages).unwrap())
        }
        "subscribe" => {
            // A single stdio request/response frame can't carry an
            // open-ended push stream (that's what `/v1/notifications/stream`
            // is for); this waits for the next notification or the timeout,
            // then unsubscribes, same wait-then-repoll shape as `long_poll`.
            #[derive(Deserialize)]
            struct Req {
                agent_id: AgentId,
                #[serde(default = "default_wait_ms")]
                timeout_ms: u64,
            }
            let req: Req = parse(params)?;
            let (sub_id, mut rx) = system
                .notifications
                .subscribe(NotificationFilter::AgentInbox(req.agent_id))
                .await?;
            let notification = tokio::time::timeout(Duration::from_millis(req.timeout_ms), rx.recv())
                .await
                .ok()
                .flatten();
            let _ = system.notifications.unsubscribe(sub_id).await;
            match notification {
                Some(n) => Ok(crate::rest::notification_to_json(&n)),
                None => Ok(Value::Null),
            }
        }
        "plan_submit" => {
            let req: CreatePlanReviewRequest = parse(params)?;
            let plan_review = system
                .reviews
                .create_plan_review(ThreadId(req.thread_id), req.requester_id, req.plan)
                .await?;
            Ok(serde_json::to_value(plan_review).unwrap())
        }
        "plan_wait" => {
            #[derive(Deserialize)]
            struct Req {
                review_id: uuid::Uuid,
                #[serde(default = "default_wait_ms")]
                timeout_ms: u64,
            }
            let req: Req = parse(params)?;
            let plan_review = wait_for_plan_review_decision(
                &system.reviews,
                ReviewId(req.review_id),
                Duration::from_millis(req.timeout_ms),
            )
            .await?;
            Ok(serde_json::to_value(plan_review).unwrap())
        }
        "review_create" => {
            let req: CreateReviewRequest = parse(params)?;
            let review = system
                .reviews
                .create_review(ThreadId(req.thread_id), req.requester_id, req.branch, req.review_type, req.priority)
                .await?;
            Ok(serde_json::to_value(review).unwrap())
        }
        "review_status" => {
            #[derive(Deserialize)]
            struct Req {
                review_id: uuid::Uuid,
            }
            let req: Req = parse(params)?;
            let review = system.reviews.get_review(ReviewId(req.review_id)).await?;
            Ok(serde_json::to_value(review).unwrap())
        }
        "review_event" => {
            #[derive(Deserialize)]
            struct Req {
                review_id: uuid::Uuid,
                #[serde(flatten)]
                event: ReviewEventRequest,
            }
            let req: Req = parse(params)?;
            let review = system.reviews.apply_event(req.event.into_event(ReviewId(req.review_id))).await?;
            Ok(serde_json::to_value(review).unwrap())
        }
        "review_wait" => {
            #[derive(Deserialize)]
            struct Req {
                review_id: uuid::Uuid,
                #[serde(default = "default_wait_ms")]
                timeout_ms: u64,
            }
            let req: Req = parse(params)?;
            let review =
                wait_for_review_decision(&system.reviews, ReviewId(req.review_id), Duration::from_millis(req.timeout_ms)).await?;
            Ok(serde_json::to_value(review).unwrap())
        }
        "tasks_hook_sync" => {
            let req: TaskSyncRequest = parse(params)?;
            let list = system
                .tasks
                .sync_task_list(substrate_model::TaskListId(req.list_id), &req.file_path, req.file_mtime)
                .await?;
            Ok(serde_json::to_value(list).unwrap())
        }
        "heartbeat" => Ok(json!({ "ok": true })),
        other => Err(CoreError::Validation(format!("unknown tool {other}"))),
    }
}

fn default_wait_ms() -> u64 {
    60_000
}

fn default_search_limit() -> i64 {
    20
}
