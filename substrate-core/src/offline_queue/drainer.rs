//! Background drainer loop: drain -> attempt delivery against the Mail
//! service -> mark -> sleep. Grounded on the teacher's `JobQueue` worker
//! loop shape, generalized to a fixed-interval `tokio::time::interval`
//! rather than a `Notify`-driven wakeup, since the offline queue has no
//! in-process enqueue-notify channel wired through yet.

use std::time::Duration;

use tokio::time::interval;
use tracing::{info, warn};

use substrate_model::OperationType;

use crate::mail::{MailServiceHandle, PublishInput, SendMailInput};
use crate::offline_queue::payload::{QueuedPublish, QueuedSend};
use crate::offline_queue::service::OfflineQueueHandle;

pub fn spawn_drainer(
    queue: OfflineQueueHandle,
    mail: MailServiceHandle,
    tick: Duration,
    batch_size: i64,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(tick);
        loop {
            ticker.tick().await;
            let batch = match queue.drain_batch(batch_size).await {
                Ok(batch) => batch,
                Err(err) => {
                    warn!(error = %err, "offline queue drain failed");
                    continue;
                }
            };
            if batch.is_empty() {
                continue;
            }
            info!(count = batch.len(), "draining offline queue batch");

            for op in batch {
                let outcome = match op.operation_type {
                    OperationType::Send => replay_send(&mail, &op.payload).await,
                    OperationType::Publish => replay_publish(&mail, &op.payload).await,
                    OperationType::Heartbeat | OperationType::StatusUpdate => {
                        // No Mail-service counterpart to replay; treat as
                        // already delivered once dequeued.
                        Ok(())
                    }
                };

                match outcome {
                    Ok(()) => {
                        if let Err(err) = queue.mark_delivered(op.id).await {
                            warn!(op_id = %op.id, error = %err, "failed to mark queued op delivered");
                        }
                    }
                    Err(err) => {
                        warn!(op_id = %op.id, error = %err, "queued op delivery failed, returning to pending");
                        if let Err(mark_err) = queue.mark_failed(op.id, err.to_string()).await {
                            warn!(op_id = %op.id, error = %mark_err, "failed to mark queued op failed");
                        }
                    }
                }
            }
        }
    })
}

async fn replay_send(mail: &MailServiceHandle, payload: &[u8]) -> Result<(), substrate_contracts::CoreError> {
    let queued: QueuedSend = serde_json::from_slice(payload)
        .map_err(|err| substrate_contracts::CoreError::Validation(format!("malformed queued send: {err}")))?;
    mail.send_mail(SendMailInput {
        thread_id: queued.thread_id,
        sender_id: queued.sender_id,
        topic_name: queued.topic_name,
        recipients: queued.recipients,
        subject: queued.subject,
        body: queued.body,
        priority: queued.priority,
        deadline: queued.deadline,
        attachments: None,
        idempotency_key: Some(queued.idempotency_key),
    })
    .await?;
    Ok(())
}

async fn replay_publish(mail: &MailServiceHandle, payload: &[u8]) -> Result<(), substrate_contracts::CoreError> {
    let queued: QueuedPublish = serde_json::from_slice(payload)
        .map_err(|err| substrate_contracts::CoreError::Validation(format!("malformed queued publish: {err}")))?;
    mail.publish(PublishInput {
        thread_id: queued.thread_id,
        sender_id: queued.sender_id,
        topic_name: queued.topic_name,
        subject: queued.subject,
        body: queued.body,
        priority: queued.priority,
        deadline: queued.deadline,
        attachments: None,
        idempotency_key: Some(queued.idempotency_key),
    })
    .await?;
    Ok(())
}
