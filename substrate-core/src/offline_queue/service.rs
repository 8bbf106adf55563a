//! Offline write-behind queue actor (spec §4.7). Backed by its own
//! `SqlitePool`/file so a main-store outage cannot also jam queued writes.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use substrate_contracts::{CoreError, OfflineQueueStore};
use substrate_model::{OperationType, PendingOperation, PendingOperationId, QueueStatus};

use crate::runtime::{spawn_actor, Actor, ActorHandle, DEFAULT_MAILBOX_CAPACITY};

pub enum QueueRequest {
    Enqueue {
        idempotency_key: String,
        operation_type: OperationType,
        payload: Vec<u8>,
        agent_name: String,
        session_id: Option<String>,
        expires_at: DateTime<Utc>,
    },
    DrainBatch {
        limit: i64,
    },
    MarkDelivered {
        id: PendingOperationId,
    },
    MarkFailed {
        id: PendingOperationId,
        error: String,
    },
    PurgeExpired,
}

pub enum QueueResponse {
    Enqueued(PendingOperation),
    Drained(Vec<PendingOperation>),
    Marked(PendingOperation),
    Acked,
    Purged(u64),
    Error(CoreError),
}

struct OfflineQueueService {
    store: Arc<dyn OfflineQueueStore>,
    max_pending: i64,
}

#[async_trait]
impl Actor for OfflineQueueService {
    type Req = QueueRequest;
    type Resp = QueueResponse;

    async fn handle(&mut self, req: QueueRequest) -> QueueResponse {
        match req {
            QueueRequest::Enqueue {
                idempotency_key,
                operation_type,
                payload,
                agent_name,
                session_id,
                expires_at,
            } => {
                let pending = match self.store.count_by_status(QueueStatus::Pending).await {
                    Ok(count) => count,
                    Err(err) => return QueueResponse::Error(err.into()),
                };
                if pending >= self.max_pending {
                    return QueueResponse::Error(CoreError::QueueFull);
                }
                match self
                    .store
                    .enqueue(idempotency_key, operation_type, payload, agent_name, session_id, expires_at)
                    .await
                {
                    Ok(op) => QueueResponse::Enqueued(op),
                    Err(err) => QueueResponse::Error(err.into()),
                }
            }

            QueueRequest::DrainBatch { limit } => match self.store.drain_batch(limit).await {
                Ok(ops) => QueueResponse::Drained(ops),
                Err(err) => QueueResponse::Error(err.into()),
            },

            QueueRequest::MarkDelivered { id } => match self.store.mark_delivered(id).await {
                Ok(()) => QueueResponse::Acked,
                Err(err) => QueueResponse::Error(err.into()),
            },

            QueueRequest::MarkFailed { id, error } => match self.store.mark_failed(id, &error).await {
                Ok(op) => QueueResponse::Marked(op),
                Err(err) => QueueResponse::Error(err.into()),
            },

            QueueRequest::PurgeExpired => match self.store.purge_expired(Utc::now()).await {
                Ok(count) => QueueResponse::Purged(count),
                Err(err) => QueueResponse::Error(err.into()),
            },
        }
    }
}

#[derive(Clone)]
pub struct OfflineQueueHandle {
    actor: ActorHandle<QueueRequest, QueueResponse>,
}

impl OfflineQueueHandle {
    pub fn spawn(store: Arc<dyn OfflineQueueStore>, max_pending: i64) -> (Self, tokio::task::JoinHandle<()>) {
        let service = OfflineQueueService { store, max_pending };
        let (actor, join) = spawn_actor(service, DEFAULT_MAILBOX_CAPACITY);
        (Self { actor }, join)
    }

    pub async fn enqueue(
        &self,
        idempotency_key: String,
        operation_type: OperationType,
        payload: Vec<u8>,
        agent_name: String,
        session_id: Option<String>,
        expires_at: DateTime<Utc>,
    ) -> Result<PendingOperation, CoreError> {
        match self
            .actor
            .ask(QueueRequest::Enqueue {
                idempotency_key,
                operation_type,
                payload,
                agent_name,
                session_id,
                expires_at,
            })
            .await?
        {
            QueueResponse::Enqueued(op) => Ok(op),
            QueueResponse::Error(err) => Err(err),
            _ => unreachable!("Enqueue always yields Enqueued or Error"),
        }
    }

    pub async fn drain_batch(&self, limit: i64) -> Result<Vec<PendingOperation>, CoreError> {
        match self.actor.ask(QueueRequest::DrainBatch { limit }).await? {
            QueueResponse::Drained(ops) => Ok(ops),
            QueueResponse::Error(err) => Err(err),
            _ => unreachable!("DrainBatch always yields Drained or Error"),
        }
    }

    pub async fn mark_delivered(&self, id: PendingOperationId) -> Result<(), CoreError> {
        match self.actor.ask(QueueRequest::MarkDelivered { id }).await? {
            QueueResponse::Acked => Ok(()),
            QueueResponse::Error(err) => Err(err),
            _ => unreachable!("MarkDelivered always yields Acked or Error"),
        }
    }

    pub async fn mark_failed(&self, id: PendingOperationId, error: String) -> Result<PendingOperation, CoreError> {
        match self.actor.ask(QueueRequest::MarkFailed { id, error }).await? {
            QueueResponse::Marked(op) => Ok(op),
            QueueResponse::Error(err) => Err(err),
            _ => unreachable!("MarkFailed always yields Marked or Error"),
        }
    }

    pub async fn purge_expired(&self) -> Result<u64, CoreError> {
        match self.actor.ask(QueueRequest::PurgeExpired).await? {
            QueueResponse::Purged(count) => Ok(count),
            QueueResponse::Error(err) => Err(err),
            _ => unreachable!("PurgeExpired always yields Purged or Error"),
        }
    }
}
