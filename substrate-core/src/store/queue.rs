use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, Row, SqlitePool};
use uuid::Uuid;

use substrate_contracts::{OfflineQueueStore, StoreError};
use substrate_model::{OperationType, PendingOperation, PendingOperationId, QueueStatus};

use super::{from_epoch, map_sqlx_err, to_epoch};

#[derive(FromRow)]
struct PendingOperationRow {
    id: String,
    idempotency_key: String,
    operation_type: String,
    payload: Vec<u8>,
    agent_name: String,
    session_id: Option<String>,
    created_at: i64,
    expires_at: i64,
    attempts: i64,
    last_error: Option<String>,
    status: String,
}

impl TryFrom<PendingOperationRow> for PendingOperation {
    type Error = StoreError;

    fn try_from(row: PendingOperationRow) -> Result<Self, Self::Error> {
        Ok(PendingOperation {
            id: PendingOperationId(
                Uuid::parse_str(&row.id)
                    .map_err(|_| StoreError::Io("malformed pending_operation id in storage".to_string()))?,
            ),
            idempotency_key: row.idempotency_key,
            operation_type: OperationType::parse(&row.operation_type).ok_or_else(|| {
                StoreError::Io("unrecognized operation_type in storage".to_string())
            })?,
            payload: row.payload,
            agent_name: row.agent_name,
            session_id: row.session_id,
            created_at: from_epoch(row.created_at),
            expires_at: from_epoch(row.expires_at),
            attempts: row.attempts,
            last_error: row.last_error,
            status: QueueStatus::parse(&row.status)
                .ok_or_else(|| StoreError::Io("unrecognized queue status in storage".to_string()))?,
        })
    }
}

pub struct SqliteOfflineQueueStore {
    pool: SqlitePool,
}

impl SqliteOfflineQueueStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn get(&self, id: PendingOperationId) -> Result<PendingOperation, StoreError> {
        let row = sqlx::query_as::<_, PendingOperationRow>(
            "SELECT * FROM pending_operations WHERE id = ?",
        )
        .bind(id.0.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?
        .ok_or(StoreError::NotFound)?;
        PendingOperation::try_from(row)
    }

    async fn find_by_idempotency_key(
        &self,
        key: &str,
    ) -> Result<Option<PendingOperation>, StoreError> {
        let row = sqlx::query_as::<_, PendingOperationRow>(
            "SELECT * FROM pending_operations WHERE idempotency_key = ?",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;
        row.map(PendingOperation::try_from).transpose()
    }
}

#[async_trait]
impl OfflineQueueStore for SqliteOfflineQueueStore {
    async fn enqueue(
        &self,
        idempotency_key: String,
        operation_type: OperationType,
        payload: Vec<u8>,
        agent_name: String,
        session_id: Option<String>,
        expires_at: DateTime<Utc>,
    ) -> Result<PendingOperation, StoreError> {
        // `idempotency_key` is globally unique in the queue (spec §4.7
        // invariant); unlike message-row idempotency, a duplicate enqueue
        // is rejected rather than silently handed the existing row back.
        if self.find_by_idempotency_key(&idempotency_key).await?.is_some() {
            return Err(StoreError::Conflict { field: "idempotency_key" });
        }

        let id = PendingOperationId::new();
        let now = to_epoch(Utc::now());
        let result = sqlx::query(
            "INSERT INTO pending_operations \
             (id, idempotency_key, operation_type, payload, agent_name, session_id, \
              created_at, expires_at, attempts, last_error, status, enqueued_seq) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, 0, NULL, ?, \
             (SELECT COALESCE(MAX(enqueued_seq), 0) + 1 FROM pending_operations))",
        )
        .bind(id.0.to_string())
        .bind(&idempotency_key)
        .bind(operation_type.as_str())
        .bind(&payload)
        .bind(&agent_name)
        .bind(&session_id)
        .bind(now)
        .bind(to_epoch(expires_at))
        .bind(QueueStatus::Pending.as_str())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => self.get(id).await,
            // A concurrent enqueue won the race between the check above and
            // this insert; still a duplicate, still rejected.
            Err(err) => match map_sqlx_err(err) {
                StoreError::Conflict { .. } => Err(StoreError::Conflict { field: "idempotency_key" }),
                other => Err(other),
            },
        }
    }

    async fn drain_batch(&self, limit: i64) -> Result<Vec<PendingOperation>, StoreError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_err)?;

        let rows = sqlx::query_as::<_, PendingOperationRow>(
            "SELECT * FROM pending_operations WHERE status = 'pending' \
             ORDER BY enqueued_seq LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&mut *tx)
        .await
        .map_err(map_sqlx_err)?;

        for row in &rows {
            sqlx::query("UPDATE pending_operations SET status = 'delivering' WHERE id = ?")
                .bind(&row.id)
                .execute(&mut *tx)
                .await
                .map_err(map_sqlx_err)?;
        }

        tx.commit().await.map_err(map_sqlx_err)?;

        rows.into_iter()
            .map(|row| {
                PendingOperation::try_from(PendingOperationRow {
                    status: "delivering".to_string(),
                    ..row
                })
            })
            .collect()
    }

    async fn mark_delivered(&self, id: PendingOperationId) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE pending_operations SET status = 'delivered' WHERE id = ?")
            .bind(id.0.to_string())
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_err)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn mark_failed(
        &self,
        id: PendingOperationId,
        error: &str,
    ) -> Result<PendingOperation, StoreError> {
        // Returns to `pending` so the drainer's own backoff/retry loop picks
        // it back up; `purge_expired` is what eventually reaps a row that
        // keeps failing past its `expires_at`.
        let result = sqlx::query(
            "UPDATE pending_operations SET status = 'pending', attempts = attempts + 1, \
             last_error = ? WHERE id = ?",
        )
        .bind(error)
        .bind(id.0.to_string())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        self.get(id).await
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        // `delivering`/`delivered` rows are excluded: a row mid-delivery
        // whose `expires_at` happens to pass must not be reaped out from
        // under the drainer (spec §4.7 "PurgeExpired").
        let result = sqlx::query(
            "DELETE FROM pending_operations WHERE expires_at < ? AND status IN ('pending', 'failed')",
        )
        .bind(to_epoch(now))
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;
        Ok(result.rows_affected())
    }

    async fn count_by_status(&self, status: QueueStatus) -> Result<i64, StoreError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM pending_operations WHERE status = ?")
            .bind(status.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_err)?;
        row.try_get("n").map_err(map_sqlx_err)
    }
}
