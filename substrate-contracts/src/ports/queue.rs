//! Repository port for the offline write-behind queue (spec §4.7).
//!
//! Deliberately distinct from `MessageStore`: the offline queue is backed by
//! a physically separate `SqlitePool` (its own file, its own migrations) so
//! an outage in the main store cannot also jam queued writes.

use async_trait::async_trait;
#[cfg(feature = "chrono")]
use chrono::{DateTime, Utc};

use substrate_model::{OperationType, PendingOperation, PendingOperationId, QueueStatus};

use crate::error::StoreError;

#[async_trait]
pub trait OfflineQueueStore: Send + Sync {
    /// Enqueue an operation. Idempotent on `idempotency_key`: enqueuing the
    /// same key twice returns the existing row rather than duplicating it.
    async fn enqueue(
        &self,
        idempotency_key: String,
        operation_type: OperationType,
        payload: Vec<u8>,
        agent_name: String,
        session_id: Option<String>,
        #[cfg(feature = "chrono")] expires_at: DateTime<Utc>,
        #[cfg(not(feature = "chrono"))] expires_at: i64,
    ) -> Result<PendingOperation, StoreError>;

    /// Fetch up to `limit` `Pending` rows in FIFO order and mark them
    /// `Delivering` in the same call, so two concurrent drainers cannot pick
    /// up the same row.
    async fn drain_batch(&self, limit: i64) -> Result<Vec<PendingOperation>, StoreError>;

    async fn mark_delivered(&self, id: PendingOperationId) -> Result<(), StoreError>;

    /// Record a failed delivery attempt. Callers apply backoff externally;
    /// this just increments `attempts` and stores `last_error`.
    async fn mark_failed(&self, id: PendingOperationId, error: &str) -> Result<PendingOperation, StoreError>;

    #[cfg(feature = "chrono")]
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError>;

    async fn count_by_status(&self, status: QueueStatus) -> Result<i64, StoreError>;
}
