//! Repository port for the append-only activity log.

use async_trait::async_trait;
#[cfg(feature = "chrono")]
use chrono::{DateTime, Utc};

use substrate_model::{Activity, ActivityType, AgentId};

use crate::error::StoreError;

#[async_trait]
pub trait ActivityStore: Send + Sync {
    async fn append(
        &self,
        agent_id: AgentId,
        activity_type: ActivityType,
        description: &str,
        metadata: Option<Vec<u8>>,
    ) -> Result<Activity, StoreError>;

    async fn list_recent(&self, agent_id: AgentId, limit: i64) -> Result<Vec<Activity>, StoreError>;

    /// Delete rows older than `cutoff`, returning the count removed.
    #[cfg(feature = "chrono")]
    async fn sweep_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError>;
}
