use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};

use substrate_contracts::{ActivityStore, StoreError};
use substrate_model::{Activity, ActivityType, AgentId};

use super::{from_epoch, map_sqlx_err, to_epoch};

#[derive(FromRow)]
struct ActivityRow {
    id: i64,
    agent_id: i64,
    activity_type: String,
    description: String,
    metadata: Option<Vec<u8>>,
    created_at: i64,
}

impl TryFrom<ActivityRow> for Activity {
    type Error = StoreError;

    fn try_from(row: ActivityRow) -> Result<Self, Self::Error> {
        Ok(Activity {
            id: row.id,
            agent_id: AgentId(row.agent_id),
            activity_type: ActivityType::parse(&row.activity_type)
                .ok_or_else(|| StoreError::Io("unrecognized activity_type in storage".to_string()))?,
            description: row.description,
            metadata: row.metadata,
            created_at: from_epoch(row.created_at),
        })
    }
}

pub struct SqliteActivityStore {
    pool: SqlitePool,
}

impl SqliteActivityStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ActivityStore for SqliteActivityStore {
    async fn append(
        &self,
        agent_id: AgentId,
        activity_type: ActivityType,
        description: &str,
        metadata: Option<Vec<u8>>,
    ) -> Result<Activity, StoreError> {
        let now = to_epoch(Utc::now());
        let result = sqlx::query(
            "INSERT INTO activities (agent_id, activity_type, description, metadata, created_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(agent_id.get())
        .bind(activity_type.as_str())
        .bind(description)
        .bind(&metadata)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        let row = sqlx::query_as::<_, ActivityRow>("SELECT * FROM activities WHERE id = ?")
            .bind(result.last_insert_rowid())
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_err)?;
        Activity::try_from(row)
    }

    async fn list_recent(&self, agent_id: AgentId, limit: i64) -> Result<Vec<Activity>, StoreError> {
        let rows = sqlx::query_as::<_, ActivityRow>(
            "SELECT * FROM activities WHERE agent_id = ? ORDER BY created_at DESC LIMIT ?",
        )
        .bind(agent_id.get())
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;
        rows.into_iter().map(Activity::try_from).collect()
    }

    async fn sweep_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM activities WHERE created_at < ?")
            .bind(to_epoch(cutoff))
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_err)?;
        Ok(result.rows_affected())
    }
}
