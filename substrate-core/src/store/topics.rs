use async_trait::async_trait;
use sqlx::{FromRow, Row, SqlitePool};

use substrate_contracts::{StoreError, TopicStore};
use substrate_model::{AgentId, SubscriptionId, Topic, TopicId, TopicType};

use super::map_sqlx_err;

#[derive(FromRow)]
struct TopicRow {
    id: i64,
    name: String,
    topic_type: String,
    retention_seconds: i64,
}

impl TryFrom<TopicRow> for Topic {
    type Error = StoreError;

    fn try_from(row: TopicRow) -> Result<Self, Self::Error> {
        Ok(Topic {
            id: TopicId(row.id),
            name: row.name,
            topic_type: TopicType::parse(&row.topic_type).ok_or(StoreError::Io(
                "unrecognized topic_type in storage".to_string(),
            ))?,
            retention_seconds: row.retention_seconds,
        })
    }
}

pub struct SqliteTopicStore {
    pool: SqlitePool,
}

impl SqliteTopicStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TopicStore for SqliteTopicStore {
    async fn ensure_direct_inbox(
        &self,
        _agent_id: AgentId,
        agent_name: &str,
    ) -> Result<TopicId, StoreError> {
        let name = Topic::direct_inbox_name(agent_name);
        let topic = self
            .get_or_create_topic(
                &name,
                TopicType::Direct,
                Some(substrate_model::topic::DEFAULT_RETENTION_SECONDS),
            )
            .await?;
        Ok(topic.id)
    }

    async fn get_or_create_topic(
        &self,
        name: &str,
        topic_type: TopicType,
        retention_seconds: Option<i64>,
    ) -> Result<Topic, StoreError> {
        if let Some(topic) = self.get_topic_by_name(name).await? {
            return Ok(topic);
        }
        let retention =
            retention_seconds.unwrap_or(substrate_model::topic::DEFAULT_RETENTION_SECONDS);
        let result = sqlx::query(
            "INSERT INTO topics (name, topic_type, retention_seconds) VALUES (?, ?, ?)",
        )
        .bind(name)
        .bind(topic_type.as_str())
        .bind(retention)
        .execute(&self.pool)
        .await;

        match result {
            Ok(result) => self
                .get_topic(TopicId(result.last_insert_rowid()))
                .await?
                .ok_or(StoreError::NotFound),
            Err(err) if matches!(map_sqlx_err(err), StoreError::Conflict { .. }) => self
                .get_topic_by_name(name)
                .await?
                .ok_or(StoreError::NotFound),
            Err(err) => Err(map_sqlx_err(err)),
        }
    }

    async fn get_topic(&self, id: TopicId) -> Result<Option<Topic>, StoreError> {
        let row = sqlx::query_as::<_, TopicRow>("SELECT * FROM topics WHERE id = ?")
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_err)?;
        row.map(Topic::try_from).transpose()
    }

    async fn get_topic_by_name(&self, name: &str) -> Result<Option<Topic>, StoreError> {
        let row = sqlx::query_as::<_, TopicRow>("SELECT * FROM topics WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_err)?;
        row.map(Topic::try_from).transpose()
    }

    async fn list_topics(&self) -> Result<Vec<Topic>, StoreError> {
        let rows = sqlx::query_as::<_, TopicRow>("SELECT * FROM topics ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_err)?;
        rows.into_iter().map(Topic::try_from).collect()
    }

    async fn subscribe(
        &self,
        agent_id: AgentId,
        topic_id: TopicId,
    ) -> Result<SubscriptionId, StoreError> {
        let result =
            sqlx::query("INSERT INTO subscriptions (agent_id, topic_id) VALUES (?, ?)")
                .bind(agent_id.get())
                .bind(topic_id.get())
                .execute(&self.pool)
                .await;

        match result {
            Ok(result) => Ok(SubscriptionId(result.last_insert_rowid())),
            Err(err) if matches!(map_sqlx_err(err), StoreError::Conflict { .. }) => {
                let row = sqlx::query(
                    "SELECT id FROM subscriptions WHERE agent_id = ? AND topic_id = ?",
                )
                .bind(agent_id.get())
                .bind(topic_id.get())
                .fetch_one(&self.pool)
                .await
                .map_err(map_sqlx_err)?;
                let id: i64 = row.try_get("id").map_err(map_sqlx_err)?;
                Ok(SubscriptionId(id))
            }
            Err(err) => Err(map_sqlx_err(err)),
        }
    }

    async fn unsubscribe(&self, agent_id: AgentId, topic_id: TopicId) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM subscriptions WHERE agent_id = ? AND topic_id = ?")
            .bind(agent_id.get())
            .bind(topic_id.get())
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_err)?;
        Ok(())
    }

    async fn list_subscribers(&self, topic_id: TopicId) -> Result<Vec<AgentId>, StoreError> {
        let rows = sqlx::query("SELECT agent_id FROM subscriptions WHERE topic_id = ?")
            .bind(topic_id.get())
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_err)?;
        rows.into_iter()
            .map(|row| row.try_get("agent_id").map(AgentId).map_err(map_sqlx_err))
            .collect()
    }

    async fn list_subscriptions(&self, agent_id: AgentId) -> Result<Vec<TopicId>, StoreError> {
        let rows = sqlx::query("SELECT topic_id FROM subscriptions WHERE agent_id = ?")
            .bind(agent_id.get())
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_err)?;
        rows.into_iter()
            .map(|row| row.try_get("topic_id").map(TopicId).map_err(map_sqlx_err))
            .collect()
    }
}
