use async_trait::async_trait;
use chrono::Utc;
use sqlx::{FromRow, Row, SqlitePool};

use substrate_contracts::{AgentStore, StoreError};
use substrate_model::{Agent, AgentId, SessionId, SessionIdentity};

use super::{from_epoch, map_sqlx_err, to_epoch};

#[derive(FromRow)]
struct AgentRow {
    id: i64,
    name: String,
    project_key: Option<String>,
    git_branch: Option<String>,
    current_session: Option<String>,
    purpose: Option<String>,
    working_dir: Option<String>,
    hostname: Option<String>,
    created_at: i64,
    last_active_at: i64,
}

impl From<AgentRow> for Agent {
    fn from(row: AgentRow) -> Self {
        Agent {
            id: AgentId(row.id),
            name: row.name,
            project_key: row.project_key,
            git_branch: row.git_branch,
            current_session: row.current_session.map(SessionId),
            purpose: row.purpose,
            working_dir: row.working_dir,
            hostname: row.hostname,
            created_at: from_epoch(row.created_at),
            last_active_at: from_epoch(row.last_active_at),
        }
    }
}

pub struct SqliteAgentStore {
    pool: SqlitePool,
}

impl SqliteAgentStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AgentStore for SqliteAgentStore {
    async fn get_or_create_agent(&self, name: &str) -> Result<Agent, StoreError> {
        if let Some(agent) = self.get_agent_by_name(name).await? {
            return Ok(agent);
        }
        let now = to_epoch(Utc::now());
        let result = sqlx::query(
            "INSERT INTO agents (name, created_at, last_active_at) VALUES (?, ?, ?)",
        )
        .bind(name)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await;

        match result {
            Ok(result) => {
                let id = AgentId(result.last_insert_rowid());
                self.get_agent(id)
                    .await?
                    .ok_or(StoreError::NotFound)
            }
            Err(err) => {
                // Raced with a concurrent registration of the same name.
                if matches!(map_sqlx_err(err), StoreError::Conflict { .. }) {
                    self.get_agent_by_name(name)
                        .await?
                        .ok_or(StoreError::NotFound)
                } else {
                    Err(StoreError::Transient(format!(
                        "failed to register agent {name}"
                    )))
                }
            }
        }
    }

    async fn get_agent(&self, id: AgentId) -> Result<Option<Agent>, StoreError> {
        sqlx::query_as::<_, AgentRow>("SELECT * FROM agents WHERE id = ?")
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await
            .map(|row| row.map(Agent::from))
            .map_err(map_sqlx_err)
    }

    async fn get_agent_by_name(&self, name: &str) -> Result<Option<Agent>, StoreError> {
        sqlx::query_as::<_, AgentRow>("SELECT * FROM agents WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map(|row| row.map(Agent::from))
            .map_err(map_sqlx_err)
    }

    async fn list_agents(&self) -> Result<Vec<Agent>, StoreError> {
        sqlx::query_as::<_, AgentRow>("SELECT * FROM agents ORDER BY last_active_at DESC")
            .fetch_all(&self.pool)
            .await
            .map(|rows| rows.into_iter().map(Agent::from).collect())
            .map_err(map_sqlx_err)
    }

    async fn update_agent_context(
        &self,
        id: AgentId,
        project_key: Option<String>,
        git_branch: Option<String>,
        purpose: Option<String>,
        working_dir: Option<String>,
        hostname: Option<String>,
    ) -> Result<Agent, StoreError> {
        let now = to_epoch(Utc::now());
        sqlx::query(
            "UPDATE agents SET project_key = ?, git_branch = ?, purpose = ?, working_dir = ?, \
             hostname = ?, last_active_at = ? WHERE id = ?",
        )
        .bind(project_key)
        .bind(git_branch)
        .bind(purpose)
        .bind(working_dir)
        .bind(hostname)
        .bind(now)
        .bind(id.get())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        self.get_agent(id).await?.ok_or(StoreError::NotFound)
    }

    async fn touch_last_active(&self, id: AgentId) -> Result<(), StoreError> {
        let now = to_epoch(Utc::now());
        let result = sqlx::query("UPDATE agents SET last_active_at = ? WHERE id = ?")
            .bind(now)
            .bind(id.get())
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_err)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn upsert_session_identity(&self, identity: SessionIdentity) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO session_identities \
             (session_id, agent_id, project_dir, git_branch, task_list_id, last_active_at) \
             VALUES (?, ?, ?, ?, ?, ?) \
             ON CONFLICT(session_id) DO UPDATE SET \
             agent_id = excluded.agent_id, project_dir = excluded.project_dir, \
             git_branch = excluded.git_branch, task_list_id = excluded.task_list_id, \
             last_active_at = excluded.last_active_at",
        )
        .bind(&identity.session_id.0)
        .bind(identity.agent_id.get())
        .bind(&identity.project_dir)
        .bind(&identity.git_branch)
        .bind(&identity.task_list_id)
        .bind(to_epoch(identity.last_active_at))
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;
        Ok(())
    }

    async fn get_agent_by_session(
        &self,
        session_id: &SessionId,
    ) -> Result<Option<Agent>, StoreError> {
        let row = sqlx::query("SELECT agent_id FROM session_identities WHERE session_id = ?")
            .bind(&session_id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_err)?;
        match row {
            Some(row) => {
                let agent_id: i64 = row.try_get("agent_id").map_err(map_sqlx_err)?;
                self.get_agent(AgentId(agent_id)).await
            }
            None => Ok(None),
        }
    }
}
