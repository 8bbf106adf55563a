//! Repository port for agent identity and session binding.

use async_trait::async_trait;

use substrate_model::{Agent, AgentId, SessionId, SessionIdentity};

use crate::error::StoreError;

/// Repository port for agent registration and session identity.
///
/// Implementations live in infra adapters (`substrate-core::store`) and
/// must not leak infra types into domain/application layers.
#[async_trait]
pub trait AgentStore: Send + Sync {
    /// Register a new agent, or return the existing one if `name` is already
    /// taken (registration is idempotent by name).
    async fn get_or_create_agent(&self, name: &str) -> Result<Agent, StoreError>;

    /// Fetch an agent by id.
    async fn get_agent(&self, id: AgentId) -> Result<Option<Agent>, StoreError>;

    /// Fetch an agent by name.
    async fn get_agent_by_name(&self, name: &str) -> Result<Option<Agent>, StoreError>;

    /// List every registered agent, most recently active first.
    async fn list_agents(&self) -> Result<Vec<Agent>, StoreError>;

    /// Update mutable context fields (`project_key`, `git_branch`, `purpose`,
    /// `working_dir`, `hostname`) and bump `last_active_at`.
    async fn update_agent_context(
        &self,
        id: AgentId,
        project_key: Option<String>,
        git_branch: Option<String>,
        purpose: Option<String>,
        working_dir: Option<String>,
        hostname: Option<String>,
    ) -> Result<Agent, StoreError>;

    /// Bump `last_active_at` to now without touching any other field.
    async fn touch_last_active(&self, id: AgentId) -> Result<(), StoreError>;

    /// Bind an external session id to an agent, recording the project/branch
    /// context observed at bind time. Upsert on `session_id`.
    async fn upsert_session_identity(&self, identity: SessionIdentity) -> Result<(), StoreError>;

    /// Resolve an external session id back to its bound agent.
    async fn get_agent_by_session(
        &self,
        session_id: &SessionId,
    ) -> Result<Option<Agent>, StoreError>;
}
