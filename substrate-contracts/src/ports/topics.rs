//! Repository port for topics and subscriptions.

use async_trait::async_trait;

use substrate_model::{AgentId, SubscriptionId, Topic, TopicId, TopicType};

use crate::error::StoreError;

/// Repository port for topic creation, lookup and subscription management.
#[async_trait]
pub trait TopicStore: Send + Sync {
    /// Fetch or create the given agent's direct inbox topic
    /// (`agent/<name>/inbox`), per spec §3 "Direct inbox auto-creation".
    async fn ensure_direct_inbox(&self, agent_id: AgentId, agent_name: &str)
    -> Result<TopicId, StoreError>;

    /// Fetch or create a named topic of the given type. `retention_seconds`
    /// is only consulted on creation.
    async fn get_or_create_topic(
        &self,
        name: &str,
        topic_type: TopicType,
        retention_seconds: Option<i64>,
    ) -> Result<Topic, StoreError>;

    async fn get_topic(&self, id: TopicId) -> Result<Option<Topic>, StoreError>;

    async fn get_topic_by_name(&self, name: &str) -> Result<Option<Topic>, StoreError>;

    async fn list_topics(&self) -> Result<Vec<Topic>, StoreError>;

    /// Subscribe an agent to a topic. Idempotent: subscribing twice returns
    /// the existing subscription id rather than erroring.
    async fn subscribe(
        &self,
        agent_id: AgentId,
        topic_id: TopicId,
    ) -> Result<SubscriptionId, StoreError>;

    async fn unsubscribe(&self, agent_id: AgentId, topic_id: TopicId) -> Result<(), StoreError>;

    async fn list_subscribers(&self, topic_id: TopicId) -> Result<Vec<AgentId>, StoreError>;

    async fn list_subscriptions(&self, agent_id: AgentId) -> Result<Vec<TopicId>, StoreError>;
}
