//! Process-wide wiring: opens both stores, constructs every repository
//! adapter, spawns every actor, and hands back one `System` handle plus a
//! `Supervisor` for orderly shutdown. Grounded on the teacher's top-level
//! `AppState`/service-construction sequence in `ferrex-server/src/main.rs`.

use std::sync::Arc;

use substrate_config::Config;
use substrate_contracts::{ActivityStore, AgentStore, MessageStore, OfflineQueueStore, ReviewStore, TaskStore, TopicStore};

use crate::mail::{spawn_retention_sweeper, spawn_snooze_sweeper, MailServiceHandle};
use crate::notify::NotificationHubHandle;
use crate::offline_queue::{spawn_drainer, OfflineQueueHandle};
use crate::review::ReviewOrchestratorHandle;
use crate::runtime::{Supervisor, DEFAULT_DRAIN_TIMEOUT, REVIEWER_DRAIN_TIMEOUT};
use crate::store::{
    open_main_pool, open_queue_pool, PoolOpenError, SqliteActivityStore, SqliteAgentStore,
    SqliteMessageStore, SqliteOfflineQueueStore, SqliteReviewStore, SqliteTaskStore,
    SqliteTopicStore,
};
use crate::tasks::TaskService;

/// Every service a wire adapter (`substrate-server`) needs a handle to.
#[derive(Clone)]
pub struct System {
    pub mail: MailServiceHandle,
    pub notifications: NotificationHubHandle,
    pub reviews: ReviewOrchestratorHandle,
    pub offline_queue: OfflineQueueHandle,
    pub tasks: TaskService,
    pub agents: Arc<dyn AgentStore>,
    pub topics: Arc<dyn TopicStore>,
}

impl System {
    /// Opens both pools, builds every store and actor, and starts the
    /// background sweepers/drainer. Returns the system handle plus a
    /// `Supervisor` the caller must `shutdown_all` on process exit.
    pub async fn start(config: &Config) -> Result<(Self, Supervisor), PoolOpenError> {
        let main_pool = open_main_pool(&config.db.path, config.db.snapshot_before_migrate).await?;
        let queue_pool = open_queue_pool(&config.queue.path).await?;

        let messages: Arc<dyn MessageStore> = Arc::new(SqliteMessageStore::new(main_pool.clone()));
        let topics: Arc<dyn TopicStore> = Arc::new(SqliteTopicStore::new(main_pool.clone()));
        let agents: Arc<dyn AgentStore> = Arc::new(SqliteAgentStore::new(main_pool.clone()));
        let activity: Arc<dyn ActivityStore> = Arc::new(SqliteActivityStore::new(main_pool.clone()));
        let reviews_store: Arc<dyn ReviewStore> = Arc::new(SqliteReviewStore::new(main_pool.clone()));
        let tasks_store: Arc<dyn TaskStore> = Arc::new(SqliteTaskStore::new(main_pool.clone()));
        let queue_store: Arc<dyn OfflineQueueStore> = Arc::new(SqliteOfflineQueueStore::new(queue_pool));

        let mut supervisor = Supervisor::new();

        let (hub, hub_join) = NotificationHubHandle::spawn_with_capacity(
            config.notification.channel_capacity,
            config.notification.max_consecutive_drops,
        );
        supervisor.register("notification-hub", hub_join, DEFAULT_DRAIN_TIMEOUT);

        let notifier: Arc<dyn substrate_contracts::NotificationSink> = Arc::new(hub.clone());

        let (mail, mail_join) =
            MailServiceHandle::spawn(messages, topics.clone(), agents.clone(), activity, notifier.clone());
        supervisor.register("mail-service", mail_join, DEFAULT_DRAIN_TIMEOUT);

        let (reviews, reviews_join) = ReviewOrchestratorHandle::spawn(reviews_store, notifier).await;
        supervisor.register("review-orchestrator", reviews_join, REVIEWER_DRAIN_TIMEOUT);

        let (offline_queue, queue_join) = OfflineQueueHandle::spawn(queue_store, config.queue.max_queue_size);
        supervisor.register("offline-queue", queue_join, DEFAULT_DRAIN_TIMEOUT);

        let tasks = TaskService::new(tasks_store);

        spawn_snooze_sweeper(mail.clone(), config.retention.snooze_sweep_interval);
        spawn_retention_sweeper(mail.clone(), config.retention.retention_sweep_interval);
        spawn_drainer(
            offline_queue.clone(),
            mail.clone(),
            config.queue.drain_interval,
            config.queue.drain_batch_size,
        );

        Ok((
            System {
                mail,
                notifications: hub,
                reviews,
                offline_queue,
                tasks,
                agents,
                topics,
            },
            supervisor,
        ))
    }
}
