//! Trait surfaces and domain contracts built atop `substrate-model`.
//!
//! Repository ports (this crate) describe what storage must provide;
//! implementations live in `substrate-core::store` and must not leak `sqlx`
//! types back across this boundary — the same hexagonal split the teacher
//! codebase uses between `database::repository_ports` and
//! `database::infrastructure`.

pub mod error;
pub mod notification;
pub mod ports;
pub mod review_events;

pub use error::{CoreError, StoreError};
pub use notification::{Notification, NotificationFilter, NotificationSink};
pub use ports::{
    ActivityStore, AgentStatus, AgentStore, InsertedMessage, MessageStore, NewMessage,
    OfflineQueueStore, ReviewStore, TaskStore, TopicStore,
};
pub use review_events::ReviewOrchestratorEvent;
