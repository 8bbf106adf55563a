//! Repository ports. One trait per bounded context, mirroring the teacher's
//! `database::repository_ports` split (`library.rs`, `media.rs`, ...).

pub mod activity;
pub mod agents;
pub mod messages;
pub mod queue;
pub mod reviews;
pub mod tasks;
pub mod topics;

pub use activity::ActivityStore;
pub use agents::AgentStore;
pub use messages::{AgentStatus, InsertedMessage, MessageStore, NewMessage};
pub use queue::OfflineQueueStore;
pub use reviews::ReviewStore;
pub use tasks::TaskStore;
pub use topics::TopicStore;
