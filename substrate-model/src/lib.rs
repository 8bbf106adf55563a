//! Shared data models for the Substrate agent messaging core.
//!
//! Types here are intentionally storage-agnostic: no `sqlx` dependency, no
//! query logic. Row mapping from raw SQL results happens in
//! `substrate-core::store`, behind the repository ports declared in
//! `substrate-contracts`.

pub mod activity;
pub mod agent;
pub mod ids;
pub mod message;
pub mod offset;
pub mod queue;
pub mod review;
pub mod session;
pub mod task;
pub mod topic;

pub use activity::{Activity, ActivityType};
pub use agent::Agent;
pub use ids::{
    AgentId, MessageId, PendingOperationId, ReviewId, SessionId, SubscriptionId, TaskListId,
    ThreadId, TopicId,
};
pub use message::{InboxFilter, Message, MessageRecipient, Priority, RecipientState};
pub use offset::ConsumerOffset;
pub use queue::{OperationType, PendingOperation, QueueStatus};
pub use review::{
    PlanReview, PlanReviewState, Review, ReviewDecision, ReviewIssue, ReviewIteration,
    ReviewPriority, ReviewState, ReviewType,
};
pub use session::SessionIdentity;
pub use task::{Task, TaskList, TaskStatus};
pub use topic::{Subscription, Topic, TopicType};
