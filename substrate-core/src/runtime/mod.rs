//! Actor runtime shared by every service in this crate: a typed mailbox
//! (`Actor`/`ActorHandle`), a service lookup registry, and supervised
//! shutdown with a per-actor drain timeout.

mod actor;
mod registry;
mod supervisor;

pub use actor::{spawn_actor, Actor, ActorHandle, DEFAULT_MAILBOX_CAPACITY};
pub use registry::ServiceRegistry;
pub use supervisor::{Supervisor, DEFAULT_DRAIN_TIMEOUT, REVIEWER_DRAIN_TIMEOUT};
