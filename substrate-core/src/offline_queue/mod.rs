//! Offline write-behind queue: physically separate store, idempotent
//! replay against the Mail service (spec §4.7).

mod drainer;
mod payload;
mod service;

pub use drainer::spawn_drainer;
pub use payload::{QueuedPublish, QueuedSend};
pub use service::{OfflineQueueHandle, QueueRequest, QueueResponse};
