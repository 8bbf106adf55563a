//! SQLite-backed implementations of the repository ports declared in
//! `substrate-contracts`. Grounded on the teacher's
//! `database::infrastructure::postgres::repositories` split — one struct per
//! bounded context, each wrapping a pool and implementing one port trait —
//! generalized from Postgres to SQLite (spec §4.1 "single-file embedded
//! store").
//!
//! Deliberately uses `sqlx::query`/`query_as` with runtime-bound parameters
//! rather than the `sqlx::query!` compile-time macro family the teacher
//! favors: the macros require a live database or a checked `.sqlx` metadata
//! cache at compile time, which this workspace does not provision.

mod activity;
mod agents;
mod messages;
mod pool;
mod queue;
mod reviews;
mod tasks;
mod topics;

pub use activity::SqliteActivityStore;
pub use agents::SqliteAgentStore;
pub use messages::SqliteMessageStore;
pub use pool::{open_main_pool, open_queue_pool, PoolOpenError};
pub use queue::SqliteOfflineQueueStore;
pub use reviews::SqliteReviewStore;
pub use tasks::SqliteTaskStore;
pub use topics::SqliteTopicStore;

use substrate_contracts::StoreError;

/// Map a backend error onto the storage-agnostic taxonomy at the port
/// boundary (spec §4.1 "Error semantics"), the same place the teacher maps
/// `sqlx::Error` into `MediaError`.
pub(crate) fn map_sqlx_err(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::RowNotFound => StoreError::NotFound,
        sqlx::Error::Database(db_err) => {
            if db_err.is_unique_violation() {
                StoreError::Conflict { field: "unique" }
            } else if is_busy_or_locked(db_err.message()) {
                StoreError::Transient(db_err.message().to_string())
            } else {
                StoreError::Io(db_err.message().to_string())
            }
        }
        other => StoreError::Io(other.to_string()),
    }
}

fn is_busy_or_locked(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    lower.contains("database is locked") || lower.contains("database table is locked")
}

pub(crate) fn to_epoch(dt: chrono::DateTime<chrono::Utc>) -> i64 {
    dt.timestamp()
}

pub(crate) fn from_epoch(epoch: i64) -> chrono::DateTime<chrono::Utc> {
    chrono::DateTime::from_timestamp(epoch, 0).unwrap_or_else(chrono::Utc::now)
}
