//! Error taxonomies shared across the store/actor boundary.

use thiserror::Error;

/// Errors raised by a repository port implementation. Storage-agnostic: no
/// `sqlx::Error` variant appears here, so this crate never needs the `sqlx`
/// dependency. Concrete stores (`substrate-core::store`) map their backend's
/// errors into this taxonomy at the port boundary.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found")]
    NotFound,

    #[error("conflict on {field}")]
    Conflict { field: &'static str },

    #[error("transient storage error: {0}")]
    Transient(String),

    #[error("storage io error: {0}")]
    Io(String),

    #[error("migration error: {0}")]
    Migration(String),
}

/// Crate-wide error taxonomy surfaced across actor request/response
/// boundaries, per the "Error handling design" table. One variant maps to
/// one externally observable failure mode; `substrate-server` maps these to
/// HTTP status codes / JSON-RPC error codes at the wire edge.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("invalid state transition: {0}")]
    InvalidTransition(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("transient failure, retry: {0}")]
    Transient(String),

    #[error("queue full")]
    QueueFull,

    #[error("service unavailable: {0}")]
    Unavailable(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for CoreError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound => CoreError::NotFound,
            StoreError::Conflict { field } => CoreError::Conflict(field.to_string()),
            StoreError::Transient(msg) => CoreError::Transient(msg),
            StoreError::Io(msg) => CoreError::Internal(msg),
            StoreError::Migration(msg) => CoreError::Internal(msg),
        }
    }
}
