//! Pool construction and migration, mirroring
//! `ferrex-core/src/database/postgres.rs`'s open-and-migrate sequence but
//! against SQLite with WAL mode.

use std::path::Path;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum PoolOpenError {
    #[error("failed to connect: {0}")]
    Connect(#[from] sqlx::Error),
    #[error("failed to snapshot database before migrating: {0}")]
    Snapshot(#[source] std::io::Error),
    #[error("migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

/// Open the main store, applying forward-only migrations on connect. When
/// `snapshot_before_migrate` is set, a `.bak-<n>` copy of the database file
/// is taken first (spec §3 "Schema migrations").
pub async fn open_main_pool(
    path: &Path,
    snapshot_before_migrate: bool,
) -> Result<SqlitePool, PoolOpenError> {
    if snapshot_before_migrate && path.exists() {
        snapshot(path)?;
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(PoolOpenError::Snapshot)?;
    }

    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

    let pool = SqlitePoolOptions::new()
        .max_connections(8)
        .connect_with(options)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;
    info!(path = %path.display(), "main store ready");
    Ok(pool)
}

/// Open the offline queue's physically separate store (spec §4.7).
pub async fn open_queue_pool(path: &Path) -> Result<SqlitePool, PoolOpenError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(PoolOpenError::Snapshot)?;
    }

    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

    let pool = SqlitePoolOptions::new()
        .max_connections(4)
        .connect_with(options)
        .await?;

    sqlx::migrate!("./migrations_queue").run(&pool).await?;
    info!(path = %path.display(), "offline queue store ready");
    Ok(pool)
}

fn snapshot(path: &Path) -> Result<(), PoolOpenError> {
    let mut n = 0u32;
    loop {
        let candidate = path.with_extension(format!("db.bak-{n}"));
        if !candidate.exists() {
            std::fs::copy(path, &candidate).map_err(PoolOpenError::Snapshot)?;
            return Ok(());
        }
        n += 1;
    }
}
