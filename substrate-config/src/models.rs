//! Effective configuration, assembled by [`crate::loader::ConfigLoader`].

use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub db: DbConfig,
    pub queue: QueueConfig,
    pub notification: NotificationConfig,
    pub retention: RetentionConfig,
    pub log: LogConfig,
}

/// Listen addresses for the thin wire adapters (spec §4.8). `stdio` has no
/// address: it is enabled/disabled only.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub http_host: String,
    pub http_port: u16,
    pub enable_stdio: bool,
}

#[derive(Debug, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
    pub snapshot_before_migrate: bool,
}

/// Physically separate from `db` (spec §4.7 — a stuck main store must not
/// also jam queued writes).
#[derive(Debug, Clone)]
pub struct QueueConfig {
    pub path: PathBuf,
    pub drain_interval: Duration,
    pub drain_batch_size: i64,
    pub max_queue_size: i64,
    pub max_attempts: u32,
}

#[derive(Debug, Clone)]
pub struct NotificationConfig {
    pub channel_capacity: usize,
    pub max_consecutive_drops: u32,
}

#[derive(Debug, Clone)]
pub struct RetentionConfig {
    pub snooze_sweep_interval: Duration,
    pub retention_sweep_interval: Duration,
    pub activity_log_retention: Duration,
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: String,
    pub dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                http_host: "127.0.0.1".to_string(),
                http_port: 8731,
                enable_stdio: true,
            },
            db: DbConfig {
                path: PathBuf::from("~/.substrate/substrate.db"),
                snapshot_before_migrate: false,
            },
            queue: QueueConfig {
                path: PathBuf::from("~/.substrate/queue.db"),
                drain_interval: Duration::from_secs(2),
                drain_batch_size: 32,
                max_queue_size: 10_000,
                max_attempts: 8,
            },
            notification: NotificationConfig {
                channel_capacity: 256,
                max_consecutive_drops: 3,
            },
            retention: RetentionConfig {
                snooze_sweep_interval: Duration::from_secs(30),
                retention_sweep_interval: Duration::from_secs(300),
                activity_log_retention: Duration::from_secs(30 * 24 * 60 * 60),
            },
            log: LogConfig {
                level: "info".to_string(),
                dir: None,
            },
        }
    }
}
