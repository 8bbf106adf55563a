//! `~/.substrate/config.toml` shape. Every field optional: only values the
//! user actually set should override the built-in defaults.

use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FileConfig {
    pub server: Option<FileServerConfig>,
    pub db: Option<FileDbConfig>,
    pub queue: Option<FileQueueConfig>,
    pub notification: Option<FileNotificationConfig>,
    pub retention: Option<FileRetentionConfig>,
    pub log: Option<FileLogConfig>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FileServerConfig {
    pub http_host: Option<String>,
    pub http_port: Option<u16>,
    pub enable_stdio: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FileDbConfig {
    pub path: Option<String>,
    pub snapshot_before_migrate: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FileQueueConfig {
    pub path: Option<String>,
    pub drain_interval: Option<String>,
    pub drain_batch_size: Option<i64>,
    pub max_queue_size: Option<i64>,
    pub max_attempts: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FileNotificationConfig {
    pub channel_capacity: Option<usize>,
    pub max_consecutive_drops: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FileRetentionConfig {
    pub snooze_sweep_interval: Option<String>,
    pub retention_sweep_interval: Option<String>,
    pub activity_log_retention: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FileLogConfig {
    pub level: Option<String>,
    pub dir: Option<String>,
}
