//! `SUBSTRATE_`-prefixed environment variable overlay, applied after the
//! TOML file and before CLI flags per spec §6 precedence order.

use std::env;

pub struct EnvOverlay {
    pub http_host: Option<String>,
    pub http_port: Option<u16>,
    pub db_path: Option<String>,
    pub queue_path: Option<String>,
    pub log_level: Option<String>,
    pub log_dir: Option<String>,
}

fn var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl EnvOverlay {
    pub fn from_process_env() -> Self {
        EnvOverlay {
            http_host: var("SUBSTRATE_HTTP_HOST"),
            http_port: var("SUBSTRATE_HTTP_PORT").and_then(|v| v.parse().ok()),
            db_path: var("SUBSTRATE_DB_PATH"),
            queue_path: var("SUBSTRATE_QUEUE_PATH"),
            log_level: var("SUBSTRATE_LOG_LEVEL"),
            log_dir: var("SUBSTRATE_LOG_DIR"),
        }
    }
}
