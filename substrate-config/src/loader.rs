//! Layered config composition: built-in defaults → `~/.substrate/config.toml`
//! → `SUBSTRATE_`-prefixed env vars → CLI flags, each layer only overriding
//! fields it actually sets. Mirrors the ascending-priority composition the
//! teacher's `ConfigLoader` applies to `EnvConfig` / `FileDatabaseConfig`.

use std::path::PathBuf;

use crate::cli::CliArgs;
use crate::env::EnvOverlay;
use crate::error::ConfigLoadError;
use crate::file::FileConfig;
use crate::models::Config;
use crate::util::{default_config_path, expand_tilde};

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load `.env` (if present, via `dotenvy`), then compose the layers in
    /// ascending priority. `cli` is the already-parsed CLI args so callers
    /// can attach their own `clap::Command` wrapper if desired.
    pub fn load(cli: &CliArgs) -> Result<Config, ConfigLoadError> {
        let _ = dotenvy::dotenv();

        let mut config = Config::default();

        let file_path = cli.config.clone().unwrap_or_else(default_config_path);
        if let Some(file) = Self::read_file(&file_path)? {
            Self::apply_file(&mut config, file)?;
        }

        Self::apply_env(&mut config, EnvOverlay::from_process_env())?;
        Self::apply_cli(&mut config, cli);

        config.db.path = expand_tilde("db.path", &config.db.path)?;
        config.queue.path = expand_tilde("queue.path", &config.queue.path)?;
        if let Some(dir) = config.log.dir.clone() {
            config.log.dir = Some(expand_tilde("log.dir", &dir)?);
        }

        Ok(config)
    }

    fn read_file(path: &PathBuf) -> Result<Option<FileConfig>, ConfigLoadError> {
        match std::fs::read_to_string(path) {
            Ok(contents) => {
                let parsed: FileConfig =
                    toml::from_str(&contents).map_err(|source| ConfigLoadError::Toml {
                        path: path.clone(),
                        source,
                    })?;
                Ok(Some(parsed))
            }
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(ConfigLoadError::FileIo {
                path: path.clone(),
                source,
            }),
        }
    }

    fn apply_file(config: &mut Config, file: FileConfig) -> Result<(), ConfigLoadError> {
        if let Some(server) = file.server {
            if let Some(v) = server.http_host {
                config.server.http_host = v;
            }
            if let Some(v) = server.http_port {
                config.server.http_port = v;
            }
            if let Some(v) = server.enable_stdio {
                config.server.enable_stdio = v;
            }
        }
        if let Some(db) = file.db {
            if let Some(v) = db.path {
                config.db.path = PathBuf::from(v);
            }
            if let Some(v) = db.snapshot_before_migrate {
                config.db.snapshot_before_migrate = v;
            }
        }
        if let Some(queue) = file.queue {
            if let Some(v) = queue.path {
                config.queue.path = PathBuf::from(v);
            }
            if let Some(v) = queue.drain_interval {
                config.queue.drain_interval = parse_duration("queue.drain_interval", &v)?;
            }
            if let Some(v) = queue.drain_batch_size {
                config.queue.drain_batch_size = v;
            }
            if let Some(v) = queue.max_queue_size {
                config.queue.max_queue_size = v;
            }
            if let Some(v) = queue.max_attempts {
                config.queue.max_attempts = v;
            }
        }
        if let Some(notification) = file.notification {
            if let Some(v) = notification.channel_capacity {
                config.notification.channel_capacity = v;
            }
            if let Some(v) = notification.max_consecutive_drops {
                config.notification.max_consecutive_drops = v;
            }
        }
        if let Some(retention) = file.retention {
            if let Some(v) = retention.snooze_sweep_interval {
                config.retention.snooze_sweep_interval =
                    parse_duration("retention.snooze_sweep_interval", &v)?;
            }
            if let Some(v) = retention.retention_sweep_interval {
                config.retention.retention_sweep_interval =
                    parse_duration("retention.retention_sweep_interval", &v)?;
            }
            if let Some(v) = retention.activity_log_retention {
                config.retention.activity_log_retention =
                    parse_duration("retention.activity_log_retention", &v)?;
            }
        }
        if let Some(log) = file.log {
            if let Some(v) = log.level {
                config.log.level = v;
            }
            if let Some(v) = log.dir {
                config.log.dir = Some(PathBuf::from(v));
            }
        }
        Ok(())
    }

    fn apply_env(config: &mut Config, env: EnvOverlay) -> Result<(), ConfigLoadError> {
        if let Some(v) = env.http_host {
            config.server.http_host = v;
        }
        if let Some(v) = env.http_port {
            config.server.http_port = v;
        }
        if let Some(v) = env.db_path {
            config.db.path = PathBuf::from(v);
        }
        if let Some(v) = env.queue_path {
            config.queue.path = PathBuf::from(v);
        }
        if let Some(v) = env.log_level {
            config.log.level = v;
        }
        if let Some(v) = env.log_dir {
            config.log.dir = Some(PathBuf::from(v));
        }
        Ok(())
    }

    fn apply_cli(config: &mut Config, cli: &CliArgs) {
        if let Some(v) = cli.http_host.clone() {
            config.server.http_host = v;
        }
        if let Some(v) = cli.http_port {
            config.server.http_port = v;
        }
        if cli.no_stdio {
            config.server.enable_stdio = false;
        }
        if let Some(v) = cli.db_path.clone() {
            config.db.path = v;
        }
        if let Some(v) = cli.log_level.clone() {
            config.log.level = v;
        }
    }
}

fn parse_duration(field: &'static str, value: &str) -> Result<std::time::Duration, ConfigLoadError> {
    humantime::parse_duration(value).map_err(|err| ConfigLoadError::InvalidValue {
        field,
        reason: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_without_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let cli = CliArgs {
            config: Some(dir.path().join("missing.toml")),
            ..Default::default()
        };
        let config = ConfigLoader::load(&cli).unwrap();
        assert_eq!(config.server.http_port, 8731);
        assert!(config.server.enable_stdio);
    }

    #[test]
    fn file_overlay_wins_over_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "[server]\nhttp-port = 9100\n").unwrap();
        let cli = CliArgs {
            config: Some(path),
            ..Default::default()
        };
        let config = ConfigLoader::load(&cli).unwrap();
        assert_eq!(config.server.http_port, 9100);
    }

    #[test]
    fn cli_wins_over_file_and_env() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "[server]\nhttp-port = 9100\n").unwrap();
        let cli = CliArgs {
            config: Some(path),
            http_port: Some(9200),
            ..Default::default()
        };
        let config = ConfigLoader::load(&cli).unwrap();
        assert_eq!(config.server.http_port, 9200);
    }
}
