//! Layered configuration loading for the Substrate agent messaging core.
//!
//! Precedence, ascending: built-in defaults → `~/.substrate/config.toml` →
//! `SUBSTRATE_`-prefixed environment variables → CLI flags.

pub mod cli;
pub mod env;
pub mod error;
pub mod file;
pub mod loader;
pub mod models;
pub mod util;

pub use cli::CliArgs;
pub use error::ConfigLoadError;
pub use loader::ConfigLoader;
pub use models::{
    Config, DbConfig, LogConfig, NotificationConfig, QueueConfig, RetentionConfig, ServerConfig,
};
