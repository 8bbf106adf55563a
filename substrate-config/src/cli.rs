//! CLI overlay, applied last (highest priority) per spec §6.

use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser, Default)]
#[command(name = "substrate-server", about = "Substrate agent messaging core")]
pub struct CliArgs {
    /// Path to a config.toml; defaults to ~/.substrate/config.toml.
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[arg(long)]
    pub http_host: Option<String>,

    #[arg(long)]
    pub http_port: Option<u16>,

    #[arg(long)]
    pub no_stdio: bool,

    #[arg(long)]
    pub db_path: Option<PathBuf>,

    #[arg(long)]
    pub log_level: Option<String>,
}
