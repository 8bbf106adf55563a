//! # Substrate Server
//!
//! Wire adapters for the Substrate agent messaging core: a REST proxy and a
//! stdio line-based JSON-RPC tool protocol over the same `substrate-core`
//! services, per spec §6.
//!
//! ## Architecture
//!
//! Built on Axum, matching the teacher's HTTP stack; all storage and
//! actor wiring lives in `substrate-core::System`, constructed once at
//! startup and cloned into every wire surface.

/// REST proxy over the Mail/Review/Task services.
pub mod rest;

/// Line-delimited JSON-RPC tool protocol over stdio.
pub mod stdio;

/// Request/response DTOs shared by both wire surfaces.
pub mod dto;

/// `CoreError` -> HTTP status / JSON-RPC error mapping.
pub mod errors;

/// Shared `axum` router state.
pub mod state;

use std::sync::Arc;

use clap::Parser;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use substrate_config::{CliArgs, ConfigLoader};
use substrate_core::System;

use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliArgs::parse();
    let config = ConfigLoader::load(&cli)?;

    init_tracing(&config.log.level);

    let (system, supervisor) = System::start(&config).await?;

    let stdio_task = if config.server.enable_stdio {
        let stdio_system = system.clone();
        Some(tokio::spawn(async move { stdio::run(stdio_system).await }))
    } else {
        None
    };

    let state = AppState { system: system.clone(), config: Arc::new(config.clone()) };
    let app = create_app(state);

    let addr = format!("{}:{}", config.server.http_host, config.server.http_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "substrate-server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(task) = stdio_task {
        task.abort();
    }

    // Drop the last `System` clone this process holds so every actor
    // mailbox's sender count reaches zero and the drain loops below can
    // actually observe their join handles complete.
    drop(system);
    supervisor.shutdown_all().await;

    Ok(())
}

/// Builds the top-level router: REST routes plus CORS/tracing layers.
/// Mirrors the teacher's `create_app` in `ferrex-server/src/main.rs`,
/// without the HTTPS-enforcement and rate-limiting layers (no auth surface
/// or public internet exposure in scope here — agents and their hook
/// processes are trusted local callers per spec §1 Non-goals).
fn create_app(state: AppState) -> axum::Router {
    rest::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received, draining in-flight work");
}
