//! Supervised shutdown: wait for each actor's mailbox to drain, up to a
//! per-actor timeout, before the process exits.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::warn;

/// Default drain timeout for most services.
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);
/// The review orchestrator may be mid-way through launching or waiting on an
/// external reviewer process; give it longer to finish cleanly.
pub const REVIEWER_DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

struct Registered {
    name: &'static str,
    join: JoinHandle<()>,
    drain_timeout: Duration,
}

/// Tracks every actor task spawned at startup so `shutdown_all` can wait on
/// all of them uniformly. Callers must drop every `ActorHandle` clone for an
/// actor before calling `shutdown_all`, so its mailbox sender count reaches
/// zero and the owner task's receive loop ends on its own.
#[derive(Default)]
pub struct Supervisor {
    actors: Vec<Registered>,
}

impl Supervisor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: &'static str, join: JoinHandle<()>, drain_timeout: Duration) {
        self.actors.push(Registered {
            name,
            join,
            drain_timeout,
        });
    }

    /// Wait for every registered actor to finish draining, logging (not
    /// panicking) on a timeout or task panic — shutdown must make forward
    /// progress even if one service misbehaves.
    pub async fn shutdown_all(self) {
        for actor in self.actors {
            match tokio::time::timeout(actor.drain_timeout, actor.join).await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    warn!(actor = actor.name, error = %err, "actor task panicked during shutdown")
                }
                Err(_) => warn!(
                    actor = actor.name,
                    timeout_secs = actor.drain_timeout.as_secs(),
                    "actor did not drain its mailbox before the shutdown timeout"
                ),
            }
        }
    }
}
