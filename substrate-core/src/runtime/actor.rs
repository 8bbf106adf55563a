//! A single-threaded actor abstraction: one task owns its state exclusively,
//! callers reach it only through a cloneable mailbox handle.
//!
//! Grounded on the teacher's `JobQueue`/`JobQueueHandle` split in
//! `ferrex-server/src/transcoding/queue.rs` — a `tokio::spawn`ed owner loop,
//! `(request, oneshot::Sender<response>)` tuples for request/reply, and a
//! `Clone`-able handle wrapping only the `Sender` half. Generalized here from
//! one concrete job queue into a trait any service in this crate can
//! implement.

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use substrate_contracts::CoreError;

pub const DEFAULT_MAILBOX_CAPACITY: usize = 100;

/// One request in flight, paired with where its response should go.
struct Ask<Req, Resp> {
    req: Req,
    reply: oneshot::Sender<Resp>,
}

/// State owned by exactly one task. `handle` runs single-threaded, so
/// implementors never need interior locking for their own fields.
#[async_trait]
pub trait Actor: Send + 'static {
    type Req: Send + 'static;
    type Resp: Send + 'static;

    async fn handle(&mut self, req: Self::Req) -> Self::Resp;

    /// Runs once after the mailbox closes (every `ActorHandle` dropped),
    /// before the task returns.
    async fn on_shutdown(&mut self) {}
}

/// Cloneable reference to a spawned actor's mailbox.
pub struct ActorHandle<Req, Resp> {
    tx: mpsc::Sender<Ask<Req, Resp>>,
}

impl<Req, Resp> Clone for ActorHandle<Req, Resp> {
    fn clone(&self) -> Self {
        Self { tx: self.tx.clone() }
    }
}

impl<Req, Resp> ActorHandle<Req, Resp>
where
    Req: Send + 'static,
    Resp: Send + 'static,
{
    /// Request/reply: blocks until the actor has processed `req` and
    /// produced a response.
    pub async fn ask(&self, req: Req) -> Result<Resp, CoreError> {
        let (reply, reply_rx) = oneshot::channel();
        self.tx
            .send(Ask { req, reply })
            .await
            .map_err(|_| CoreError::Unavailable("actor mailbox closed".to_string()))?;
        reply_rx
            .await
            .map_err(|_| CoreError::Unavailable("actor dropped without replying".to_string()))
    }

    /// Fire-and-forget: enqueues `req` without waiting on its response.
    /// Used where the caller only needs the request applied, not its
    /// result — notification emission after a commit is the canonical case.
    pub fn tell(&self, req: Req) -> Result<(), CoreError> {
        let (reply, _reply_rx) = oneshot::channel();
        self.tx
            .try_send(Ask { req, reply })
            .map_err(|_| CoreError::Unavailable("actor mailbox closed or full".to_string()))
    }
}

/// Spawn `actor` on its own task with a bounded mailbox, returning the
/// caller-facing handle and the task's `JoinHandle` for supervised shutdown.
pub fn spawn_actor<A: Actor>(
    actor: A,
    mailbox_capacity: usize,
) -> (ActorHandle<A::Req, A::Resp>, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(mailbox_capacity);
    let join = tokio::spawn(run_actor(actor, rx));
    (ActorHandle { tx }, join)
}

async fn run_actor<A: Actor>(mut actor: A, mut rx: mpsc::Receiver<Ask<A::Req, A::Resp>>) {
    while let Some(Ask { req, reply }) = rx.recv().await {
        let resp = actor.handle(req).await;
        let _ = reply.send(resp);
    }
    actor.on_shutdown().await;
}
