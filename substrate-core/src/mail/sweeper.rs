//! Background sweepers for the Mail service: snooze wake-up and retention
//! expiry. Grounded on the teacher's `tokio::spawn` + `tokio::time::interval`
//! background task shape (`auth::state_manager::AuthStateManager::new`,
//! `scanner::background`'s periodic cleanup loop).

use std::time::Duration;

use tokio::time::interval;
use tracing::warn;

use crate::mail::MailServiceHandle;

/// Ticks every `min(30s, next snoozed_until - now)` per spec §4.3; since the
/// service has no cheap way to learn "next snoozed_until" without a query,
/// this just ticks at a fixed cadence and lets `sweep_snoozed` do nothing
/// when there is nothing to wake — the same fixed-interval-over-adaptive
/// tradeoff the teacher makes in its own cleanup loops.
pub fn spawn_snooze_sweeper(mail: MailServiceHandle, tick: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(tick);
        loop {
            ticker.tick().await;
            if let Err(err) = mail.sweep_snoozed().await {
                warn!(error = %err, "snooze sweep failed");
            }
        }
    })
}

pub fn spawn_retention_sweeper(mail: MailServiceHandle, tick: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(tick);
        loop {
            ticker.tick().await;
            if let Err(err) = mail.sweep_expired().await {
                warn!(error = %err, "retention sweep failed");
            }
        }
    })
}
