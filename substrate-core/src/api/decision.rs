//! Hook-decision adapter (spec §4.8 mode 3): a blocking wait on a specific
//! plan-review or code-review workflow item until it leaves its
//! non-terminal state or a caller-supplied timeout elapses. On timeout the
//! core returns `Cancelled` and leaves the record exactly as it was — no
//! state mutation (spec §4.6 "on timeout... the core itself returns
//! `Timeout` and leaves the record pending").

use std::time::Duration;

use tokio::time::sleep;

use substrate_contracts::CoreError;
use substrate_model::{PlanReview, PlanReviewState, Review};

use crate::review::ReviewOrchestratorHandle;

/// Poll interval between terminal-state checks. Short enough that a caller
/// waiting the typical ~55s long-poll budget still observes a decision
/// within a fraction of a second of it landing.
const POLL_INTERVAL: Duration = Duration::from_millis(200);

pub async fn wait_for_plan_review_decision(
    orchestrator: &ReviewOrchestratorHandle,
    review_id: substrate_model::ReviewId,
    timeout: Duration,
) -> Result<PlanReview, CoreError> {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        let plan_review = orchestrator.get_plan_review(review_id).await?;
        if plan_review.state != PlanReviewState::Pending {
            return Ok(plan_review);
        }
        if tokio::time::Instant::now() >= deadline {
            return Err(CoreError::Cancelled);
        }
        sleep(POLL_INTERVAL.min(deadline.saturating_duration_since(tokio::time::Instant::now()))).await;
    }
}

pub async fn wait_for_review_decision(
    orchestrator: &ReviewOrchestratorHandle,
    review_id: substrate_model::ReviewId,
    timeout: Duration,
) -> Result<Review, CoreError> {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        let review = orchestrator.get_review(review_id).await?;
        if review.state.is_terminal() {
            return Ok(review);
        }
        if tokio::time::Instant::now() >= deadline {
            return Err(CoreError::Cancelled);
        }
        sleep(POLL_INTERVAL.min(deadline.saturating_duration_since(tokio::time::Instant::now()))).await;
    }
}
