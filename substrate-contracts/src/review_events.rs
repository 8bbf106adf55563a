//! Orchestrator-facing contract for the code-review FSM (spec §4.6).
//!
//! These events are what drives `Review::state` transitions; they are kept
//! separate from the FSM implementation itself (which lives in
//! `substrate-core::review::fsm`) so the orchestrator's startup-recovery
//! scan and any future reviewer-launcher adapter can depend on this crate
//! alone.

use substrate_model::{ReviewDecision, ReviewId};

/// An event applied to a `Review`'s state machine.
#[derive(Clone, Debug, PartialEq)]
pub enum ReviewOrchestratorEvent {
    /// The review was just created; the orchestrator has queued it for a
    /// reviewer launch. Applied once, immediately after `create_review`.
    Requested { review_id: ReviewId },
    /// A reviewer has been claimed and begun work.
    Claimed { review_id: ReviewId },
    /// The external reviewer process failed to launch.
    LaunchFailed { review_id: ReviewId, error: String },
    /// A reviewer iteration completed with a decision.
    IterationCompleted {
        review_id: ReviewId,
        decision: ReviewDecision,
    },
    /// The requester asked for another pass after `ChangesRequested`.
    ReReviewRequested { review_id: ReviewId },
    /// The requester withdrew the review before a terminal state.
    Cancelled { review_id: ReviewId },
    /// Startup recovery found this review `under_review` with a dangling
    /// iteration (no `completed_at`) and is asking a reviewer-launcher
    /// adapter to resume it.
    ReviewerResumeRequested { review_id: ReviewId },
}
