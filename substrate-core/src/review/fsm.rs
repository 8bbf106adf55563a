//! Code-review state machine (spec §4.6). Transitions are driven by
//! orchestrator events rather than a caller-supplied target state, since the
//! legal next state depends on the event (an `IterationCompleted` decision
//! fans out to three different states).

use substrate_contracts::{CoreError, ReviewOrchestratorEvent};
use substrate_model::{ReviewDecision, ReviewState};

/// Side effect the orchestrator must additionally apply alongside the state
/// write — currently only "record a failure-tagged iteration", so a failed
/// reviewer launch is never silently stuck (spec §4.6 "Failure semantics").
#[derive(Clone, Debug, PartialEq)]
pub enum ReviewEffect {
    None,
    RecordFailureIteration { summary: String },
}

pub fn transition(
    state: ReviewState,
    event: &ReviewOrchestratorEvent,
) -> Result<(ReviewState, ReviewEffect), CoreError> {
    use ReviewOrchestratorEvent::*;
    use ReviewState::*;

    match (state, event) {
        (New, Requested { .. }) => Ok((PendingReview, ReviewEffect::None)),

        (PendingReview, Claimed { .. }) | (ReReview, Claimed { .. }) => {
            Ok((UnderReview, ReviewEffect::None))
        }

        (PendingReview, LaunchFailed { error, .. }) | (ReReview, LaunchFailed { error, .. }) => {
            Ok((
                ChangesRequested,
                ReviewEffect::RecordFailureIteration {
                    summary: format!("reviewer launch failed: {error}"),
                },
            ))
        }

        (UnderReview, IterationCompleted { decision, .. }) => {
            let next = match decision {
                ReviewDecision::Approve => Approved,
                ReviewDecision::RequestChanges => ChangesRequested,
                ReviewDecision::Comment => UnderReview,
            };
            Ok((next, ReviewEffect::None))
        }

        (ChangesRequested, ReReviewRequested { .. }) => Ok((ReReview, ReviewEffect::None)),

        // No state change: this only re-publishes a `ReviewStateChanged`
        // outbox event so a reviewer-launcher adapter watching this review
        // notices and relaunches (spec §4.6 Recovery).
        (UnderReview, ReviewerResumeRequested { .. }) => Ok((UnderReview, ReviewEffect::None)),

        (New | PendingReview | UnderReview | ChangesRequested | ReReview, Cancelled { .. }) => {
            Ok((Cancelled, ReviewEffect::None))
        }

        (current, event) => Err(CoreError::InvalidTransition(format!(
            "review state {current:?} cannot handle {event:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use substrate_model::ReviewId;

    fn rid() -> ReviewId {
        ReviewId::new()
    }

    #[test]
    fn full_happy_path_to_approved() {
        let review_id = rid();
        let (s, _) = transition(ReviewState::New, &ReviewOrchestratorEvent::Requested { review_id }).unwrap();
        assert_eq!(s, ReviewState::PendingReview);
        let (s, _) = transition(s, &ReviewOrchestratorEvent::Claimed { review_id }).unwrap();
        assert_eq!(s, ReviewState::UnderReview);
        let (s, _) = transition(
            s,
            &ReviewOrchestratorEvent::IterationCompleted {
                review_id,
                decision: ReviewDecision::Approve,
            },
        )
        .unwrap();
        assert_eq!(s, ReviewState::Approved);
    }

    #[test]
    fn changes_requested_loops_through_re_review() {
        let review_id = rid();
        let (s, _) = transition(
            ReviewState::UnderReview,
            &ReviewOrchestratorEvent::IterationCompleted {
                review_id,
                decision: ReviewDecision::RequestChanges,
            },
        )
        .unwrap();
        assert_eq!(s, ReviewState::ChangesRequested);
        let (s, _) = transition(s, &ReviewOrchestratorEvent::ReReviewRequested { review_id }).unwrap();
        assert_eq!(s, ReviewState::ReReview);
        let (s, _) = transition(s, &ReviewOrchestratorEvent::Claimed { review_id }).unwrap();
        assert_eq!(s, ReviewState::UnderReview);
    }

    #[test]
    fn launch_failure_moves_to_changes_requested_with_effect() {
        let review_id = rid();
        let (s, effect) = transition(
            ReviewState::PendingReview,
            &ReviewOrchestratorEvent::LaunchFailed {
                review_id,
                error: "spawn failed".to_string(),
            },
        )
        .unwrap();
        assert_eq!(s, ReviewState::ChangesRequested);
        assert!(matches!(effect, ReviewEffect::RecordFailureIteration { .. }));
    }

    #[test]
    fn cancelled_terminal_state_rejects_further_events() {
        let review_id = rid();
        let err = transition(ReviewState::Cancelled, &ReviewOrchestratorEvent::Claimed { review_id })
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidTransition(_)));
    }
}
