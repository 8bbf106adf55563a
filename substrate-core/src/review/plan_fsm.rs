//! Plan-review state machine (spec §4.6). A single-shot decision: `Pending`
//! is the only non-terminal state, and any of the other three states ends
//! the workflow.

use substrate_contracts::CoreError;
use substrate_model::PlanReviewState;

pub fn transition(
    current: PlanReviewState,
    requested: PlanReviewState,
) -> Result<PlanReviewState, CoreError> {
    if current != PlanReviewState::Pending {
        return Err(CoreError::InvalidTransition(format!(
            "plan review already terminal at {current:?}"
        )));
    }
    if requested == PlanReviewState::Pending {
        return Err(CoreError::InvalidTransition(
            "cannot transition a plan review back to pending".to_string(),
        ));
    }
    Ok(requested)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_to_approved_is_legal() {
        assert_eq!(
            transition(PlanReviewState::Pending, PlanReviewState::Approved).unwrap(),
            PlanReviewState::Approved
        );
    }

    #[test]
    fn terminal_state_rejects_further_transitions() {
        assert!(transition(PlanReviewState::Approved, PlanReviewState::Rejected).is_err());
    }

    #[test]
    fn cannot_transition_back_to_pending() {
        assert!(transition(PlanReviewState::Pending, PlanReviewState::Pending).is_err());
    }
}
