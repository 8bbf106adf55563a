//! Per-recipient state machine (spec §4.5). A hand-rolled enum transition
//! table rather than a state-machine crate, matching the teacher's
//! preference for plain enums over a framework dependency for small closed
//! state spaces (`ferrex-server/src/transcoding/job.rs::TranscodingStatus`).

use chrono::{DateTime, Utc};

use substrate_contracts::CoreError;
use substrate_model::RecipientState;

/// What `UpdateMessageState` should actually persist after the FSM has
/// resolved tie-breaks (the snoozed-until-already-passed degrade to unread,
/// `read_at` preserved on first transition into `Read` only).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct TransitionOutcome {
    pub new_state: RecipientState,
    pub snoozed_until: Option<DateTime<Utc>>,
}

/// Validate and resolve a requested transition out of `current`.
///
/// `requested_snoozed_until` is only consulted when `requested ==
/// RecipientState::Snoozed`; every other request ignores it.
pub fn transition(
    current: RecipientState,
    requested: RecipientState,
    requested_snoozed_until: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Result<TransitionOutcome, CoreError> {
    use RecipientState::*;

    let legal = matches!(
        (current, requested),
        (Unread, Read)
            | (Unread, Starred)
            | (Unread, Snoozed)
            | (Unread, Archived)
            | (Unread, Trash)
            | (Read, Starred)
            | (Read, Snoozed)
            | (Read, Archived)
            | (Read, Trash)
            | (Read, Unread)
            | (Starred, Read)
            | (Starred, Snoozed)
            | (Starred, Archived)
            | (Starred, Trash)
            | (Snoozed, Unread)
            | (Snoozed, Read)
            | (Snoozed, Starred)
            | (Snoozed, Archived)
            | (Snoozed, Trash)
            | (Archived, Read)
            | (Archived, Starred)
            | (Archived, Unread)
            | (Archived, Trash)
            | (Trash, Archived)
            | (Trash, Unread)
    );

    if !legal {
        return Err(CoreError::InvalidTransition(format!(
            "{current:?} -> {requested:?} is not a legal thread transition"
        )));
    }

    if requested != Snoozed {
        // Exiting (or never entering) snoozed clears snoozed_until.
        return Ok(TransitionOutcome {
            new_state: requested,
            snoozed_until: None,
        });
    }

    match requested_snoozed_until {
        Some(until) if until > now => Ok(TransitionOutcome {
            new_state: Snoozed,
            snoozed_until: Some(until),
        }),
        // snoozed_until missing or already in the past: the command
        // degrades to a no-op and the recipient ends up unread.
        _ => Ok(TransitionOutcome {
            new_state: Unread,
            snoozed_until: None,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    #[test]
    fn unread_to_read_is_legal() {
        let outcome = transition(RecipientState::Unread, RecipientState::Read, None, now()).unwrap();
        assert_eq!(outcome.new_state, RecipientState::Read);
        assert_eq!(outcome.snoozed_until, None);
    }

    #[test]
    fn archived_to_snoozed_is_illegal() {
        let err = transition(
            RecipientState::Archived,
            RecipientState::Snoozed,
            Some(now() + Duration::seconds(60)),
            now(),
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::InvalidTransition(_)));
    }

    #[test]
    fn snooze_with_future_deadline_holds() {
        let until = now() + Duration::seconds(60);
        let outcome =
            transition(RecipientState::Unread, RecipientState::Snoozed, Some(until), now()).unwrap();
        assert_eq!(outcome.new_state, RecipientState::Snoozed);
        assert_eq!(outcome.snoozed_until, Some(until));
    }

    #[test]
    fn snooze_with_past_deadline_degrades_to_unread() {
        let past = now() - Duration::seconds(5);
        let outcome =
            transition(RecipientState::Read, RecipientState::Snoozed, Some(past), now()).unwrap();
        assert_eq!(outcome.new_state, RecipientState::Unread);
        assert_eq!(outcome.snoozed_until, None);
    }

    #[test]
    fn snooze_with_no_deadline_degrades_to_unread() {
        let outcome =
            transition(RecipientState::Starred, RecipientState::Snoozed, None, now()).unwrap();
        assert_eq!(outcome.new_state, RecipientState::Unread);
    }

    #[test]
    fn trash_restores_to_archived_or_unread_only() {
        assert!(transition(RecipientState::Trash, RecipientState::Archived, None, now()).is_ok());
        assert!(transition(RecipientState::Trash, RecipientState::Unread, None, now()).is_ok());
        assert!(transition(RecipientState::Trash, RecipientState::Read, None, now()).is_err());
    }
}
