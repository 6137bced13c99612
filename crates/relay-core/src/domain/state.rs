//! Event state machine.

use serde::{Deserialize, Serialize};

/// Delivery state of an outbox event.
///
/// State transitions:
/// - Pending -> Sent (first publish succeeded)
/// - Pending -> Failed (first publish failed)
/// - Failed -> Sent (a later sweep succeeded)
/// - Failed -> Failed (a later sweep failed again; attempts grow)
///
/// Sent is terminal: nothing moves an event out of it. Using a closed enum
/// ensures exhaustive matching and prevents invalid states; the legacy
/// single-character storage codes are kept only at the encoding boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventState {
    /// Durably recorded, publish not yet attempted (or racing with it).
    Pending,

    /// Accepted by the transport. Terminal.
    Sent,

    /// At least one publish attempt failed; eligible for retry sweeps
    /// until the attempt cap is reached.
    Failed,
}

impl EventState {
    /// Is this a terminal state (no further transitions)?
    pub fn is_terminal(self) -> bool {
        matches!(self, EventState::Sent)
    }

    /// Is an event in this state eligible for a retry sweep
    /// (ignoring the attempt cap, which the store checks separately)?
    pub fn is_retryable(self) -> bool {
        matches!(self, EventState::Pending | EventState::Failed)
    }

    /// May an event move from this state to `next`?
    ///
    /// The store rejects anything this returns false for, e.g. Sent -> Failed.
    pub fn can_transition_to(self, next: EventState) -> bool {
        match self {
            EventState::Pending | EventState::Failed => {
                matches!(next, EventState::Sent | EventState::Failed)
            }
            EventState::Sent => false,
        }
    }

    /// Stable single-character storage code.
    pub fn as_code(self) -> char {
        match self {
            EventState::Pending => 'P',
            EventState::Sent => 'E',
            EventState::Failed => 'X',
        }
    }

    /// Decode a storage code written by [`as_code`](Self::as_code).
    pub fn from_code(code: char) -> Option<Self> {
        match code {
            'P' => Some(EventState::Pending),
            'E' => Some(EventState::Sent),
            'X' => Some(EventState::Failed),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::pending_to_sent(EventState::Pending, EventState::Sent, true)]
    #[case::pending_to_failed(EventState::Pending, EventState::Failed, true)]
    #[case::failed_to_sent(EventState::Failed, EventState::Sent, true)]
    #[case::failed_to_failed(EventState::Failed, EventState::Failed, true)]
    #[case::sent_to_failed(EventState::Sent, EventState::Failed, false)]
    #[case::sent_to_pending(EventState::Sent, EventState::Pending, false)]
    #[case::sent_to_sent(EventState::Sent, EventState::Sent, false)]
    #[case::failed_to_pending(EventState::Failed, EventState::Pending, false)]
    fn transition_table(
        #[case] from: EventState,
        #[case] to: EventState,
        #[case] allowed: bool,
    ) {
        assert_eq!(from.can_transition_to(to), allowed);
    }

    #[test]
    fn only_sent_is_terminal() {
        assert!(EventState::Sent.is_terminal());
        assert!(!EventState::Pending.is_terminal());
        assert!(!EventState::Failed.is_terminal());
    }

    #[test]
    fn storage_codes_round_trip() {
        for state in [EventState::Pending, EventState::Sent, EventState::Failed] {
            assert_eq!(EventState::from_code(state.as_code()), Some(state));
        }
        assert_eq!(EventState::from_code('Z'), None);
    }
}
