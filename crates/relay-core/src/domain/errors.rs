//! Error taxonomy.

use thiserror::Error;

use super::ids::EventId;
use super::state::EventState;

/// Errors of the outbox engine.
///
/// Only `Validation` and `Storage` are ever surfaced to a submitting
/// caller: a publish failure is recorded in event state and handled by the
/// retry sweep, never thrown back as a hard failure. Duplicate delivery is
/// not an error at all; the consumer absorbs it.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Malformed caller input, rejected before any write.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Transient transport failure (connect/publish/subscribe).
    #[error("broker unavailable: {0}")]
    Broker(String),

    /// Storage unavailable; the whole operation fails, no partial state.
    #[error("storage failure: {0}")]
    Storage(String),

    /// Rejected at the storage boundary, e.g. Sent -> Failed.
    #[error("illegal transition for {id}: {from:?} -> {to:?}")]
    IllegalTransition {
        id: EventId,
        from: EventState,
        to: EventState,
    },

    #[error("event not found: {0}")]
    EventNotFound(EventId),

    /// Envelope encode/decode failure (poison payload on the consumer side).
    #[error("envelope codec failed: {0}")]
    Codec(String),
}

impl RelayError {
    /// Will retrying possibly succeed without operator intervention?
    pub fn is_transient(&self) -> bool {
        matches!(self, RelayError::Broker(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_broker_errors_are_transient() {
        assert!(RelayError::Broker("down".into()).is_transient());
        assert!(!RelayError::Validation("empty".into()).is_transient());
        assert!(!RelayError::Storage("gone".into()).is_transient());
        assert!(!RelayError::Codec("bad json".into()).is_transient());
    }

    #[test]
    fn illegal_transition_names_the_event() {
        let err = RelayError::IllegalTransition {
            id: EventId::new(3),
            from: EventState::Sent,
            to: EventState::Failed,
        };
        let msg = err.to_string();
        assert!(msg.contains("event-3"));
        assert!(msg.contains("Sent"));
    }
}
