//! Event and processed-message records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{EventId, EventState, MessageId, RelayError};

/// Durable outbox event row.
///
/// Design:
/// - This is the single source of truth for delivery state.
/// - All state transitions happen here and are validated against
///   [`EventState::can_transition_to`]; the stores never poke fields
///   directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub id: EventId,
    pub content: String,
    pub state: EventState,

    /// Number of failed publish tries. Monotonically increasing.
    pub attempts: u32,

    /// Last publish error (cleared when the event is sent).
    pub last_error: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EventRecord {
    /// New events always start Pending: durability precedes delivery.
    pub fn new(id: EventId, content: String) -> Self {
        let now = Utc::now();
        Self {
            id,
            content,
            state: EventState::Pending,
            attempts: 0,
            last_error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Mark as accepted by the transport. Terminal.
    pub fn mark_sent(&mut self) -> Result<(), RelayError> {
        self.transition_to(EventState::Sent)?;
        self.last_error = None;
        Ok(())
    }

    /// Record one failed publish try.
    pub fn mark_failed(&mut self, error: String) -> Result<(), RelayError> {
        self.transition_to(EventState::Failed)?;
        self.attempts += 1;
        self.last_error = Some(error);
        Ok(())
    }

    fn transition_to(&mut self, next: EventState) -> Result<(), RelayError> {
        if !self.state.can_transition_to(next) {
            return Err(RelayError::IllegalTransition {
                id: self.id,
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Is this event eligible for a retry sweep under `max_attempts`?
    pub fn is_retryable(&self, max_attempts: u32) -> bool {
        self.state.is_retryable() && self.attempts < max_attempts
    }
}

/// Destination-store row, written exactly once per distinct source event.
///
/// Never mutated after creation; `source_event_id` is the dedup key that
/// makes redelivery safe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedMessage {
    pub id: MessageId,
    pub content: String,
    pub source_event_id: EventId,
    pub created_at: DateTime<Utc>,
}

impl ProcessedMessage {
    pub fn new(id: MessageId, source_event_id: EventId, content: String) -> Self {
        Self {
            id,
            content,
            source_event_id,
            created_at: Utc::now(),
        }
    }
}
