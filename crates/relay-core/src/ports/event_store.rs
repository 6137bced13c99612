//! EventStore port - the source of truth for delivery state.

use async_trait::async_trait;

use crate::domain::{EventId, RelayError};
use crate::observability::EventCounts;
use crate::store::EventRecord;

/// Result of one publish try, as reported by a producer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    /// The transport accepted the envelope.
    Delivered,
    /// The transport rejected or was unreachable; carries the error detail.
    Rejected(String),
}

/// Durable table of outbox events.
///
/// Design intent:
/// - `insert_pending` alone decides whether a submission succeeded; it is
///   never rolled back because of a later publish failure.
/// - `record_publish_outcome` is the only mutation and has compare-and-swap
///   semantics: an event that is already Sent absorbs any further outcome
///   as a no-op, so a racing submission and sweep cannot regress state or
///   double-count attempts.
/// - Illegal transitions are rejected here, not by callers.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Durably insert a new Pending event, allocating its id.
    async fn insert_pending(&self, content: String) -> Result<EventRecord, RelayError>;

    /// Record the outcome of one publish try and return the updated record.
    ///
    /// No-op (returns the current record) if the event is already Sent.
    async fn record_publish_outcome(
        &self,
        id: EventId,
        outcome: PublishOutcome,
    ) -> Result<EventRecord, RelayError>;

    /// Up to `limit` events with state in {Pending, Failed} and
    /// `attempts < max_attempts`, oldest first.
    async fn fetch_retryable(
        &self,
        limit: usize,
        max_attempts: u32,
    ) -> Result<Vec<EventRecord>, RelayError>;

    async fn get(&self, id: EventId) -> Result<Option<EventRecord>, RelayError>;

    /// All events in creation order (caller-visible from the moment of
    /// creation, regardless of delivery outcome).
    async fn list(&self) -> Result<Vec<EventRecord>, RelayError>;

    /// Aggregate counts by state, for status/health collaborators.
    async fn counts_by_state(&self) -> Result<EventCounts, RelayError>;
}
