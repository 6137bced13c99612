//! ProcessedMessageStore port - the idempotent destination store.

use async_trait::async_trait;

use crate::domain::{EventId, RelayError};
use crate::store::ProcessedMessage;

/// Destination store written by the consumer.
///
/// The uniqueness constraint on `source_event_id` is the dedup boundary
/// that makes at-least-once redelivery safe; no cross-worker coordination
/// is needed beyond it.
#[async_trait]
pub trait ProcessedMessageStore: Send + Sync {
    /// Insert keyed by `source_event_id`.
    ///
    /// Returns `Ok(None)` if a row for that source event already exists
    /// (duplicate delivery; not an error).
    async fn insert_if_absent(
        &self,
        source_event_id: EventId,
        content: String,
    ) -> Result<Option<ProcessedMessage>, RelayError>;

    async fn get_by_source(
        &self,
        source_event_id: EventId,
    ) -> Result<Option<ProcessedMessage>, RelayError>;

    /// All rows in insertion order.
    async fn list(&self) -> Result<Vec<ProcessedMessage>, RelayError>;

    async fn count(&self) -> Result<usize, RelayError>;
}
