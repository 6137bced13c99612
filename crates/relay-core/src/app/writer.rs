//! OutboxWriter - the ingestion side of the outbox.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::domain::{EventEnvelope, EventId, EventState, RelayError};
use crate::ports::{BrokerClient, EventStore, PublishOutcome};

/// What a submitting caller gets back: the durable id plus the state
/// reached after the first publish attempt. `Failed` here does not mean
/// delivery was abandoned; the retry sweep keeps trying.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitReceipt {
    pub event_id: EventId,
    pub state: EventState,
}

/// Accepts new event content, persists it, then attempts one publish.
///
/// The defining asymmetry of the outbox pattern lives here: the insert is
/// never rolled back because of a publish failure. Two storage writes per
/// call in the failure path (insert, then update).
pub struct OutboxWriter {
    store: Arc<dyn EventStore>,
    broker: Arc<dyn BrokerClient>,
    topic: String,
}

impl OutboxWriter {
    pub fn new(
        store: Arc<dyn EventStore>,
        broker: Arc<dyn BrokerClient>,
        topic: impl Into<String>,
    ) -> Self {
        Self {
            store,
            broker,
            topic: topic.into(),
        }
    }

    /// Submit one event.
    ///
    /// Fails only on validation (empty content, checked before any write)
    /// or storage errors. A publish failure is recorded in event state and
    /// the call still succeeds.
    pub async fn submit(&self, content: &str) -> Result<SubmitReceipt, RelayError> {
        if content.is_empty() {
            return Err(RelayError::Validation("content must not be empty".into()));
        }

        // Step 1 (durable): once this commits, the event cannot be lost.
        let record = self.store.insert_pending(content.to_string()).await?;

        // Step 2 (best effort): one publish try, outcome recorded either way.
        let envelope = EventEnvelope::new(record.id, record.content.clone(), Utc::now());
        let outcome = match envelope.to_bytes() {
            Ok(payload) => match self.broker.publish(&self.topic, payload).await {
                Ok(()) => PublishOutcome::Delivered,
                Err(err) => {
                    tracing::warn!(event_id = %record.id, error = %err,
                        "publish failed, event kept for retry");
                    PublishOutcome::Rejected(err.to_string())
                }
            },
            Err(err) => PublishOutcome::Rejected(err.to_string()),
        };

        let updated = self.store.record_publish_outcome(record.id, outcome).await?;
        tracing::debug!(event_id = %updated.id, state = ?updated.state, "event submitted");

        Ok(SubmitReceipt {
            event_id: updated.id,
            state: updated.state,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impls::InMemoryBroker;
    use crate::store::InMemoryEventStore;

    fn rig() -> (Arc<InMemoryEventStore>, Arc<InMemoryBroker>, OutboxWriter) {
        let store = Arc::new(InMemoryEventStore::new());
        let broker = Arc::new(InMemoryBroker::new());
        let writer = OutboxWriter::new(store.clone(), broker.clone(), "events");
        (store, broker, writer)
    }

    #[tokio::test]
    async fn empty_content_is_rejected_before_any_write() {
        let (store, _broker, writer) = rig();

        let err = writer.submit("").await.unwrap_err();
        assert!(matches!(err, RelayError::Validation(_)));
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn reachable_broker_yields_sent() {
        let (store, _broker, writer) = rig();

        let receipt = writer.submit("hello").await.unwrap();
        assert_eq!(receipt.state, EventState::Sent);

        let record = store.get(receipt.event_id).await.unwrap().unwrap();
        assert_eq!(record.attempts, 0);
        assert!(record.last_error.is_none());
    }

    #[tokio::test]
    async fn unreachable_broker_still_accepts_the_submission() {
        let (store, broker, writer) = rig();
        broker.set_available(false);

        // the call succeeds even though delivery did not
        let receipt = writer.submit("hello").await.unwrap();
        assert_eq!(receipt.state, EventState::Failed);

        let record = store.get(receipt.event_id).await.unwrap().unwrap();
        assert_eq!(record.attempts, 1);
        assert!(record.last_error.is_some());
        assert_eq!(record.content, "hello");
    }

    #[tokio::test]
    async fn concurrent_submissions_all_land() {
        let (store, _broker, writer) = rig();
        let writer = Arc::new(writer);

        let mut joins = Vec::new();
        for i in 0..20 {
            let w = Arc::clone(&writer);
            joins.push(tokio::spawn(async move { w.submit(&format!("c{i}")).await }));
        }
        for join in joins {
            join.await.unwrap().unwrap();
        }

        assert_eq!(store.list().await.unwrap().len(), 20);
        let counts = store.counts_by_state().await.unwrap();
        assert_eq!(counts.sent, 20);
    }
}
