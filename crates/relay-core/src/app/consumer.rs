//! MessageConsumer - idempotent consumption with deferred acknowledgment.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::domain::{EventEnvelope, RelayError};
use crate::observability::MetricsSnapshot;
use crate::ports::{ProcessedMessageStore, Subscription};
use crate::store::ProcessedMessage;

/// Owned metrics aggregator (no globals). Shared by Arc with whoever
/// reports stats; mutation stays inside the consumer.
#[derive(Debug, Default)]
pub struct ConsumerMetrics {
    processed: AtomicU64,
    duplicates: AtomicU64,
    errors: AtomicU64,
}

impl ConsumerMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    fn record_processed(&self) {
        self.processed.fetch_add(1, Ordering::Relaxed);
    }

    fn record_duplicate(&self) {
        self.duplicates.fetch_add(1, Ordering::Relaxed);
    }

    fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            processed_count: self.processed.load(Ordering::Relaxed),
            duplicate_count: self.duplicates.load(Ordering::Relaxed),
            error_count: self.errors.load(Ordering::Relaxed),
        }
    }
}

/// How the pull loop reacts to a persistence failure.
#[derive(Debug, Clone)]
pub struct ConsumerPolicy {
    /// Pause before re-pulling after a failed persist (the message stays
    /// unacked and will be redelivered).
    pub error_backoff: Duration,
}

impl Default for ConsumerPolicy {
    fn default() -> Self {
        Self {
            error_backoff: Duration::from_millis(500),
        }
    }
}

/// Outcome of processing one payload. Everything here may be acked;
/// persistence failures come back as `Err` and must NOT be acked.
#[derive(Debug, Clone, PartialEq)]
pub enum Processed {
    /// First delivery: a row was written.
    Stored(ProcessedMessage),
    /// Redelivery of an already-persisted event; absorbed.
    Duplicate,
    /// Undecodable payload; counted and skipped (redelivering it forever
    /// would wedge the subscription).
    Poison,
}

/// Decodes envelopes and performs the idempotent insert keyed by
/// `event_id`. Per-topic ordering is preserved because the loop is
/// sequential; multiple subscriptions can run in parallel workers, each
/// independently idempotent via the dedup key.
pub struct MessageConsumer {
    store: Arc<dyn ProcessedMessageStore>,
    metrics: Arc<ConsumerMetrics>,
    policy: ConsumerPolicy,
}

impl MessageConsumer {
    pub fn new(store: Arc<dyn ProcessedMessageStore>, metrics: Arc<ConsumerMetrics>) -> Self {
        Self::with_policy(store, metrics, ConsumerPolicy::default())
    }

    pub fn with_policy(
        store: Arc<dyn ProcessedMessageStore>,
        metrics: Arc<ConsumerMetrics>,
        policy: ConsumerPolicy,
    ) -> Self {
        Self {
            store,
            metrics,
            policy,
        }
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Process one payload. `Err` means the insert did not happen and the
    /// caller must not ack, so the transport redelivers.
    pub async fn process(&self, payload: &[u8]) -> Result<Processed, RelayError> {
        let envelope = match EventEnvelope::from_bytes(payload) {
            Ok(envelope) => envelope,
            Err(err) => {
                self.metrics.record_error();
                tracing::warn!(error = %err, "dropping undecodable payload");
                return Ok(Processed::Poison);
            }
        };

        match self
            .store
            .insert_if_absent(envelope.event_id, envelope.content.clone())
            .await
        {
            Ok(Some(message)) => {
                self.metrics.record_processed();
                tracing::debug!(event_id = %envelope.event_id, "message persisted");
                Ok(Processed::Stored(message))
            }
            Ok(None) => {
                self.metrics.record_duplicate();
                tracing::debug!(event_id = %envelope.event_id, "duplicate delivery absorbed");
                Ok(Processed::Duplicate)
            }
            Err(err) => {
                self.metrics.record_error();
                tracing::warn!(event_id = %envelope.event_id, error = %err,
                    "persist failed, leaving message unacked");
                Err(err)
            }
        }
    }

    /// Spawn the pull loop over one subscription: recv, persist, then ack.
    pub fn spawn(self: Arc<Self>, mut subscription: Box<dyn Subscription>) -> ConsumerHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let join = tokio::spawn(async move {
            loop {
                if *shutdown_rx.borrow() {
                    break;
                }

                let payload = tokio::select! {
                    changed = shutdown_rx.changed() => {
                        // a closed channel (handle dropped) also stops the loop
                        if changed.is_err() {
                            break;
                        }
                        continue;
                    }
                    payload = subscription.recv() => payload,
                };

                let Some(payload) = payload else {
                    tracing::info!("subscription closed, consumer exiting");
                    break;
                };

                match self.process(&payload).await {
                    Ok(_) => {
                        if let Err(err) = subscription.ack().await {
                            tracing::warn!(error = %err, "ack failed");
                        }
                    }
                    Err(_) => {
                        // no ack: the same payload comes back on the next recv
                        tokio::time::sleep(self.policy.error_backoff).await;
                    }
                }
            }
        });

        ConsumerHandle { shutdown_tx, join }
    }
}

/// Handle to the spawned pull loop. Shutdown lets an in-flight
/// persist/ack finish before the task exits.
pub struct ConsumerHandle {
    shutdown_tx: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl ConsumerHandle {
    pub fn request_shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    pub async fn shutdown_and_join(self) {
        self.request_shutdown();
        let _ = self.join.await;
    }
}
