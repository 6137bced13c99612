//! RetryScheduler - periodic sweep over undelivered events.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::domain::{EventEnvelope, RelayError};
use crate::ports::{BrokerClient, EventStore, PublishOutcome};

/// Sweep policy: interval, batch bound and the attempt cap.
#[derive(Debug, Clone)]
pub struct SweepPolicy {
    pub interval: Duration,
    pub batch_size: usize,
    pub max_attempts: u32,
}

impl Default for SweepPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            batch_size: 10,
            max_attempts: 3,
        }
    }
}

/// What one sweep did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// True when another sweep was already in flight and this one bailed
    /// out without touching any event.
    pub skipped: bool,
    pub selected: usize,
    pub delivered: usize,
    pub failed: usize,
}

impl SweepReport {
    fn skipped() -> Self {
        Self {
            skipped: true,
            ..Self::default()
        }
    }
}

/// Republishes events the writer could not deliver synchronously.
///
/// Each run is a bounded sweep, not a continuous loop. Events that exhaust
/// `max_attempts` fall out of the selection predicate and stay Failed;
/// there is no dead-letter path.
pub struct RetryScheduler {
    store: Arc<dyn EventStore>,
    broker: Arc<dyn BrokerClient>,
    topic: String,
    policy: SweepPolicy,

    /// Single-flight gate: `sweep_once` try-locks this, so a sweep entered
    /// while another runs reports skipped instead of double-processing.
    sweep_gate: Mutex<()>,
}

impl RetryScheduler {
    pub fn new(
        store: Arc<dyn EventStore>,
        broker: Arc<dyn BrokerClient>,
        topic: impl Into<String>,
        policy: SweepPolicy,
    ) -> Self {
        Self {
            store,
            broker,
            topic: topic.into(),
            policy,
            sweep_gate: Mutex::new(()),
        }
    }

    pub fn policy(&self) -> &SweepPolicy {
        &self.policy
    }

    /// Run one bounded sweep.
    pub async fn sweep_once(&self) -> Result<SweepReport, RelayError> {
        let Ok(_guard) = self.sweep_gate.try_lock() else {
            tracing::debug!("sweep already in flight, skipping");
            return Ok(SweepReport::skipped());
        };

        let batch = self
            .store
            .fetch_retryable(self.policy.batch_size, self.policy.max_attempts)
            .await?;

        let mut report = SweepReport {
            selected: batch.len(),
            ..SweepReport::default()
        };

        for record in batch {
            let envelope = EventEnvelope::new(record.id, record.content.clone(), Utc::now());
            let outcome = match envelope.to_bytes() {
                Ok(payload) => match self.broker.publish(&self.topic, payload).await {
                    Ok(()) => PublishOutcome::Delivered,
                    Err(err) => PublishOutcome::Rejected(err.to_string()),
                },
                Err(err) => PublishOutcome::Rejected(err.to_string()),
            };

            let delivered = outcome == PublishOutcome::Delivered;
            let updated = self.store.record_publish_outcome(record.id, outcome).await?;
            if delivered {
                report.delivered += 1;
                tracing::debug!(event_id = %updated.id, "republished");
            } else {
                report.failed += 1;
                tracing::warn!(event_id = %updated.id, attempts = updated.attempts,
                    max_attempts = self.policy.max_attempts, "republish failed");
            }
        }

        Ok(report)
    }

    /// Spawn the periodic sweep task.
    ///
    /// Sweeps are awaited inside the task and the ticker delays missed
    /// ticks, so the loop itself can never overlap two sweeps; the
    /// try-lock gate covers external `sweep_once` callers on top.
    pub fn spawn(self: Arc<Self>) -> SchedulerHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let join = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.policy.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // interval fires immediately; the first sweep should wait one period
            ticker.tick().await;

            loop {
                tokio::select! {
                    changed = shutdown_rx.changed() => {
                        // a closed channel (handle dropped) also stops the loop
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                    _ = ticker.tick() => {
                        match self.sweep_once().await {
                            Ok(report) if report.selected > 0 => {
                                tracing::info!(selected = report.selected,
                                    delivered = report.delivered,
                                    failed = report.failed, "sweep finished");
                            }
                            Ok(_) => {}
                            Err(err) => {
                                tracing::warn!(error = %err, "sweep aborted");
                            }
                        }
                    }
                }
            }
        });

        SchedulerHandle { shutdown_tx, join }
    }
}

/// Handle to the spawned sweep task.
/// An in-flight sweep finishes before the task exits (drain on shutdown).
pub struct SchedulerHandle {
    shutdown_tx: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl SchedulerHandle {
    pub fn request_shutdown(&self) {
        // ignore send error: the task may already be gone
        let _ = self.shutdown_tx.send(true);
    }

    pub async fn shutdown_and_join(self) {
        self.request_shutdown();
        let _ = self.join.await;
    }
}
