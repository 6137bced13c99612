//! BrokerClient port - abstraction over the message transport.

use std::time::Duration;

use async_trait::async_trait;

use crate::domain::RelayError;

/// Client for the message transport.
///
/// Design intent:
/// - `publish` is synchronous from the caller's view: the transport either
///   confirmed acceptance or the call fails with a broker error. It never
///   retries internally; retries belong to the writer/scheduler.
/// - `connect` is a single liveness-checked attempt. Startup reconnect
///   lives in [`connect_with_retry`], which blocks the owning component.
#[async_trait]
pub trait BrokerClient: Send + Sync {
    async fn connect(&self) -> Result<(), RelayError>;

    /// Hand an encoded envelope to the transport.
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), RelayError>;

    /// Open a pull subscription on `topic`, preserving per-topic ordering.
    async fn subscribe(&self, topic: &str) -> Result<Box<dyn Subscription>, RelayError>;
}

/// A pull handle with deferred acknowledgment.
///
/// The consumer owns this handle and must `ack` after persisting; an
/// unacked payload is redelivered by the next `recv`. This is what makes
/// "persist first, advance the offset only on success" possible.
#[async_trait]
pub trait Subscription: Send {
    /// The first unacknowledged payload; the same payload is returned
    /// again until [`ack`](Self::ack). Returns None once the transport is
    /// closed for good.
    async fn recv(&mut self) -> Option<Vec<u8>>;

    /// Advance past the payload last returned by `recv`.
    async fn ack(&mut self) -> Result<(), RelayError>;
}

/// Startup reconnect policy: fixed delay, bounded attempt count.
#[derive(Debug, Clone)]
pub struct ConnectPolicy {
    pub delay: Duration,
    pub max_attempts: u32,
}

impl Default for ConnectPolicy {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(5),
            max_attempts: 10,
        }
    }
}

/// Retry `connect` under `policy`.
///
/// Governs both producer- and consumer-side startup. When all attempts
/// fail the error is fatal for the owning component; nothing here keeps
/// retrying indefinitely.
pub async fn connect_with_retry(
    broker: &dyn BrokerClient,
    policy: &ConnectPolicy,
) -> Result<(), RelayError> {
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match broker.connect().await {
            Ok(()) => {
                if attempt > 1 {
                    tracing::info!(attempt, "broker connection established");
                }
                return Ok(());
            }
            Err(err) if attempt < policy.max_attempts => {
                tracing::warn!(attempt, error = %err, "broker connect failed, retrying");
                tokio::time::sleep(policy.delay).await;
            }
            Err(err) => {
                return Err(RelayError::Broker(format!(
                    "giving up after {attempt} connect attempts: {err}"
                )));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fails `connect` a fixed number of times, then succeeds.
    struct FlakyBroker {
        remaining_failures: AtomicU32,
    }

    impl FlakyBroker {
        fn new(n: u32) -> Self {
            Self {
                remaining_failures: AtomicU32::new(n),
            }
        }
    }

    #[async_trait]
    impl BrokerClient for FlakyBroker {
        async fn connect(&self) -> Result<(), RelayError> {
            let left = self.remaining_failures.load(Ordering::Relaxed);
            if left > 0 {
                self.remaining_failures.fetch_sub(1, Ordering::Relaxed);
                return Err(RelayError::Broker(format!("connection refused (left={left})")));
            }
            Ok(())
        }

        async fn publish(&self, _topic: &str, _payload: Vec<u8>) -> Result<(), RelayError> {
            Ok(())
        }

        async fn subscribe(&self, _topic: &str) -> Result<Box<dyn Subscription>, RelayError> {
            Err(RelayError::Broker("not supported".into()))
        }
    }

    fn fast_policy(max_attempts: u32) -> ConnectPolicy {
        ConnectPolicy {
            delay: Duration::from_millis(5),
            max_attempts,
        }
    }

    #[tokio::test]
    async fn connects_after_transient_failures() {
        let broker = FlakyBroker::new(3);
        connect_with_retry(&broker, &fast_policy(10)).await.unwrap();
    }

    #[tokio::test]
    async fn gives_up_after_bounded_attempts() {
        let broker = FlakyBroker::new(10);
        let err = connect_with_retry(&broker, &fast_policy(3)).await.unwrap_err();
        assert!(matches!(err, RelayError::Broker(_)));
        assert!(err.to_string().contains("3 connect attempts"));
        // exactly 3 tries were made
        assert_eq!(broker.remaining_failures.load(Ordering::Relaxed), 7);
    }

    #[test]
    fn default_policy_has_documented_values() {
        let policy = ConnectPolicy::default();
        assert_eq!(policy.delay, Duration::from_secs(5));
        assert_eq!(policy.max_attempts, 10);
    }
}
