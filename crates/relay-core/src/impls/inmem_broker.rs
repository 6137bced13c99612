//! InMemoryBroker - development/test transport.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};

use crate::domain::RelayError;
use crate::ports::{BrokerClient, Subscription};

/// One topic: a retained log plus a wakeup for subscribers.
#[derive(Clone)]
struct Topic {
    log: Arc<Mutex<Vec<Vec<u8>>>>,
    notify: Arc<Notify>,
}

impl Topic {
    fn new() -> Self {
        Self {
            log: Arc::new(Mutex::new(Vec::new())),
            notify: Arc::new(Notify::new()),
        }
    }
}

/// In-memory broker modeling a log transport.
///
/// Design:
/// - Each topic retains its full log; a subscriber that joins late replays
///   from the beginning, so messages published while the consumer was
///   offline are not lost.
/// - Each subscription keeps its own cursor and redelivers the payload at
///   the cursor until it is acked (at-least-once semantics).
/// - `set_available(false)` simulates an outage: connect/publish/subscribe
///   fail until the transport comes back. Established subscriptions keep
///   their stream.
pub struct InMemoryBroker {
    topics: Mutex<HashMap<String, Topic>>,
    available: AtomicBool,
}

impl InMemoryBroker {
    pub fn new() -> Self {
        Self {
            topics: Mutex::new(HashMap::new()),
            available: AtomicBool::new(true),
        }
    }

    /// Toggle transport reachability (outage simulation).
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::Relaxed);
    }

    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::Relaxed)
    }

    async fn topic(&self, name: &str) -> Topic {
        let mut topics = self.topics.lock().await;
        topics.entry(name.to_string()).or_insert_with(Topic::new).clone()
    }

    fn check_available(&self) -> Result<(), RelayError> {
        if self.is_available() {
            Ok(())
        } else {
            Err(RelayError::Broker("transport unreachable".into()))
        }
    }
}

impl Default for InMemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BrokerClient for InMemoryBroker {
    async fn connect(&self) -> Result<(), RelayError> {
        self.check_available()
    }

    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), RelayError> {
        self.check_available()?;
        let topic = self.topic(topic).await;
        {
            let mut log = topic.log.lock().await;
            log.push(payload);
        }
        topic.notify.notify_waiters();
        Ok(())
    }

    async fn subscribe(&self, topic: &str) -> Result<Box<dyn Subscription>, RelayError> {
        self.check_available()?;
        let topic = self.topic(topic).await;
        Ok(Box::new(InMemorySubscription {
            log: topic.log,
            notify: topic.notify,
            cursor: 0,
        }))
    }
}

/// Subscription with a private cursor into the topic log.
struct InMemorySubscription {
    log: Arc<Mutex<Vec<Vec<u8>>>>,
    notify: Arc<Notify>,
    cursor: usize,
}

#[async_trait]
impl Subscription for InMemorySubscription {
    async fn recv(&mut self) -> Option<Vec<u8>> {
        loop {
            {
                let log = self.log.lock().await;
                if self.cursor < log.len() {
                    return Some(log[self.cursor].clone());
                }
            }

            // Wait for a publish. The short sleep re-checks the log so a
            // notify that fired between unlock and await is never lost.
            tokio::select! {
                _ = self.notify.notified() => {}
                _ = tokio::time::sleep(Duration::from_millis(50)) => {}
            }
        }
    }

    async fn ack(&mut self) -> Result<(), RelayError> {
        let log = self.log.lock().await;
        if self.cursor < log.len() {
            self.cursor += 1;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::timeout;

    const TOPIC: &str = "events";

    async fn recv_now(sub: &mut Box<dyn Subscription>) -> Vec<u8> {
        timeout(Duration::from_secs(1), sub.recv())
            .await
            .expect("recv timed out")
            .expect("stream closed")
    }

    #[tokio::test]
    async fn publish_subscribe_roundtrip() {
        let broker = InMemoryBroker::new();
        let mut sub = broker.subscribe(TOPIC).await.unwrap();

        broker.publish(TOPIC, b"one".to_vec()).await.unwrap();

        assert_eq!(recv_now(&mut sub).await, b"one");
    }

    #[tokio::test]
    async fn redelivers_until_acked() {
        let broker = InMemoryBroker::new();
        let mut sub = broker.subscribe(TOPIC).await.unwrap();

        broker.publish(TOPIC, b"one".to_vec()).await.unwrap();
        broker.publish(TOPIC, b"two".to_vec()).await.unwrap();

        // no ack: same payload over and over
        assert_eq!(recv_now(&mut sub).await, b"one");
        assert_eq!(recv_now(&mut sub).await, b"one");

        sub.ack().await.unwrap();
        assert_eq!(recv_now(&mut sub).await, b"two");
    }

    #[tokio::test]
    async fn late_subscriber_replays_the_log() {
        let broker = InMemoryBroker::new();
        broker.publish(TOPIC, b"early".to_vec()).await.unwrap();
        broker.publish(TOPIC, b"later".to_vec()).await.unwrap();

        let mut sub = broker.subscribe(TOPIC).await.unwrap();
        assert_eq!(recv_now(&mut sub).await, b"early");
        sub.ack().await.unwrap();
        assert_eq!(recv_now(&mut sub).await, b"later");
    }

    #[tokio::test]
    async fn unavailable_transport_rejects_operations() {
        let broker = InMemoryBroker::new();
        broker.set_available(false);

        assert!(matches!(
            broker.connect().await.unwrap_err(),
            RelayError::Broker(_)
        ));
        assert!(matches!(
            broker.publish(TOPIC, b"x".to_vec()).await.unwrap_err(),
            RelayError::Broker(_)
        ));
        assert!(broker.subscribe(TOPIC).await.is_err());

        broker.set_available(true);
        broker.publish(TOPIC, b"x".to_vec()).await.unwrap();
    }

    #[tokio::test]
    async fn publish_wakes_waiting_recv() {
        let broker = Arc::new(InMemoryBroker::new());
        let mut sub = broker.subscribe(TOPIC).await.unwrap();

        let recv_future = tokio::spawn(async move { sub.recv().await });

        tokio::time::sleep(Duration::from_millis(100)).await;
        broker.publish(TOPIC, b"wake".to_vec()).await.unwrap();

        let payload = timeout(Duration::from_secs(1), recv_future)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(payload, Some(b"wake".to_vec()));
    }

    #[tokio::test]
    async fn independent_cursors_per_subscription() {
        let broker = InMemoryBroker::new();
        let mut sub_a = broker.subscribe(TOPIC).await.unwrap();
        let mut sub_b = broker.subscribe(TOPIC).await.unwrap();

        broker.publish(TOPIC, b"one".to_vec()).await.unwrap();

        assert_eq!(recv_now(&mut sub_a).await, b"one");
        sub_a.ack().await.unwrap();

        // b's cursor is untouched by a's ack
        assert_eq!(recv_now(&mut sub_b).await, b"one");
    }
}
