//! Demo wiring: the full outbox path against the in-memory transport,
//! including an outage and recovery.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;

use relay_core::{
    BrokerClient, ConnectPolicy, ConsumerMetrics, EventState, EventStore, InMemoryBroker,
    InMemoryEventStore, InMemoryProcessedStore, MessageConsumer, OutboxWriter,
    ProcessedMessageStore, RetryScheduler, SweepPolicy, check_health, connect_with_retry,
};

const TOPIC: &str = "events";

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "relay_core=debug,relay_cli=info".into()),
        )
        .init();

    // (A) stores + broker
    let event_store = Arc::new(InMemoryEventStore::new());
    let processed_store = Arc::new(InMemoryProcessedStore::new());
    let broker = Arc::new(InMemoryBroker::new());

    // (B) startup: both sides block on the reconnect loop
    let connect_policy = ConnectPolicy {
        delay: Duration::from_millis(100),
        ..ConnectPolicy::default()
    };
    connect_with_retry(broker.as_ref(), &connect_policy)
        .await
        .expect("broker must come up for the demo");

    let writer = OutboxWriter::new(event_store.clone(), broker.clone(), TOPIC);

    let scheduler = Arc::new(RetryScheduler::new(
        event_store.clone(),
        broker.clone(),
        TOPIC,
        SweepPolicy {
            interval: Duration::from_millis(300),
            ..SweepPolicy::default()
        },
    ));
    let scheduler_handle = scheduler.clone().spawn();

    let metrics = Arc::new(ConsumerMetrics::new());
    let consumer = Arc::new(MessageConsumer::new(processed_store.clone(), metrics.clone()));
    let subscription = broker.subscribe(TOPIC).await.expect("subscribe");
    let consumer_handle = consumer.spawn(subscription);

    // (C) happy path: submit while the broker is reachable
    let receipt = writer.submit("hello").await.expect("submit");
    tracing::info!(event_id = %receipt.event_id, state = ?receipt.state, "submitted");

    // (D) outage: the submission still succeeds, durably recorded as Failed
    broker.set_available(false);
    let parked = writer.submit("delayed greetings").await.expect("submit");
    tracing::info!(event_id = %parked.event_id, state = ?parked.state, "accepted during outage");

    let health = check_health(event_store.as_ref(), broker.as_ref()).await;
    tracing::info!(
        storage_ok = health.storage_ok,
        broker_ok = health.broker_ok,
        "health probed"
    );

    // (E) recovery: the sweep picks the parked event up
    broker.set_available(true);
    loop {
        let record = event_store
            .get(parked.event_id)
            .await
            .expect("store")
            .expect("event exists");
        if record.state == EventState::Sent {
            tracing::info!(event_id = %record.id, attempts = record.attempts, "recovered");
            break;
        }
        sleep(Duration::from_millis(50)).await;
    }

    // (F) wait until the consumer has both messages
    while processed_store.count().await.expect("store") < 2 {
        sleep(Duration::from_millis(50)).await;
    }

    let counts = event_store.counts_by_state().await.expect("store");
    tracing::info!(
        counts = %serde_json::to_string(&counts).unwrap(),
        metrics = %serde_json::to_string(&metrics.snapshot()).unwrap(),
        "delivery settled"
    );
    for message in processed_store.list().await.expect("store") {
        tracing::info!(
            message_id = %message.id,
            source_event_id = %message.source_event_id,
            content = %message.content,
            "processed"
        );
    }

    // (G) graceful shutdown: drain in-flight work before exiting
    scheduler_handle.shutdown_and_join().await;
    consumer_handle.shutdown_and_join().await;
}
