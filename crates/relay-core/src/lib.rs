//! relay-core
//!
//! Transactional-outbox engine: durable event writes decoupled from
//! best-effort publishing, with retry sweeps and an idempotent consumer.
//!
//! # Module layout
//! - **domain**: model (ids, envelope, state machine, errors)
//! - **ports**: abstraction layer (EventStore, ProcessedMessageStore, BrokerClient)
//! - **store**: durable records + in-memory store implementations
//! - **impls**: transport implementations (InMemoryBroker for development)
//! - **app**: the engine (OutboxWriter, RetryScheduler, MessageConsumer, status)
//! - **observability**: serializable count views (EventCounts, MetricsSnapshot)
//!
//! # Delivery contract
//! At-least-once: a submission is durable once `OutboxWriter::submit`
//! returns, publish failures are retried by the sweep, and redelivery is
//! absorbed by the consumer's dedup key. Exactly-once is a non-goal.

pub mod app;
pub mod domain;
pub mod impls;
pub mod observability;
pub mod ports;
pub mod store;

pub use app::{
    ConsumerHandle, ConsumerMetrics, ConsumerPolicy, HealthReport, MessageConsumer, OutboxWriter,
    RetryScheduler, SchedulerHandle, SubmitReceipt, SweepPolicy, SweepReport, check_health,
};
pub use domain::{EventEnvelope, EventId, EventState, MessageId, RelayError};
pub use observability::{EventCounts, MetricsSnapshot};
pub use impls::InMemoryBroker;
pub use ports::{
    BrokerClient, ConnectPolicy, EventStore, ProcessedMessageStore, PublishOutcome, Subscription,
    connect_with_retry,
};
pub use store::{EventRecord, InMemoryEventStore, InMemoryProcessedStore, ProcessedMessage};
