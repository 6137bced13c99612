//! App - the engine built on top of the ports.
//!
//! - **OutboxWriter**: durable insert, then best-effort publish.
//! - **RetryScheduler**: periodic single-flight sweep of undelivered events.
//! - **MessageConsumer**: pull/decode/persist/ack loop with deferred ack.
//! - **status**: health reporting (count views live in [`crate::observability`]).

pub mod consumer;
pub mod scheduler;
pub mod status;
pub mod writer;

pub use self::consumer::{ConsumerHandle, ConsumerMetrics, ConsumerPolicy, MessageConsumer};
pub use self::scheduler::{RetryScheduler, SchedulerHandle, SweepPolicy, SweepReport};
pub use self::status::{HealthReport, check_health};
pub use self::writer::{OutboxWriter, SubmitReceipt};
