//! Ports - the seams between the engine and its infrastructure.
//!
//! Each trait hides an external system (durable storage, the message
//! transport) so implementations can be swapped without touching the
//! writer/scheduler/consumer logic. The in-memory implementations live in
//! [`crate::store`] and [`crate::impls`].

pub mod broker;
pub mod event_store;
pub mod message_store;

pub use self::broker::{BrokerClient, ConnectPolicy, Subscription, connect_with_retry};
pub use self::event_store::{EventStore, PublishOutcome};
pub use self::message_store::ProcessedMessageStore;
