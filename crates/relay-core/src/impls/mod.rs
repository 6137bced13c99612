//! Implementations of the broker port (development/test transports).

mod inmem_broker;

pub use inmem_broker::InMemoryBroker;
