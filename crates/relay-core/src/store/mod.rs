//! Store module: durable records and the in-memory store implementations.

mod memory;
mod record;

pub use memory::{InMemoryEventStore, InMemoryProcessedStore};
pub use record::{EventRecord, ProcessedMessage};
