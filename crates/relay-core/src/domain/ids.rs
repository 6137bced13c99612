//! Domain identifiers (strongly-typed IDs).
//!
//! IDs are store-assigned sequence numbers: the store allocates them
//! monotonically, so ordering by id equals ordering by creation. The
//! newtypes exist so an `EventId` and a `MessageId` can never be mixed up.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of an outbox event (the idempotency key on the consumer side).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(u64);

impl EventId {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "event-{}", self.0)
    }
}

/// Identifier of a processed message (destination-store row).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(u64);

impl MessageId {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "message-{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_uses_prefix() {
        assert_eq!(EventId::new(7).to_string(), "event-7");
        assert_eq!(MessageId::new(7).to_string(), "message-7");

        // The whole point: you can't accidentally mix these types.
        // let _: EventId = MessageId::new(7); // <- does not compile
    }

    #[test]
    fn serializes_as_bare_integer() {
        // The wire format carries `event_id` as a plain JSON number.
        let json = serde_json::to_string(&EventId::new(42)).unwrap();
        assert_eq!(json, "42");

        let back: EventId = serde_json::from_str("42").unwrap();
        assert_eq!(back, EventId::new(42));
    }

    #[test]
    fn ids_order_by_allocation() {
        assert!(EventId::new(1) < EventId::new(2));
        assert!(EventId::new(2) < EventId::new(10));
    }
}
