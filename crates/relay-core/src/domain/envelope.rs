//! Wire envelope for the broker transport.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::RelayError;
use super::ids::EventId;

/// The stable wire format carried over the broker:
/// `{"event_id": integer, "content": string, "timestamp": ISO-8601 string}`.
///
/// The transport itself only sees opaque bytes; producers encode with
/// [`to_bytes`](Self::to_bytes) and the consumer decodes with
/// [`from_bytes`](Self::from_bytes). `timestamp` is the time of the publish
/// attempt, not of event creation (a retried event gets a fresh timestamp).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub event_id: EventId,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl EventEnvelope {
    pub fn new(event_id: EventId, content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            event_id,
            content: content.into(),
            timestamp,
        }
    }

    /// Encode to the wire format (JSON bytes).
    pub fn to_bytes(&self) -> Result<Vec<u8>, RelayError> {
        serde_json::to_vec(self).map_err(|e| RelayError::Codec(e.to_string()))
    }

    /// Decode from the wire format.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, RelayError> {
        serde_json::from_slice(bytes).map_err(|e| RelayError::Codec(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_format_is_stable() {
        let ts: DateTime<Utc> = "2024-01-01T12:00:00Z".parse().unwrap();
        let envelope = EventEnvelope::new(EventId::new(42), "hello", ts);

        let value: serde_json::Value =
            serde_json::from_slice(&envelope.to_bytes().unwrap()).unwrap();

        assert_eq!(value["event_id"], 42);
        assert_eq!(value["content"], "hello");
        // chrono serializes DateTime<Utc> as an ISO-8601 / RFC 3339 string
        assert_eq!(value["timestamp"].as_str().unwrap(), "2024-01-01T12:00:00Z");
    }

    #[test]
    fn round_trips_through_bytes() {
        let envelope = EventEnvelope::new(EventId::new(1), "payload", Utc::now());
        let decoded = EventEnvelope::from_bytes(&envelope.to_bytes().unwrap()).unwrap();
        assert_eq!(decoded, envelope);
    }

    #[test]
    fn garbage_decodes_to_codec_error() {
        let err = EventEnvelope::from_bytes(b"not json").unwrap_err();
        assert!(matches!(err, RelayError::Codec(_)));
    }
}
