//! Serializable count views for status collaborators.

use serde::{Deserialize, Serialize};

/// Event counts by state, for the read-side collaborator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventCounts {
    pub pending: usize,
    pub sent: usize,
    pub failed: usize,
}

impl EventCounts {
    pub fn total(&self) -> usize {
        self.pending + self.sent + self.failed
    }
}

/// Read-only view of the consumer's counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub processed_count: u64,
    pub duplicate_count: u64,
    pub error_count: u64,
}
