//! In-memory store implementations.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::record::{EventRecord, ProcessedMessage};
use crate::domain::{EventId, EventState, MessageId, RelayError};
use crate::observability::EventCounts;
use crate::ports::{EventStore, ProcessedMessageStore, PublishOutcome};

/// In-memory event store state.
struct EventStoreState {
    /// All records, keyed by id. Ids are allocated monotonically, so
    /// iteration order is creation order (oldest first).
    records: BTreeMap<u64, EventRecord>,

    /// Next event id to assign.
    next_id: u64,
}

impl EventStoreState {
    fn new() -> Self {
        Self {
            records: BTreeMap::new(),
            next_id: 1,
        }
    }

    fn allocate_id(&mut self) -> EventId {
        let id = EventId::new(self.next_id);
        self.next_id += 1;
        id
    }
}

/// In-memory [`EventStore`].
///
/// One async Mutex around the whole table gives each operation row-level
/// atomicity; callers never hold the lock across an await.
pub struct InMemoryEventStore {
    state: Mutex<EventStoreState>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(EventStoreState::new()),
        }
    }
}

impl Default for InMemoryEventStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn insert_pending(&self, content: String) -> Result<EventRecord, RelayError> {
        let mut state = self.state.lock().await;
        let id = state.allocate_id();
        let record = EventRecord::new(id, content);
        state.records.insert(id.value(), record.clone());
        Ok(record)
    }

    async fn record_publish_outcome(
        &self,
        id: EventId,
        outcome: PublishOutcome,
    ) -> Result<EventRecord, RelayError> {
        let mut state = self.state.lock().await;
        let record = state
            .records
            .get_mut(&id.value())
            .ok_or(RelayError::EventNotFound(id))?;

        // CAS boundary: an already-Sent event absorbs any late outcome.
        // This is what keeps a racing submission and sweep from regressing
        // state or double-counting attempts.
        if record.state.is_terminal() {
            return Ok(record.clone());
        }

        match outcome {
            PublishOutcome::Delivered => record.mark_sent()?,
            PublishOutcome::Rejected(error) => record.mark_failed(error)?,
        }
        Ok(record.clone())
    }

    async fn fetch_retryable(
        &self,
        limit: usize,
        max_attempts: u32,
    ) -> Result<Vec<EventRecord>, RelayError> {
        let state = self.state.lock().await;
        Ok(state
            .records
            .values()
            .filter(|r| r.is_retryable(max_attempts))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn get(&self, id: EventId) -> Result<Option<EventRecord>, RelayError> {
        let state = self.state.lock().await;
        Ok(state.records.get(&id.value()).cloned())
    }

    async fn list(&self) -> Result<Vec<EventRecord>, RelayError> {
        let state = self.state.lock().await;
        Ok(state.records.values().cloned().collect())
    }

    async fn counts_by_state(&self) -> Result<EventCounts, RelayError> {
        let state = self.state.lock().await;
        let mut counts = EventCounts::default();
        for record in state.records.values() {
            match record.state {
                EventState::Pending => counts.pending += 1,
                EventState::Sent => counts.sent += 1,
                EventState::Failed => counts.failed += 1,
            }
        }
        Ok(counts)
    }
}

/// In-memory processed-message store state.
struct ProcessedStoreState {
    /// Rows in insertion order (ids are monotonic).
    messages: BTreeMap<u64, ProcessedMessage>,

    /// Dedup index: source event id -> message id.
    by_source: HashMap<EventId, MessageId>,

    next_id: u64,
}

impl ProcessedStoreState {
    fn new() -> Self {
        Self {
            messages: BTreeMap::new(),
            by_source: HashMap::new(),
            next_id: 1,
        }
    }
}

/// In-memory [`ProcessedMessageStore`] with a uniqueness constraint on
/// `source_event_id`.
pub struct InMemoryProcessedStore {
    state: Mutex<ProcessedStoreState>,

    /// Failure injection for tests: when set, inserts fail with a storage
    /// error so deferred-ack redelivery can be exercised.
    fail_inserts: AtomicBool,
}

impl InMemoryProcessedStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ProcessedStoreState::new()),
            fail_inserts: AtomicBool::new(false),
        }
    }

    /// Make subsequent inserts fail (simulated storage outage).
    pub fn set_fail_inserts(&self, fail: bool) {
        self.fail_inserts.store(fail, Ordering::Relaxed);
    }
}

impl Default for InMemoryProcessedStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProcessedMessageStore for InMemoryProcessedStore {
    async fn insert_if_absent(
        &self,
        source_event_id: EventId,
        content: String,
    ) -> Result<Option<ProcessedMessage>, RelayError> {
        if self.fail_inserts.load(Ordering::Relaxed) {
            return Err(RelayError::Storage("insert rejected (outage)".into()));
        }

        let mut state = self.state.lock().await;
        if state.by_source.contains_key(&source_event_id) {
            return Ok(None);
        }

        let id = MessageId::new(state.next_id);
        state.next_id += 1;

        let message = ProcessedMessage::new(id, source_event_id, content);
        state.messages.insert(id.value(), message.clone());
        state.by_source.insert(source_event_id, id);
        Ok(Some(message))
    }

    async fn get_by_source(
        &self,
        source_event_id: EventId,
    ) -> Result<Option<ProcessedMessage>, RelayError> {
        let state = self.state.lock().await;
        Ok(state
            .by_source
            .get(&source_event_id)
            .and_then(|id| state.messages.get(&id.value()))
            .cloned())
    }

    async fn list(&self) -> Result<Vec<ProcessedMessage>, RelayError> {
        let state = self.state.lock().await;
        Ok(state.messages.values().cloned().collect())
    }

    async fn count(&self) -> Result<usize, RelayError> {
        let state = self.state.lock().await;
        Ok(state.messages.len())
    }
}
