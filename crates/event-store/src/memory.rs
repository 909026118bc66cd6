use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    EventEnvelope, EventId, EventStoreError, FindQuery, Result, store::EventStore,
};

/// In-memory event store implementation.
///
/// Events live in a vector in append order, which is also the tie-break
/// order for events sharing a timestamp.
#[derive(Clone, Default)]
pub struct InMemoryEventStore {
    events: Arc<RwLock<Vec<(EventId, EventEnvelope)>>>,
    closed: Arc<AtomicBool>,
}

impl InMemoryEventStore {
    /// Creates a new empty in-memory event store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of events stored.
    pub async fn event_count(&self) -> usize {
        self.events.read().await.len()
    }

    /// Clears all events.
    pub async fn clear(&self) {
        self.events.write().await.clear();
    }

    /// Makes every subsequent call fail with [`EventStoreError::Unavailable`].
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    /// Undoes [`close`](Self::close).
    pub fn reopen(&self) {
        self.closed.store(false, Ordering::SeqCst);
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(EventStoreError::Unavailable);
        }
        Ok(())
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn append(&self, event: EventEnvelope) -> Result<EventId> {
        self.ensure_open()?;

        let id = EventId::new();
        tracing::debug!(
            event_id = %id,
            name = %event.name,
            aggregate_id = %event.aggregate_id,
            "appending event"
        );

        self.events.write().await.push((id, event));
        metrics::counter!("event_store_events_appended").increment(1);

        Ok(id)
    }

    async fn find(&self, query: FindQuery) -> Result<Vec<EventEnvelope>> {
        self.ensure_open()?;

        let store = self.events.read().await;
        let mut events: Vec<_> = store
            .iter()
            .map(|(_, event)| event)
            .filter(|event| query.matches(event))
            .cloned()
            .collect();

        // Stable sort keeps append order among equal timestamps
        events.sort_by_key(|e| e.timestamp);

        Ok(events)
    }
}
