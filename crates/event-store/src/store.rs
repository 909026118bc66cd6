use async_trait::async_trait;

use crate::{AggregateId, EventEnvelope, EventId, FindQuery, Result};

/// Core trait for event store implementations.
///
/// An event store is the durable, append-only source of truth. Stored events
/// are never mutated or reordered. All implementations must be thread-safe
/// (Send + Sync).
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Durably appends one event and returns the storage key it was given.
    ///
    /// On error the caller must assume the event was not recorded.
    async fn append(&self, event: EventEnvelope) -> Result<EventId>;

    /// Retrieves all events matching a query, ordered ascending by timestamp.
    ///
    /// Events sharing a timestamp come back in the order they were appended.
    async fn find(&self, query: FindQuery) -> Result<Vec<EventEnvelope>>;
}

/// Extension trait providing convenience methods for event stores.
#[async_trait]
pub trait EventStoreExt: EventStore {
    /// Appends events one at a time, stopping at the first failure.
    async fn append_all(&self, events: Vec<EventEnvelope>) -> Result<Vec<EventId>> {
        let mut ids = Vec::with_capacity(events.len());
        for event in events {
            ids.push(self.append(event).await?);
        }
        Ok(ids)
    }

    /// Retrieves the full history of one aggregate.
    async fn history(&self, aggregate_id: AggregateId) -> Result<Vec<EventEnvelope>> {
        self.find(FindQuery::by_aggregate(aggregate_id)).await
    }
}

// Blanket implementation for all EventStore implementations
impl<T: EventStore + ?Sized> EventStoreExt for T {}
