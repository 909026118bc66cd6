//! Fan-out of domain events to interested handlers.

use std::sync::Arc;

use async_trait::async_trait;
use event_store::{EventEnvelope, EventStore, EventStoreError};
use futures_util::future::join_all;

/// A consumer of domain events.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Returns the name of this handler, for logs.
    fn name(&self) -> &'static str;

    /// Returns whether this handler wants the event.
    fn matches(&self, event: &EventEnvelope) -> bool;

    /// Handles one event.
    async fn handle(&self, event: &EventEnvelope) -> event_store::Result<()>;
}

/// Delivers events to every matching handler.
#[async_trait]
pub trait DomainEventDispatcher: Send + Sync {
    /// Delivers the event and waits for every matching handler to finish.
    async fn dispatch(&self, event: EventEnvelope) -> event_store::Result<()>;
}

/// In-memory synchronous event bus.
///
/// Matching handlers run concurrently and are all awaited before
/// `dispatch` returns. Delivery is best effort: a failing handler does not
/// undo the others, and the first failure is returned once all have
/// finished.
#[derive(Default)]
pub struct EventBus {
    handlers: Vec<Arc<dyn EventHandler>>,
}

impl EventBus {
    /// Creates an empty event bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler with this bus.
    pub fn register(&mut self, handler: Arc<dyn EventHandler>) {
        self.handlers.push(handler);
    }

    /// Builder-style variant of [`register`](Self::register).
    pub fn with_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
        self.register(handler);
        self
    }

    /// Returns the number of registered handlers.
    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}

#[async_trait]
impl DomainEventDispatcher for EventBus {
    #[tracing::instrument(
        skip(self, event),
        fields(name = %event.name, aggregate_id = %event.aggregate_id)
    )]
    async fn dispatch(&self, event: EventEnvelope) -> event_store::Result<()> {
        let matching: Vec<_> = self.handlers.iter().filter(|h| h.matches(&event)).collect();

        if matching.is_empty() {
            tracing::warn!(name = %event.name, "no event handler registered for event");
            return Ok(());
        }

        let results = join_all(matching.iter().map(|h| h.handle(&event))).await;

        let mut first_error: Option<EventStoreError> = None;
        for (handler, result) in matching.iter().zip(results) {
            if let Err(e) = result {
                tracing::error!(handler = handler.name(), error = %e, "event handler failed");
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Appends every event to the store.
pub struct StoreWriter<S: EventStore> {
    store: S,
}

impl<S: EventStore> StoreWriter<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }
}

#[async_trait]
impl<S: EventStore> EventHandler for StoreWriter<S> {
    fn name(&self) -> &'static str {
        "StoreWriter"
    }

    fn matches(&self, _event: &EventEnvelope) -> bool {
        true
    }

    async fn handle(&self, event: &EventEnvelope) -> event_store::Result<()> {
        self.store.append(event.clone()).await?;
        Ok(())
    }
}
