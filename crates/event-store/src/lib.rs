pub mod error;
pub mod event;
pub mod memory;
pub mod postgres;
pub mod query;
pub mod store;

pub use common::AggregateId;
pub use error::{EventStoreError, Result};
pub use event::{EventEnvelope, EventId};
pub use memory::InMemoryEventStore;
pub use postgres::PostgresEventStore;
pub use query::FindQuery;
pub use store::{EventStore, EventStoreExt};
