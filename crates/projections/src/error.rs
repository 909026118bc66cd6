//! Projection error types.

use thiserror::Error;

/// Errors that can occur while loading, rebuilding or persisting a projection.
#[derive(Debug, Error)]
pub enum ProjectionError {
    /// An error occurred in the event store.
    #[error("Event store error: {0}")]
    EventStore(#[from] event_store::EventStoreError),

    /// The snapshot file could not be read or written.
    #[error("Snapshot I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The snapshot could not be serialized.
    #[error("Snapshot serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for projection operations.
pub type Result<T> = std::result::Result<T, ProjectionError>;
