use common::InvalidId;
use thiserror::Error;

/// Errors that can occur when interacting with the event store.
///
/// Every variant is a storage failure from the caller's point of view: the
/// event passed to a failed `append` must be assumed unrecorded.
#[derive(Debug, Error)]
pub enum EventStoreError {
    /// The storage medium is closed or unreachable.
    #[error("Event store unavailable")]
    Unavailable,

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored record carried an aggregate id that does not parse.
    #[error("Corrupt record: {0}")]
    CorruptRecord(#[from] InvalidId),
}

/// Result type for event store operations.
pub type Result<T> = std::result::Result<T, EventStoreError>;
