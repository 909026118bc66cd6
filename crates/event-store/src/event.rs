use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::AggregateId;

/// Storage key assigned to an event when it is appended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(Uuid);

impl EventId {
    /// Creates a new random event ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an event ID from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An immutable fact recorded in the log.
///
/// `name` selects the event kind and determines the shape of `payload`.
/// Envelopes carry no storage key; the store assigns one on append.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// The kind of event (e.g., "PortfolioCreated", "BuildingCreated").
    pub name: String,

    /// The aggregate this event belongs to.
    pub aggregate_id: AggregateId,

    /// When the event happened.
    pub timestamp: DateTime<Utc>,

    /// The event payload as JSON.
    pub payload: serde_json::Value,
}

impl EventEnvelope {
    /// Creates a new envelope from a raw JSON payload.
    pub fn new(
        name: impl Into<String>,
        aggregate_id: AggregateId,
        timestamp: DateTime<Utc>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            name: name.into(),
            aggregate_id,
            timestamp,
            payload,
        }
    }

    /// Creates a new envelope, serializing the payload.
    pub fn with_payload<T: Serialize>(
        name: impl Into<String>,
        aggregate_id: AggregateId,
        timestamp: DateTime<Utc>,
        payload: &T,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self::new(
            name,
            aggregate_id,
            timestamp,
            serde_json::to_value(payload)?,
        ))
    }
}
