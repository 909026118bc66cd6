use chrono::{DateTime, Utc};

use crate::{AggregateId, EventEnvelope};

/// The range queries an event store must answer.
///
/// Results are always ordered ascending by timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FindQuery {
    /// Every stored event.
    All,

    /// Events with the given name.
    ByName(String),

    /// Events belonging to one aggregate.
    ByAggregateId(AggregateId),

    /// Events belonging to one aggregate with `timestamp <= up_to`.
    ByAggregateIdUpTo {
        aggregate_id: AggregateId,
        up_to: DateTime<Utc>,
    },

    /// Events with `timestamp >= from`.
    Since(DateTime<Utc>),
}

impl FindQuery {
    /// Creates a query for all events.
    pub fn all() -> Self {
        Self::All
    }

    /// Creates a query for events of a specific name.
    pub fn by_name(name: impl Into<String>) -> Self {
        Self::ByName(name.into())
    }

    /// Creates a query for a specific aggregate.
    pub fn by_aggregate(aggregate_id: AggregateId) -> Self {
        Self::ByAggregateId(aggregate_id)
    }

    /// Creates a query for an aggregate's events up to a timestamp (inclusive).
    pub fn by_aggregate_up_to(aggregate_id: AggregateId, up_to: DateTime<Utc>) -> Self {
        Self::ByAggregateIdUpTo {
            aggregate_id,
            up_to,
        }
    }

    /// Creates a query for events from a timestamp onward (inclusive).
    pub fn since(from: DateTime<Utc>) -> Self {
        Self::Since(from)
    }

    /// Returns whether an event satisfies this query.
    pub fn matches(&self, event: &EventEnvelope) -> bool {
        match self {
            Self::All => true,
            Self::ByName(name) => &event.name == name,
            Self::ByAggregateId(id) => event.aggregate_id == *id,
            Self::ByAggregateIdUpTo {
                aggregate_id,
                up_to,
            } => event.aggregate_id == *aggregate_id && event.timestamp <= *up_to,
            Self::Since(from) => event.timestamp >= *from,
        }
    }
}
