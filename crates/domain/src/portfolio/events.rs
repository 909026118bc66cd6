//! Portfolio domain events.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use common::PortfolioId;
use event_store::EventEnvelope;
use serde::{Deserialize, Serialize};

use crate::event::DomainEvent;

use super::Address;

/// Events that can occur on a portfolio aggregate.
///
/// On the wire the variant is carried by the envelope's `name` and the
/// payload is the bare data struct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum PortfolioEvent {
    /// Portfolio was created.
    PortfolioCreated(PortfolioCreatedData),

    /// Asset was added to the portfolio.
    AssetCreated(AssetCreatedData),

    /// Building was added to an asset.
    BuildingCreated(BuildingCreatedData),

    /// Portfolio was reset to its state as of `timestamp`.
    PortfolioRollbacked(PortfolioRollbackedData),
}

impl DomainEvent for PortfolioEvent {
    fn name(&self) -> &'static str {
        match self {
            PortfolioEvent::PortfolioCreated(_) => "PortfolioCreated",
            PortfolioEvent::AssetCreated(_) => "AssetCreated",
            PortfolioEvent::BuildingCreated(_) => "BuildingCreated",
            PortfolioEvent::PortfolioRollbacked(_) => "PortfolioRollbacked",
        }
    }
}

impl PortfolioEvent {
    /// Wraps the event in a store envelope.
    pub fn to_envelope(
        &self,
        portfolio_id: PortfolioId,
        timestamp: DateTime<Utc>,
    ) -> Result<EventEnvelope, serde_json::Error> {
        let payload = match self {
            PortfolioEvent::PortfolioCreated(data) => serde_json::to_value(data)?,
            PortfolioEvent::AssetCreated(data) => serde_json::to_value(data)?,
            PortfolioEvent::BuildingCreated(data) => serde_json::to_value(data)?,
            PortfolioEvent::PortfolioRollbacked(data) => serde_json::to_value(data)?,
        };

        Ok(EventEnvelope::new(
            self.name(),
            portfolio_id.aggregate_id(),
            timestamp,
            payload,
        ))
    }

    /// Decodes a store envelope.
    ///
    /// Returns `Ok(None)` for names this version does not know.
    pub fn from_envelope(envelope: &EventEnvelope) -> Result<Option<Self>, serde_json::Error> {
        let payload = envelope.payload.clone();
        let event = match envelope.name.as_str() {
            "PortfolioCreated" => {
                PortfolioEvent::PortfolioCreated(serde_json::from_value(payload)?)
            }
            "AssetCreated" => PortfolioEvent::AssetCreated(serde_json::from_value(payload)?),
            "BuildingCreated" => PortfolioEvent::BuildingCreated(serde_json::from_value(payload)?),
            "PortfolioRollbacked" => {
                PortfolioEvent::PortfolioRollbacked(serde_json::from_value(payload)?)
            }
            _ => return Ok(None),
        };
        Ok(Some(event))
    }
}

/// Data for PortfolioCreated event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioCreatedData {
    pub name: String,
}

/// Data for AssetCreated event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetCreatedData {
    pub name: String,
}

/// Data for BuildingCreated event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildingCreatedData {
    /// The asset receiving the building.
    pub asset_name: String,

    /// Addresses claimed by the building.
    pub addresses: BTreeSet<Address>,
}

/// Data for PortfolioRollbacked event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioRollbackedData {
    /// Instant the portfolio is reset to (inclusive).
    pub timestamp: DateTime<Utc>,
}

// Convenience constructors for events
impl PortfolioEvent {
    pub fn portfolio_created(name: impl Into<String>) -> Self {
        PortfolioEvent::PortfolioCreated(PortfolioCreatedData { name: name.into() })
    }

    pub fn asset_created(name: impl Into<String>) -> Self {
        PortfolioEvent::AssetCreated(AssetCreatedData { name: name.into() })
    }

    pub fn building_created(asset_name: impl Into<String>, addresses: BTreeSet<Address>) -> Self {
        PortfolioEvent::BuildingCreated(BuildingCreatedData {
            asset_name: asset_name.into(),
            addresses,
        })
    }

    pub fn portfolio_rollbacked(timestamp: DateTime<Utc>) -> Self {
        PortfolioEvent::PortfolioRollbacked(PortfolioRollbackedData { timestamp })
    }
}
