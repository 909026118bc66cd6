//! Portfolio aggregate: model, events, read seams and service.

mod events;
mod repository;
mod service;

pub use events::{
    AssetCreatedData, BuildingCreatedData, PortfolioCreatedData, PortfolioEvent,
    PortfolioRollbackedData,
};
pub use repository::{PortfolioHistory, PortfolioRepository};
pub use service::PortfolioService;

use std::collections::BTreeSet;

use common::PortfolioId;
use serde::{Deserialize, Serialize};

/// A street address. Globally unique across all buildings.
pub type Address = String;

/// A building, identified by the addresses it occupies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Building {
    pub addresses: BTreeSet<Address>,
}

impl Building {
    pub fn new(addresses: BTreeSet<Address>) -> Self {
        Self { addresses }
    }
}

/// A named asset within a portfolio.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub name: String,
    pub buildings: Vec<Building>,
}

impl Asset {
    /// Creates an asset with no buildings.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            buildings: Vec::new(),
        }
    }
}

/// A portfolio of assets. Asset names are unique within a portfolio.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Portfolio {
    pub id: PortfolioId,
    pub name: String,
    pub assets: Vec<Asset>,
}

impl Portfolio {
    /// Creates a portfolio with no assets.
    pub fn new(id: PortfolioId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            assets: Vec::new(),
        }
    }

    /// Looks up an asset by name.
    pub fn asset(&self, name: &str) -> Option<&Asset> {
        self.assets.iter().find(|a| a.name == name)
    }

    /// Looks up an asset by name for mutation.
    pub fn asset_mut(&mut self, name: &str) -> Option<&mut Asset> {
        self.assets.iter_mut().find(|a| a.name == name)
    }

    pub fn has_asset(&self, name: &str) -> bool {
        self.asset(name).is_some()
    }

    /// Every address held by any building of any asset.
    pub fn addresses(&self) -> impl Iterator<Item = &Address> {
        self.assets
            .iter()
            .flat_map(|a| a.buildings.iter())
            .flat_map(|b| b.addresses.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn portfolio_addresses_span_assets_and_buildings() {
        let mut portfolio = Portfolio::new(PortfolioId::generate(), "Acme");
        let mut tower = Asset::new("Tower");
        tower
            .buildings
            .push(Building::new(["1 Main St".to_string()].into()));
        tower.buildings.push(Building::new(
            ["2 Main St".to_string(), "3 Main St".to_string()].into(),
        ));
        portfolio.assets.push(tower);
        portfolio.assets.push(Asset::new("Empty"));

        let addresses: Vec<_> = portfolio.addresses().cloned().collect();
        assert_eq!(addresses, vec!["1 Main St", "2 Main St", "3 Main St"]);
        assert!(portfolio.has_asset("Tower"));
        assert!(portfolio.has_asset("Empty"));
        assert!(!portfolio.has_asset("Missing"));
    }
}
