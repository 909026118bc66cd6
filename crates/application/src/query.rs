//! Queries: read-only intents answered from the read model.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use common::PortfolioId;
use domain::{Address, Asset, Building, Portfolio};
use event_store::EventEnvelope;
use serde::{Deserialize, Serialize};

use crate::command::arguments;
use crate::error::{ApplicationError, RoutingError};

/// A query as it arrives from outside.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawQuery {
    pub name: String,

    #[serde(default)]
    pub arguments: serde_json::Value,
}

impl RawQuery {
    pub fn new(name: impl Into<String>, arguments: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }
}

/// Every query the processor can answer.
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    GetPortfolio { portfolio_id: PortfolioId },
    GetAllPortfolios,
    GetPortfolioHistory { portfolio_id: PortfolioId },
}

impl Query {
    pub fn name(&self) -> &'static str {
        match self {
            Query::GetPortfolio { .. } => "GetPortfolio",
            Query::GetAllPortfolios => "GetAllPortfolios",
            Query::GetPortfolioHistory { .. } => "GetPortfolioHistory",
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PortfolioArgs {
    portfolio_id: String,
}

impl TryFrom<RawQuery> for Query {
    type Error = ApplicationError;

    fn try_from(raw: RawQuery) -> Result<Self, Self::Error> {
        let RawQuery { name, arguments: args } = raw;
        let query = match name.as_str() {
            "GetPortfolio" => {
                let a: PortfolioArgs = arguments(&name, args)?;
                Query::GetPortfolio {
                    portfolio_id: PortfolioId::parse(&a.portfolio_id)?,
                }
            }
            "GetAllPortfolios" => Query::GetAllPortfolios,
            "GetPortfolioHistory" => {
                let a: PortfolioArgs = arguments(&name, args)?;
                Query::GetPortfolioHistory {
                    portfolio_id: PortfolioId::parse(&a.portfolio_id)?,
                }
            }
            _ => return Err(RoutingError::UnknownQuery(name).into()),
        };
        Ok(query)
    }
}

// -- Response types --

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuildingView {
    pub addresses: BTreeSet<Address>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssetView {
    pub name: String,
    pub buildings: Vec<BuildingView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioView {
    pub id: String,
    pub name: String,
    pub assets: Vec<AssetView>,
}

/// One recorded change of a portfolio.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    pub timestamp: DateTime<Utc>,
    /// The event name.
    pub change: String,
    pub payload: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioHistoryView {
    pub portfolio_id: String,
    pub history: Vec<HistoryEntry>,
}

/// The answer to a [`Query`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum QueryResponse {
    Portfolio(PortfolioView),
    Portfolios(Vec<PortfolioView>),
    History(PortfolioHistoryView),
}

impl From<&Building> for BuildingView {
    fn from(building: &Building) -> Self {
        Self {
            addresses: building.addresses.clone(),
        }
    }
}

impl From<&Asset> for AssetView {
    fn from(asset: &Asset) -> Self {
        Self {
            name: asset.name.clone(),
            buildings: asset.buildings.iter().map(BuildingView::from).collect(),
        }
    }
}

impl From<&Portfolio> for PortfolioView {
    fn from(portfolio: &Portfolio) -> Self {
        Self {
            id: portfolio.id.to_string(),
            name: portfolio.name.clone(),
            assets: portfolio.assets.iter().map(AssetView::from).collect(),
        }
    }
}

impl From<EventEnvelope> for HistoryEntry {
    fn from(event: EventEnvelope) -> Self {
        Self {
            timestamp: event.timestamp,
            change: event.name,
            payload: event.payload,
        }
    }
}

impl PortfolioHistoryView {
    pub fn new(portfolio_id: PortfolioId, events: Vec<EventEnvelope>) -> Self {
        Self {
            portfolio_id: portfolio_id.to_string(),
            history: events.into_iter().map(HistoryEntry::from).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn get_all_portfolios_ignores_arguments() {
        let query = Query::try_from(RawQuery::new("GetAllPortfolios", json!(null))).unwrap();
        assert_eq!(query, Query::GetAllPortfolios);
    }

    #[test]
    fn get_portfolio_requires_a_valid_id() {
        let err = Query::try_from(RawQuery::new("GetPortfolio", json!({"portfolioId": "12"})))
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_PORTFOLIO_ID");

        let err = Query::try_from(RawQuery::new("GetPortfolio", json!({}))).unwrap_err();
        assert_eq!(err.code(), "MALFORMED_ARGUMENTS");
    }

    #[test]
    fn unknown_query_is_a_routing_error() {
        let err = Query::try_from(RawQuery::new("GetBuildings", json!({}))).unwrap_err();
        assert!(matches!(err, ApplicationError::Routing(RoutingError::UnknownQuery(_))));
    }

    #[test]
    fn portfolio_view_serializes_nested_assets() {
        let id = PortfolioId::generate();
        let mut portfolio = Portfolio::new(id, "Acme");
        let mut tower = Asset::new("Tower");
        tower
            .buildings
            .push(Building::new(["1 Main St".to_string()].into()));
        portfolio.assets.push(tower);

        let json = serde_json::to_value(QueryResponse::Portfolio((&portfolio).into())).unwrap();

        assert_eq!(
            json,
            json!({
                "id": id.to_string(),
                "name": "Acme",
                "assets": [{"name": "Tower", "buildings": [{"addresses": ["1 Main St"]}]}],
            })
        );
    }

    #[test]
    fn history_view_lists_changes() {
        let id = PortfolioId::generate();
        let timestamp = Utc::now();
        let event = EventEnvelope::new(
            "AssetCreated",
            id.aggregate_id(),
            timestamp,
            json!({"name": "Tower"}),
        );

        let view = PortfolioHistoryView::new(id, vec![event]);

        assert_eq!(view.portfolio_id, id.to_string());
        assert_eq!(
            view.history,
            vec![HistoryEntry {
                timestamp,
                change: "AssetCreated".into(),
                payload: json!({"name": "Tower"}),
            }]
        );
    }
}
