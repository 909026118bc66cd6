//! Commands: intents that change portfolio state.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use common::PortfolioId;
use domain::{Address, Asset, Building};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{ApplicationError, RoutingError};

/// A command as it arrives from outside: a name and loosely typed arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawCommand {
    pub name: String,

    #[serde(default)]
    pub arguments: serde_json::Value,
}

impl RawCommand {
    pub fn new(name: impl Into<String>, arguments: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }
}

/// Every command the bus can execute.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    CreatePortfolio {
        name: String,
    },
    CreateAsset {
        portfolio_id: PortfolioId,
        name: String,
    },
    CreateBuilding {
        portfolio_id: PortfolioId,
        asset_name: String,
        addresses: BTreeSet<Address>,
    },
    RollbackPortfolio {
        portfolio_id: PortfolioId,
        timestamp: DateTime<Utc>,
    },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::CreatePortfolio { .. } => "CreatePortfolio",
            Command::CreateAsset { .. } => "CreateAsset",
            Command::CreateBuilding { .. } => "CreateBuilding",
            Command::RollbackPortfolio { .. } => "RollbackPortfolio",
        }
    }
}

/// What a successful command created.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutcome {
    PortfolioCreated(PortfolioId),
    AssetCreated(Asset),
    BuildingCreated(Building),
    PortfolioRollbacked,
}

#[derive(Deserialize)]
struct CreatePortfolioArgs {
    name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateAssetArgs {
    portfolio_id: String,
    name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateBuildingArgs {
    portfolio_id: String,
    asset_name: String,
    addresses: BTreeSet<Address>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RollbackPortfolioArgs {
    portfolio_id: String,
    timestamp: DateTime<Utc>,
}

/// Decodes the arguments of the named intent.
pub(crate) fn arguments<T: DeserializeOwned>(
    name: &str,
    arguments: serde_json::Value,
) -> Result<T, ApplicationError> {
    serde_json::from_value(arguments).map_err(|source| ApplicationError::MalformedArguments {
        name: name.to_string(),
        source,
    })
}

impl TryFrom<RawCommand> for Command {
    type Error = ApplicationError;

    fn try_from(raw: RawCommand) -> Result<Self, Self::Error> {
        let RawCommand { name, arguments: args } = raw;
        let command = match name.as_str() {
            "CreatePortfolio" => {
                let a: CreatePortfolioArgs = arguments(&name, args)?;
                Command::CreatePortfolio { name: a.name }
            }
            "CreateAsset" => {
                let a: CreateAssetArgs = arguments(&name, args)?;
                Command::CreateAsset {
                    portfolio_id: PortfolioId::parse(&a.portfolio_id)?,
                    name: a.name,
                }
            }
            "CreateBuilding" => {
                let a: CreateBuildingArgs = arguments(&name, args)?;
                Command::CreateBuilding {
                    portfolio_id: PortfolioId::parse(&a.portfolio_id)?,
                    asset_name: a.asset_name,
                    addresses: a.addresses,
                }
            }
            "RollbackPortfolio" => {
                let a: RollbackPortfolioArgs = arguments(&name, args)?;
                Command::RollbackPortfolio {
                    portfolio_id: PortfolioId::parse(&a.portfolio_id)?,
                    timestamp: a.timestamp,
                }
            }
            _ => return Err(RoutingError::UnknownCommand(name).into()),
        };
        Ok(command)
    }
}
