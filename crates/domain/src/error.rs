//! Domain error types.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use common::{InvalidId, PortfolioId};
use event_store::EventStoreError;
use thiserror::Error;

use crate::portfolio::Address;

/// Coarse classification of a [`PortfolioError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidId,
    NotFound,
    Conflict,
    StorageFailure,
}

/// Errors that can occur during portfolio operations.
#[derive(Debug, Error)]
pub enum PortfolioError {
    /// The id string is not a well-formed portfolio id.
    #[error("Invalid portfolio id: {0}")]
    InvalidPortfolioId(String),

    #[error("Portfolio with id {0} does not exist")]
    PortfolioNotFound(PortfolioId),

    #[error("Asset with name {name} does not exist in portfolio {portfolio_id}")]
    AssetNotFound {
        portfolio_id: PortfolioId,
        name: String,
    },

    #[error("Asset with name {name} already exists in portfolio {portfolio_id}")]
    AssetAlreadyExists {
        portfolio_id: PortfolioId,
        name: String,
    },

    /// Some requested addresses already belong to a building.
    #[error("Addresses already taken: {}", join(.addresses))]
    AddressAlreadyTaken { addresses: BTreeSet<Address> },

    /// Rollback target lies in the future.
    #[error("Invalid rollback timestamp: {timestamp} is in the future")]
    InvalidRollbackTimestamp { timestamp: DateTime<Utc> },

    /// The event could not be recorded or read.
    #[error("Storage failure: {0}")]
    Storage(#[from] EventStoreError),
}

impl PortfolioError {
    /// Machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidPortfolioId(_) => "INVALID_PORTFOLIO_ID",
            Self::PortfolioNotFound(_) => "PORTFOLIO_NOT_FOUND",
            Self::AssetNotFound { .. } => "ASSET_NOT_FOUND",
            Self::AssetAlreadyExists { .. } => "ASSET_ALREADY_EXISTS",
            Self::AddressAlreadyTaken { .. } => "ADDRESS_ALREADY_TAKEN",
            Self::InvalidRollbackTimestamp { .. } => "INVALID_ROLLBACK_TIMESTAMP",
            Self::Storage(_) => "STORAGE_FAILURE",
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidPortfolioId(_) | Self::InvalidRollbackTimestamp { .. } => {
                ErrorKind::InvalidId
            }
            Self::PortfolioNotFound(_) | Self::AssetNotFound { .. } => ErrorKind::NotFound,
            Self::AssetAlreadyExists { .. } | Self::AddressAlreadyTaken { .. } => {
                ErrorKind::Conflict
            }
            Self::Storage(_) => ErrorKind::StorageFailure,
        }
    }
}

impl From<InvalidId> for PortfolioError {
    fn from(e: InvalidId) -> Self {
        Self::InvalidPortfolioId(e.0)
    }
}

fn join(addresses: &BTreeSet<Address>) -> String {
    addresses
        .iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type for domain operations.
pub type Result<T> = std::result::Result<T, PortfolioError>;
