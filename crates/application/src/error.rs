//! Application error types.

use common::InvalidId;
use domain::PortfolioError;
use thiserror::Error;

/// No handler exists for an intent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoutingError {
    #[error("No handler for command {0}")]
    UnknownCommand(String),

    #[error("No handler for query {0}")]
    UnknownQuery(String),
}

/// Errors surfaced by the command bus and query processor.
#[derive(Debug, Error)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] PortfolioError),

    #[error(transparent)]
    Routing(#[from] RoutingError),

    /// The envelope's arguments do not fit the named intent.
    #[error("Malformed arguments for {name}: {source}")]
    MalformedArguments {
        name: String,
        source: serde_json::Error,
    },
}

impl ApplicationError {
    /// Machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Domain(e) => e.code(),
            Self::Routing(_) => "ROUTING_ERROR",
            Self::MalformedArguments { .. } => "MALFORMED_ARGUMENTS",
        }
    }
}

impl From<InvalidId> for ApplicationError {
    fn from(e: InvalidId) -> Self {
        Self::Domain(e.into())
    }
}

/// Result type for application operations.
pub type Result<T> = std::result::Result<T, ApplicationError>;
