//! Application layer: the boundary a presentation layer calls.
//!
//! Intents arrive as [`RawCommand`] / [`RawQuery`] envelopes, are parsed
//! into the typed [`Command`] / [`Query`] sum types and executed against
//! the [`PortfolioService`](domain::PortfolioService).

pub mod bus;
pub mod command;
pub mod error;
pub mod query;

pub use bus::{CommandBus, QueryProcessor};
pub use command::{Command, CommandOutcome, RawCommand};
pub use error::{ApplicationError, Result, RoutingError};
pub use query::{
    AssetView, BuildingView, HistoryEntry, PortfolioHistoryView, PortfolioView, Query,
    QueryResponse, RawQuery,
};
