//! Identifier types shared by every layer of the portfolio event log.

mod proquint;
pub mod types;

pub use types::{AggregateId, InvalidId, PortfolioId};
